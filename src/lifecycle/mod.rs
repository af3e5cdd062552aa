//! Lifecycle notification plumbing.
//!
//! The host platform owns the real lifecycle hooks. This module defines the
//! boundary the subscription manager attaches to ([`LifecycleSource`]) and a
//! ready-made fan-out implementation ([`LifecycleBus`]) that hosts feed either
//! directly or through a channel from their UI thread.
//!
//! # Example
//!
//! ```ignore
//! let bus = Arc::new(LifecycleBus::new());
//! let manager = SubscriptionLifecycleManager::new(ManagerConfig::default());
//! manager.initialize(bus.clone());
//!
//! // From the platform hook:
//! bus.notify(AppLifecycleState::Paused);   // pauses every subscription
//! bus.notify(AppLifecycleState::Resumed);  // resumes them
//! ```

mod bus;

pub use bus::{LifecycleBus, LifecycleCallback, LifecycleSource, ObserverId};
