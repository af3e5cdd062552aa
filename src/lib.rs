//! # App Lifecycle
//!
//! Client-side runtime utilities for mobile apps: keep long-lived
//! subscriptions from burning network and battery while the app is in the
//! background, and keep noisy UI callbacks in check.
//!
//! ## Core Concepts
//!
//! - **Subscriptions**: registry of pausable, cancellable subscriptions that
//!   pause as a group on background and resume on foreground
//! - **Lifecycle**: the boundary where the host delivers platform lifecycle
//!   signals
//! - **Rate limiting**: per-key debounce and throttle gates
//! - **Assets**: batched, bounded-concurrency preloading
//!
//! ## Example
//!
//! ```ignore
//! use app_lifecycle::{AppLifecycleState, LifecycleBus, SubscriptionLifecycleManager};
//!
//! let bus = Arc::new(LifecycleBus::new());
//! let manager = Arc::new(SubscriptionLifecycleManager::default());
//! manager.initialize(bus.clone());
//!
//! let id = manager.register(chat_listener);
//!
//! bus.notify(AppLifecycleState::Paused);
//! assert!(manager.is_paused_id(&id));
//!
//! bus.notify(AppLifecycleState::Resumed);
//! assert!(manager.is_active(&id));
//! ```

pub mod assets;
pub mod error;
pub mod lifecycle;
pub mod rate_limit;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use assets::{AssetLoader, BatchAssetLoader, BatchLoaderConfig, LoadSummary};
pub use error::{Error, Result};
pub use lifecycle::{LifecycleBus, LifecycleCallback, LifecycleSource, ObserverId};
pub use rate_limit::{Callback, RateLimiter};
pub use subscriptions::{
    CleanupReport, LifecycleSubscription, ManagerConfig, PauseFailurePolicy, SubscriptionHandle,
    SubscriptionLifecycleManager,
};
pub use types::*;
