//! Lifecycle-gated subscription tracking.
//!
//! Long-lived subscriptions (realtime database listeners, socket streams) are
//! registered with a [`SubscriptionLifecycleManager`]. When the app goes to the
//! background every active subscription is paused; when it comes back they
//! are all moved back to the active set.
//!
//! The manager keeps two disjoint registries:
//! - **active**: subscriptions currently receiving events
//! - **paused**: subscriptions paused by a bulk pause
//!
//! # Example
//!
//! ```ignore
//! let manager = Arc::new(SubscriptionLifecycleManager::default());
//! manager.initialize(bus.clone());
//!
//! let id = manager.register(Arc::new(listener.clone()));
//!
//! // Later, on logout:
//! let report = manager.force_cleanup_all().await;
//! assert_eq!(report.attempted, 1);
//! ```

mod manager;
mod types;

pub use manager::SubscriptionLifecycleManager;
pub use types::{
    CleanupReport, LifecycleSubscription, ManagerConfig, PauseFailurePolicy, SubscriptionHandle,
};
