//! Subscription types for lifecycle tracking.

use crate::error::{Error, Result};
use crate::types::SubscriptionId;
use async_trait::async_trait;
use std::sync::Arc;

/// Capabilities the manager needs from a tracked subscription.
///
/// There is no resume call: a paused subscription resumes once it is moved
/// back into the active set and the owner stops suppressing it.
#[async_trait]
pub trait LifecycleSubscription: Send + Sync {
    /// Stop delivering events until resumed.
    ///
    /// Called with the manager's registry lock held; must not call back into
    /// the manager.
    fn pause(&self) -> Result<()>;

    /// Tear the subscription down for good.
    async fn cancel(&self) -> Result<()>;
}

/// Opaque handle to a tracked subscription. Compared by identity.
pub type SubscriptionHandle = Arc<dyn LifecycleSubscription>;

/// Whether two handles point at the same subscription.
pub(crate) fn same_handle(a: &SubscriptionHandle, b: &SubscriptionHandle) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// What to do with a subscription whose `pause` call fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PauseFailurePolicy {
    /// Drop it from both registries. It keeps running but is no longer
    /// tracked, so later resumes and cleanups will not see it.
    #[default]
    Untrack,
    /// Leave it in the active set.
    KeepActive,
}

/// Configuration for a subscription manager.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Handling of failed pause calls.
    /// Default: `Untrack`
    pub pause_failure: PauseFailurePolicy,

    /// Prefix for generated subscription ids (`"{prefix}-{n}"`).
    /// Default: "sub"
    pub id_prefix: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            pause_failure: PauseFailurePolicy::default(),
            id_prefix: "sub".to_string(),
        }
    }
}

/// Outcome of a forced cleanup.
#[derive(Clone, Debug, Default)]
pub struct CleanupReport {
    /// Number of cancel calls issued.
    pub attempted: usize,
    /// Subscriptions whose cancel call failed.
    pub failed: Vec<(SubscriptionId, Error)>,
}

impl CleanupReport {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed.len()
    }

    /// True if every cancel call succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
