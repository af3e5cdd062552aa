//! Error handling and edge case tests.

use app_lifecycle::{
    AppLifecycleState, AssetLoader, BatchAssetLoader, BatchLoaderConfig, Error, LifecycleSubscription,
    ManagerConfig, PauseFailurePolicy, Result, SubscriptionHandle, SubscriptionLifecycleManager,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Flaky {
    fail_pause: bool,
    fail_cancel: bool,
    cancels: AtomicUsize,
}

impl Flaky {
    fn new(fail_pause: bool, fail_cancel: bool) -> Arc<Self> {
        Arc::new(Self {
            fail_pause,
            fail_cancel,
            cancels: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LifecycleSubscription for Flaky {
    fn pause(&self) -> Result<()> {
        if self.fail_pause {
            return Err(Error::Pause("socket already closed".to_string()));
        }
        Ok(())
    }

    async fn cancel(&self) -> Result<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_cancel {
            return Err(Error::Cancel("permission denied".to_string()));
        }
        Ok(())
    }
}

fn handle(sub: &Arc<Flaky>) -> SubscriptionHandle {
    sub.clone()
}

// --- Pause Failures ---

#[test]
fn test_pause_failure_drops_tracking() {
    let manager = SubscriptionLifecycleManager::default();
    let good = Flaky::new(false, false);
    let bad = Flaky::new(true, false);

    let good_id = manager.register(handle(&good));
    let bad_id = manager.register(handle(&bad));

    manager.on_lifecycle_transition(AppLifecycleState::Paused);

    // The paused flag reflects intent, not per-entry success.
    assert!(manager.is_paused());
    assert!(manager.is_paused_id(&good_id));
    assert!(!manager.is_paused_id(&bad_id));
    assert!(!manager.is_active(&bad_id));

    // Resume does not bring it back either.
    manager.on_lifecycle_transition(AppLifecycleState::Resumed);
    assert!(!manager.is_active(&bad_id));
    assert_eq!(manager.active_count(), 1);
}

#[test]
fn test_pause_failure_on_register_while_paused() {
    let manager = SubscriptionLifecycleManager::default();
    manager.on_lifecycle_transition(AppLifecycleState::Hidden);

    let bad = Flaky::new(true, false);
    let id = manager.register(handle(&bad));

    assert!(!manager.is_active(&id));
    assert!(!manager.is_paused_id(&id));
}

#[test]
fn test_keep_active_policy_retains_failed_pause() {
    let manager = SubscriptionLifecycleManager::new(ManagerConfig {
        pause_failure: PauseFailurePolicy::KeepActive,
        id_prefix: "listener".to_string(),
    });
    let bad = Flaky::new(true, false);
    let id = manager.register(handle(&bad));
    assert!(id.as_str().starts_with("listener-"));

    manager.on_lifecycle_transition(AppLifecycleState::Paused);
    assert!(manager.is_active(&id));
    assert_eq!(manager.paused_count(), 0);
}

// --- Cancel Failures ---

#[tokio::test]
async fn test_cancel_failures_do_not_stop_cleanup() {
    let manager = SubscriptionLifecycleManager::default();
    let subs: Vec<Arc<Flaky>> = (0..6).map(|i| Flaky::new(false, i % 2 == 0)).collect();

    for sub in &subs[..3] {
        manager.register(handle(sub));
    }
    manager.pause_all();
    for sub in &subs[3..] {
        manager.register(handle(sub));
    }
    assert_eq!(manager.active_count(), 0);
    assert_eq!(manager.paused_count(), 6);

    let report = manager.force_cleanup_all().await;

    assert_eq!(report.attempted, 6);
    assert_eq!(report.failed.len(), 3);
    assert!(report
        .failed
        .iter()
        .all(|(_, e)| matches!(e, Error::Cancel(_))));
    assert!(subs.iter().all(|s| s.cancels.load(Ordering::SeqCst) == 1));
    assert_eq!(manager.status().tracked(), 0);
    assert!(!manager.is_paused());
}

#[tokio::test]
async fn test_force_cleanup_on_empty_manager() {
    let manager = SubscriptionLifecycleManager::default();
    let report = manager.force_cleanup_all().await;

    assert_eq!(report.attempted, 0);
    assert!(report.is_clean());
}

// --- Unregister Edge Cases ---

#[test]
fn test_unregister_unknown_handle_is_noop() {
    let manager = SubscriptionLifecycleManager::default();
    let known = Flaky::new(false, false);
    let unknown = Flaky::new(false, false);
    manager.register(handle(&known));

    assert!(manager.unregister(&handle(&unknown)).is_none());
    assert_eq!(manager.active_count(), 1);
}

// --- Asset Load Failures ---

struct MissingAssets(HashSet<&'static str>);

#[async_trait]
impl AssetLoader for MissingAssets {
    async fn load(&self, path: &str) -> Result<()> {
        if self.0.contains(path) {
            return Err(Error::AssetLoad {
                path: path.to_string(),
                reason: "not found".to_string(),
            });
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_assets_marked_cached_by_default() {
    let loader = BatchAssetLoader::with_config(
        MissingAssets(["icons/gone.png"].into_iter().collect()),
        BatchLoaderConfig {
            batch_pause: Duration::from_millis(50),
            ..Default::default()
        },
    );

    let summary = loader
        .cache(&["icons/home.png", "icons/gone.png", "icons/chat.png"], 2)
        .await
        .unwrap();

    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.failed, 1);
    assert!(loader.is_cached("icons/gone.png"));

    // Nothing left to retry.
    let again = loader.cache(&["icons/gone.png"], 2).await.unwrap();
    assert_eq!(again.requested, 0);
}

#[test]
fn test_error_messages() {
    let err = Error::AssetLoad {
        path: "a.png".to_string(),
        reason: "timeout".to_string(),
    };
    assert_eq!(err.to_string(), "Asset load failed for a.png: timeout");
    assert_eq!(
        Error::Pause("closed".to_string()).to_string(),
        "Pause failed: closed"
    );
}
