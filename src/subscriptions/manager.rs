//! Lifecycle manager for long-lived subscriptions.

use crate::lifecycle::{LifecycleSource, ObserverId};
use crate::types::{AppLifecycleState, LifecyclePhase, ManagerStatus, SubscriptionId};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::types::{
    same_handle, CleanupReport, ManagerConfig, PauseFailurePolicy, SubscriptionHandle,
};

/// Registry state. Every mutation happens under one lock.
#[derive(Default)]
struct Registry {
    /// Subscriptions currently receiving events.
    active: HashMap<SubscriptionId, SubscriptionHandle>,
    /// Subscriptions paused by a bulk pause.
    paused: HashMap<SubscriptionId, SubscriptionHandle>,
    /// Last-known lifecycle classification.
    backgrounded: bool,
    /// Whether a bulk pause is in effect.
    bulk_paused: bool,
}

impl Registry {
    /// Remove `id` from both sets so it can be reinserted into exactly one.
    fn detach_id(&mut self, id: &SubscriptionId) -> bool {
        let was_active = self.active.remove(id).is_some();
        let was_paused = self.paused.remove(id).is_some();
        was_active || was_paused
    }

    fn contains(&self, id: &SubscriptionId) -> bool {
        self.active.contains_key(id) || self.paused.contains_key(id)
    }

    /// Remove `id` only while it still maps to `handle`.
    fn remove_if_same(&mut self, id: &SubscriptionId, handle: &SubscriptionHandle) {
        if self.active.get(id).is_some_and(|h| same_handle(h, handle)) {
            self.active.remove(id);
        }
        if self.paused.get(id).is_some_and(|h| same_handle(h, handle)) {
            self.paused.remove(id);
        }
    }
}

/// Connection to a lifecycle source.
struct Attachment {
    source: Arc<dyn LifecycleSource>,
    observer: ObserverId,
}

/// Tracks subscriptions and pauses or resumes them with the app lifecycle.
///
/// One manager is meant to exist per process; construct it once, wrap it in
/// an `Arc` and hand it to whatever registers subscriptions.
pub struct SubscriptionLifecycleManager {
    registry: Mutex<Registry>,
    attachment: Mutex<Option<Attachment>>,
    /// Counter for generating subscription ids.
    next_id: AtomicU64,
    config: ManagerConfig,
}

impl SubscriptionLifecycleManager {
    /// Create a new manager in the foreground, unattached state.
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            attachment: Mutex::new(None),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // --- Attachment ---

    /// Attach to a lifecycle source.
    ///
    /// Returns false without doing anything if already attached. The
    /// observer only holds a weak reference, so the source never keeps the
    /// manager alive.
    pub fn initialize(self: &Arc<Self>, source: Arc<dyn LifecycleSource>) -> bool {
        let mut attachment = self.attachment.lock();
        if attachment.is_some() {
            debug!("Lifecycle manager already initialized");
            return false;
        }

        let manager = Arc::downgrade(self);
        let observer = source.add_observer(Arc::new(move |state: AppLifecycleState| {
            if let Some(manager) = manager.upgrade() {
                manager.on_lifecycle_transition(state);
            }
        }));

        *attachment = Some(Attachment { source, observer });
        debug!("Lifecycle manager initialized");
        true
    }

    /// Detach from the lifecycle source.
    ///
    /// Registries are left as they are. Returns false if not attached.
    pub fn dispose(&self) -> bool {
        let Some(attachment) = self.attachment.lock().take() else {
            return false;
        };
        attachment.source.remove_observer(attachment.observer);
        debug!("Lifecycle manager disposed");
        true
    }

    // --- Registration ---

    /// Track a subscription under a generated id.
    ///
    /// Generated ids skip any id already tracked, including caller-supplied
    /// ones that happen to look generated.
    pub fn register(&self, handle: SubscriptionHandle) -> SubscriptionId {
        let mut reg = self.registry.lock();
        let id = loop {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            let candidate = SubscriptionId(format!("{}-{}", self.config.id_prefix, n));
            if !reg.contains(&candidate) {
                break candidate;
            }
            debug!(id = %candidate, "Generated id already in use, skipping");
        };
        self.insert_locked(&mut reg, handle, id)
    }

    /// Track a subscription under a caller-supplied id.
    ///
    /// An existing mapping for `id` is replaced; the old handle is neither
    /// paused nor cancelled. While a bulk pause is in effect the handle is
    /// paused immediately and goes straight into the paused set.
    pub fn register_with_id(
        &self,
        handle: SubscriptionHandle,
        id: impl Into<SubscriptionId>,
    ) -> SubscriptionId {
        let mut reg = self.registry.lock();
        self.insert_locked(&mut reg, handle, id.into())
    }

    fn insert_locked(
        &self,
        reg: &mut Registry,
        handle: SubscriptionHandle,
        id: SubscriptionId,
    ) -> SubscriptionId {
        if reg.detach_id(&id) {
            debug!(%id, "Replacing existing subscription mapping");
        }

        if !reg.bulk_paused {
            reg.active.insert(id.clone(), handle);
            debug!(%id, "Registered subscription");
            return id;
        }

        match handle.pause() {
            Ok(()) => {
                reg.paused.insert(id.clone(), handle);
                debug!(%id, "Registered subscription while paused");
            }
            Err(e) => match self.config.pause_failure {
                PauseFailurePolicy::Untrack => {
                    error!(%id, error = %e, "Failed to pause new subscription, not tracking it");
                }
                PauseFailurePolicy::KeepActive => {
                    warn!(%id, error = %e, "Failed to pause new subscription, keeping it active");
                    reg.active.insert(id.clone(), handle);
                }
            },
        }
        id
    }

    /// Stop tracking a subscription. Does not cancel it.
    ///
    /// Returns the id it was tracked under, or `None` if it was not tracked.
    pub fn unregister(&self, handle: &SubscriptionHandle) -> Option<SubscriptionId> {
        let mut reg = self.registry.lock();

        let found = reg
            .active
            .iter()
            .chain(reg.paused.iter())
            .find(|(_, h)| same_handle(h, handle))
            .map(|(id, _)| id.clone());

        if let Some(ref id) = found {
            reg.detach_id(id);
            debug!(%id, "Unregistered subscription");
        }
        found
    }

    // --- Lifecycle ---

    /// Apply a lifecycle signal from the host.
    pub fn on_lifecycle_transition(&self, state: AppLifecycleState) {
        let mut reg = self.registry.lock();

        match state.phase() {
            LifecyclePhase::Background => {
                if reg.backgrounded {
                    return;
                }
                debug!(?state, "App entered background");
                reg.backgrounded = true;
                self.pause_locked(&mut reg);
            }
            LifecyclePhase::Foreground => {
                if !reg.backgrounded {
                    return;
                }
                debug!(?state, "App entered foreground");
                reg.backgrounded = false;
                Self::resume_locked(&mut reg);
            }
        }
    }

    /// Pause every active subscription. No-op if already paused.
    pub fn pause_all(&self) {
        let mut reg = self.registry.lock();
        self.pause_locked(&mut reg);
    }

    /// Move every paused subscription back to the active set. No-op if not
    /// paused.
    pub fn resume_all(&self) {
        let mut reg = self.registry.lock();
        Self::resume_locked(&mut reg);
    }

    fn pause_locked(&self, reg: &mut Registry) {
        if reg.bulk_paused {
            return;
        }
        reg.bulk_paused = true;

        let ids: Vec<SubscriptionId> = reg.active.keys().cloned().collect();
        let mut lost = 0;

        for id in ids {
            let Some(handle) = reg.active.remove(&id) else {
                continue;
            };
            match handle.pause() {
                Ok(()) => {
                    reg.paused.insert(id, handle);
                }
                Err(e) => match self.config.pause_failure {
                    PauseFailurePolicy::Untrack => {
                        error!(%id, error = %e, "Failed to pause subscription, no longer tracked");
                        lost += 1;
                    }
                    PauseFailurePolicy::KeepActive => {
                        warn!(%id, error = %e, "Failed to pause subscription, keeping it active");
                        reg.active.insert(id, handle);
                    }
                },
            }
        }

        debug!(
            paused = reg.paused.len(),
            active = reg.active.len(),
            lost,
            "Paused subscriptions"
        );
    }

    fn resume_locked(reg: &mut Registry) {
        if !reg.bulk_paused {
            return;
        }

        let resumed = reg.paused.len();
        let paused = std::mem::take(&mut reg.paused);
        reg.active.extend(paused);
        reg.bulk_paused = false;

        debug!(resumed, "Resumed subscriptions");
    }

    // --- Teardown ---

    /// Forget every tracked subscription without cancelling anything.
    ///
    /// Resets the paused flag; attachment and lifecycle classification are
    /// untouched.
    pub fn cleanup_all_connections(&self) {
        let mut reg = self.registry.lock();
        reg.active.clear();
        reg.paused.clear();
        reg.bulk_paused = false;
        debug!("Cleared subscription registries");
    }

    /// Cancel every tracked subscription, then clear both registries.
    ///
    /// Cancellations run concurrently and all of them are awaited; a failed
    /// cancel is logged and reported but never stops the others or the
    /// final clear. Subscriptions registered while cancellations are in
    /// flight are cancelled in a further round, so on return nothing is
    /// tracked and nothing was dropped uncancelled.
    pub async fn force_cleanup_all(&self) -> CleanupReport {
        let mut report = CleanupReport::default();

        loop {
            let targets: Vec<(SubscriptionId, SubscriptionHandle)> = {
                let mut reg = self.registry.lock();
                if reg.active.is_empty() && reg.paused.is_empty() {
                    reg.bulk_paused = false;
                    break;
                }
                reg.active
                    .iter()
                    .chain(reg.paused.iter())
                    .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
                    .collect()
            };

            let results = join_all(targets.iter().map(|(id, handle)| async move {
                (id.clone(), handle.cancel().await)
            }))
            .await;

            report.attempted += results.len();
            for (id, result) in results {
                if let Err(e) = result {
                    error!(%id, error = %e, "Failed to cancel subscription");
                    report.failed.push((id, e));
                }
            }

            let mut reg = self.registry.lock();
            for (id, handle) in &targets {
                reg.remove_if_same(id, handle);
            }
        }

        debug!(
            attempted = report.attempted,
            failed = report.failed.len(),
            "Forced cleanup complete"
        );
        report
    }

    // --- Introspection ---

    /// Snapshot of the manager state.
    pub fn status(&self) -> ManagerStatus {
        let initialized = self.is_initialized();
        let reg = self.registry.lock();
        ManagerStatus {
            initialized,
            backgrounded: reg.backgrounded,
            paused: reg.bulk_paused,
            active_count: reg.active.len(),
            paused_count: reg.paused.len(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.attachment.lock().is_some()
    }

    pub fn is_backgrounded(&self) -> bool {
        self.registry.lock().backgrounded
    }

    /// Whether a bulk pause is in effect.
    pub fn is_paused(&self) -> bool {
        self.registry.lock().bulk_paused
    }

    pub fn active_count(&self) -> usize {
        self.registry.lock().active.len()
    }

    pub fn paused_count(&self) -> usize {
        self.registry.lock().paused.len()
    }

    /// Whether `id` is in the active set.
    pub fn is_active(&self, id: &SubscriptionId) -> bool {
        self.registry.lock().active.contains_key(id)
    }

    /// Whether `id` is in the paused set.
    pub fn is_paused_id(&self, id: &SubscriptionId) -> bool {
        self.registry.lock().paused.contains_key(id)
    }
}

impl Default for SubscriptionLifecycleManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl Drop for SubscriptionLifecycleManager {
    fn drop(&mut self) {
        self.dispose();
    }
}
