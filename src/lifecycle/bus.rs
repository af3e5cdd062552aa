//! In-process lifecycle notification source.

use crate::types::AppLifecycleState;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Callback invoked for every delivered lifecycle signal.
pub type LifecycleCallback = Arc<dyn Fn(AppLifecycleState) + Send + Sync>;

/// Token returned when an observer is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// Anything that can deliver lifecycle signals to attached observers.
pub trait LifecycleSource: Send + Sync {
    /// Attach an observer. It receives every signal delivered afterwards.
    fn add_observer(&self, callback: LifecycleCallback) -> ObserverId;

    /// Detach an observer. Returns false if it was not attached.
    fn remove_observer(&self, id: ObserverId) -> bool;
}

/// Fan-out lifecycle source driven by the host.
///
/// The host calls [`LifecycleBus::notify`] from its platform hook, or feeds
/// signals through a channel and runs [`LifecycleBus::pump`] on a dedicated
/// thread. A repeat of the last delivered state is dropped, so observers see
/// each actual transition at most once.
pub struct LifecycleBus {
    observers: RwLock<HashMap<ObserverId, LifecycleCallback>>,
    next_id: AtomicU64,
    last_state: Mutex<Option<AppLifecycleState>>,
}

impl LifecycleBus {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            last_state: Mutex::new(None),
        }
    }

    /// Create a channel for delivering signals from another thread.
    pub fn channel() -> (Sender<AppLifecycleState>, Receiver<AppLifecycleState>) {
        unbounded()
    }

    /// Deliver a signal to every observer.
    ///
    /// Returns false when the signal repeated the last delivered state and
    /// was suppressed.
    pub fn notify(&self, state: AppLifecycleState) -> bool {
        {
            let mut last = self.last_state.lock();
            if *last == Some(state) {
                debug!(?state, "Suppressing repeated lifecycle signal");
                return false;
            }
            *last = Some(state);
        }

        // Callbacks may attach or detach observers, so run them unlocked.
        let callbacks: Vec<LifecycleCallback> = self.observers.read().values().cloned().collect();
        debug!(?state, observers = callbacks.len(), "Delivering lifecycle signal");
        for callback in callbacks {
            callback(state);
        }
        true
    }

    /// Forward signals from `receiver` until every sender is dropped.
    ///
    /// Returns the number of signals actually delivered.
    pub fn pump(&self, receiver: &Receiver<AppLifecycleState>) -> usize {
        let mut delivered = 0;
        for state in receiver.iter() {
            if self.notify(state) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Number of attached observers.
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Last state delivered, if any.
    pub fn last_state(&self) -> Option<AppLifecycleState> {
        *self.last_state.lock()
    }
}

impl LifecycleSource for LifecycleBus {
    fn add_observer(&self, callback: LifecycleCallback) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.write().insert(id, callback);
        id
    }

    fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.write().remove(&id).is_some()
    }
}

impl Default for LifecycleBus {
    fn default() -> Self {
        Self::new()
    }
}
