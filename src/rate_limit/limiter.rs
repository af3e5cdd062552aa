//! Per-key debounce and throttle gates.

use crate::error::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::debug;

/// Deferred callback accepted by [`RateLimiter::batch`].
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// A scheduled debounce invocation.
struct PendingCall {
    /// Distinguishes this call from later ones under the same key.
    generation: u64,
    task: AbortHandle,
}

type PendingTable = Arc<Mutex<HashMap<String, PendingCall>>>;

/// Rate-limits repeated callback invocations by key.
///
/// Debounce timers run as tasks on the tokio runtime the limiter was built
/// on. Throttle decisions are synchronous and read the tokio clock, so they
/// follow a paused test clock too.
pub struct RateLimiter {
    runtime: Handle,
    pending: PendingTable,
    last_calls: Mutex<HashMap<String, Instant>>,
    next_generation: AtomicU64,
}

impl RateLimiter {
    /// Create a limiter on the current tokio runtime.
    ///
    /// Fails with [`Error::NoRuntime`](crate::Error::NoRuntime) outside one.
    pub fn new() -> Result<Self> {
        Ok(Self::with_handle(Handle::try_current()?))
    }

    /// Create a limiter that spawns its timers on `runtime`.
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            pending: Arc::new(Mutex::new(HashMap::new())),
            last_calls: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Run `callback` once `delay` has passed without another call for `key`.
    ///
    /// Any call still pending under `key` is cancelled. After the timer fires
    /// the task yields once more before invoking the callback, so it runs on
    /// the next scheduler turn rather than inside the timer wakeup.
    pub fn debounce<F>(&self, key: impl Into<String>, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let key = key.into();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let pending = Arc::clone(&self.pending);
        let task_key = key.clone();

        let mut table = self.pending.lock();
        if let Some(previous) = table.remove(&key) {
            previous.task.abort();
            debug!(key = %key, "Debounce restarted");
        }

        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::task::yield_now().await;

            {
                let mut table = pending.lock();
                match table.get(&task_key) {
                    Some(call) if call.generation == generation => {
                        table.remove(&task_key);
                    }
                    // Superseded or cleared while we were waking up.
                    _ => return,
                }
            }
            callback();
        });

        table.insert(
            key,
            PendingCall {
                generation,
                task: task.abort_handle(),
            },
        );
    }

    /// Run `callback` now unless `key` was accepted less than `min_interval` ago.
    ///
    /// Returns true if the call was accepted. Rejected calls are dropped, not
    /// deferred.
    pub fn throttle<F>(&self, key: &str, min_interval: Duration, callback: F) -> bool
    where
        F: FnOnce(),
    {
        let now = Instant::now();
        {
            let mut last_calls = self.last_calls.lock();
            if let Some(last) = last_calls.get(key) {
                if now.saturating_duration_since(*last) < min_interval {
                    return false;
                }
            }
            last_calls.insert(key.to_string(), now);
        }

        callback();
        true
    }

    /// Run all `callbacks`, in order, on a single task after the caller yields.
    pub fn batch(&self, callbacks: Vec<Callback>) -> JoinHandle<()> {
        self.runtime.spawn(async move {
            for callback in callbacks {
                callback();
            }
        })
    }

    /// Cancel the pending debounce for `key`. Returns false if none was pending.
    pub fn cancel(&self, key: &str) -> bool {
        match self.pending.lock().remove(key) {
            Some(call) => {
                call.task.abort();
                true
            }
            None => false,
        }
    }

    /// Number of debounce calls waiting to fire.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Cancel every pending debounce and forget every throttle timestamp.
    pub fn clear_all(&self) {
        let drained: Vec<PendingCall> = self.pending.lock().drain().map(|(_, call)| call).collect();
        for call in &drained {
            call.task.abort();
        }
        self.last_calls.lock().clear();
        debug!(cancelled = drained.len(), "Cleared rate limiter");
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        for (_, call) in self.pending.lock().drain() {
            call.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::{advance, sleep};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let shared = Arc::clone(&count);
        let make = move || {
            let c = Arc::clone(&shared);
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        };
        (count, make)
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        assert!(matches!(RateLimiter::new(), Err(crate::Error::NoRuntime(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_fires_after_last_call() {
        let limiter = RateLimiter::new().unwrap();
        let (count, make) = counter();
        let delay = Duration::from_millis(16);

        limiter.debounce("search", delay, make());
        sleep(Duration::from_millis(5)).await;
        limiter.debounce("search", delay, make());
        sleep(Duration::from_millis(15)).await;
        limiter.debounce("search", delay, make());

        // t=30: the first two timers would have fired by now, the last not yet.
        sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // t=40: fired once, relative to the call at t=20.
        sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(limiter.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_keys_are_independent() {
        let limiter = RateLimiter::new().unwrap();
        let (count, make) = counter();

        limiter.debounce("a", Duration::from_millis(10), make());
        limiter.debounce("b", Duration::from_millis(10), make());
        assert_eq!(limiter.pending_count(), 2);

        sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_clear_all() {
        let limiter = RateLimiter::new().unwrap();
        let (count, make) = counter();

        limiter.debounce("a", Duration::from_millis(10), make());
        limiter.debounce("b", Duration::from_millis(10), make());
        limiter.debounce("c", Duration::from_millis(10), make());

        assert!(limiter.cancel("a"));
        assert!(!limiter.cancel("a"));
        limiter.clear_all();
        assert_eq!(limiter.pending_count(), 0);

        sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_drops_calls_inside_interval() {
        let limiter = RateLimiter::new().unwrap();
        let interval = Duration::from_millis(30);
        let mut accepted = Vec::new();

        // t=0
        accepted.push(limiter.throttle("scroll", interval, || {}));
        advance(Duration::from_millis(10)).await;
        // t=10
        accepted.push(limiter.throttle("scroll", interval, || {}));
        advance(Duration::from_millis(30)).await;
        // t=40
        accepted.push(limiter.throttle("scroll", interval, || {}));

        assert_eq!(accepted, vec![true, false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all_resets_throttle() {
        let limiter = RateLimiter::new().unwrap();
        let interval = Duration::from_secs(60);

        assert!(limiter.throttle("tap", interval, || {}));
        assert!(!limiter.throttle("tap", interval, || {}));
        assert!(limiter.throttle("other", interval, || {}));

        limiter.clear_all();
        assert!(limiter.throttle("tap", interval, || {}));
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let limiter = RateLimiter::new().unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        let callbacks: Vec<Callback> = (0..5)
            .map(|i| {
                let order = Arc::clone(&order);
                Box::new(move || order.lock().push(i)) as Callback
            })
            .collect();

        let task = limiter.batch(callbacks);
        // Nothing runs until the caller yields.
        assert!(order.lock().is_empty());

        task.await.unwrap();
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }
}
