//! Batched asset preloading with bounded concurrency.

use crate::error::Result;
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Loads one asset into the platform cache.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load(&self, path: &str) -> Result<()>;
}

/// Configuration for a batch loader.
#[derive(Clone, Debug)]
pub struct BatchLoaderConfig {
    /// Pause between consecutive batches.
    /// Default: 100ms
    pub batch_pause: Duration,

    /// Record assets whose load failed as cached, so later calls skip them.
    /// Default: true
    pub mark_failed_as_cached: bool,
}

impl Default for BatchLoaderConfig {
    fn default() -> Self {
        Self {
            batch_pause: Duration::from_millis(100),
            mark_failed_as_cached: true,
        }
    }
}

/// Counts from one completed `cache` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Paths that were not already cached.
    pub requested: usize,
    pub loaded: usize,
    pub failed: usize,
}

/// Clears the busy flag on every exit path, including a dropped future.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Preloads assets in fixed-size batches and remembers what it has loaded.
pub struct BatchAssetLoader<L> {
    loader: L,
    config: BatchLoaderConfig,
    cached: RwLock<HashSet<String>>,
    loading: AtomicBool,
}

impl<L: AssetLoader> BatchAssetLoader<L> {
    pub fn new(loader: L) -> Self {
        Self::with_config(loader, BatchLoaderConfig::default())
    }

    pub fn with_config(loader: L, config: BatchLoaderConfig) -> Self {
        Self {
            loader,
            config,
            cached: RwLock::new(HashSet::new()),
            loading: AtomicBool::new(false),
        }
    }

    /// Preload `paths` without progress reporting. See [`Self::cache_with_progress`].
    pub async fn cache<S: AsRef<str>>(
        &self,
        paths: &[S],
        batch_size: usize,
    ) -> Option<LoadSummary> {
        self.cache_with_progress(paths, batch_size, |_, _| {}).await
    }

    /// Preload every path not already cached, `batch_size` at a time.
    ///
    /// Items in a batch load concurrently; a failed item is logged and does
    /// not stop the batch. After each batch `on_progress(done, total)` is
    /// called, then the loader waits `batch_pause` before the next one.
    ///
    /// Returns `None` without doing anything if another call is still in
    /// progress. A `batch_size` of zero is treated as one.
    pub async fn cache_with_progress<S, F>(
        &self,
        paths: &[S],
        batch_size: usize,
        mut on_progress: F,
    ) -> Option<LoadSummary>
    where
        S: AsRef<str>,
        F: FnMut(usize, usize),
    {
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Asset preload already in progress, ignoring request");
            return None;
        }
        let _guard = LoadingGuard(&self.loading);

        let pending: Vec<String> = {
            let cached = self.cached.read();
            paths
                .iter()
                .map(|path| path.as_ref())
                .filter(|path| !cached.contains(*path))
                .map(str::to_string)
                .collect()
        };

        let total = pending.len();
        let mut summary = LoadSummary {
            requested: total,
            ..Default::default()
        };
        if total == 0 {
            return Some(summary);
        }

        let batch_size = batch_size.max(1);
        let mut done = 0;

        for chunk in pending.chunks(batch_size) {
            let results = join_all(chunk.iter().map(|path| self.loader.load(path))).await;

            {
                let mut cached = self.cached.write();
                for (path, result) in chunk.iter().zip(results) {
                    match result {
                        Ok(()) => {
                            summary.loaded += 1;
                            cached.insert(path.clone());
                        }
                        Err(e) => {
                            warn!(path = %path, error = %e, "Failed to preload asset");
                            summary.failed += 1;
                            if self.config.mark_failed_as_cached {
                                cached.insert(path.clone());
                            }
                        }
                    }
                }
            }

            done += chunk.len();
            on_progress(done, total);
            debug!(done, total, "Preloaded asset batch");

            if done < total {
                tokio::time::sleep(self.config.batch_pause).await;
            }
        }

        Some(summary)
    }

    pub fn is_cached(&self, path: &str) -> bool {
        self.cached.read().contains(path)
    }

    pub fn cached_count(&self) -> usize {
        self.cached.read().len()
    }

    /// Whether a `cache` call is in progress.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Forget every cached path so the next call loads them again.
    pub fn clear_cache(&self) {
        self.cached.write().clear();
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}
