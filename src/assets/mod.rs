//! Batched asset preloading.
//!
//! Splits a list of asset paths into fixed-size batches, loads each batch
//! concurrently through an [`AssetLoader`], and remembers which paths are
//! done so repeated calls only load what is new.

mod loader;

pub use loader::{AssetLoader, BatchAssetLoader, BatchLoaderConfig, LoadSummary};
