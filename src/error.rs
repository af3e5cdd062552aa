//! Error types for lifecycle and loading operations.

use thiserror::Error;

/// Main error type for collaborator calls.
///
/// None of these escape the top-level manager, limiter or loader operations;
/// they are logged at the boundary or returned inside report values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Pause failed: {0}")]
    Pause(String),

    #[error("Cancel failed: {0}")]
    Cancel(String),

    #[error("Asset load failed for {path}: {reason}")]
    AssetLoad { path: String, reason: String },

    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

impl From<tokio::runtime::TryCurrentError> for Error {
    fn from(e: tokio::runtime::TryCurrentError) -> Self {
        Error::NoRuntime(e.to_string())
    }
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;
