//! Error types for the log synchronizer.

use thiserror::Error;

/// Error type returned by transforms.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Historical log query (or head lookup) failed. Fatal to the current
    /// startup attempt.
    #[error("Log query failed: {0}")]
    Query(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    /// The per-entry transform failed; the current batch was aborted.
    #[error("Transform failed at block {block_number}, log {log_index}: {source}")]
    Transform {
        block_number: u64,
        log_index: u64,
        #[source]
        source: BoxError,
    },

    #[error("Checkpoint storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Synchronizer is closed")]
    Closed,
}

impl SyncError {
    /// Returns `true` for transform failures, which only abort the current batch.
    pub fn is_transform(&self) -> bool {
        matches!(self, Self::Transform { .. })
    }
}
