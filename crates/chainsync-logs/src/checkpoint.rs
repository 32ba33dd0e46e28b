//! Checkpoints: the synchronizer's resumable progress.
//!
//! A checkpoint stores the last processed block and every result produced so
//! far. On restart the synchronizer resumes from `last_processed_block + 1`
//! and re-seeds its result list from the checkpoint.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Persisted synchronizer progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCheckpoint {
    pub last_processed_block: u64,
    /// Transform results in processing order.
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
    /// Unix timestamp of when this checkpoint was saved.
    #[serde(default)]
    pub updated_at: i64,
}

impl SyncCheckpoint {
    pub fn new(last_processed_block: u64, results: Vec<serde_json::Value>) -> Self {
        Self {
            last_processed_block,
            results,
            updated_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Key-value persistence for checkpoints.
///
/// Implementations must tolerate concurrent calls from independent
/// synchronizers sharing one store.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<SyncCheckpoint>, SyncError>;

    /// Save (upsert) a checkpoint.
    async fn set(&self, key: &str, checkpoint: &SyncCheckpoint) -> Result<(), SyncError>;

    /// Delete a checkpoint; deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), SyncError>;
}

// ─── In-memory store ──────────────────────────────────────────────────────────

/// In-memory checkpoint store for tests and process-lifetime persistence.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    data: Mutex<HashMap<String, SyncCheckpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SyncCheckpoint>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn get(&self, key: &str) -> Result<Option<SyncCheckpoint>, SyncError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, checkpoint: &SyncCheckpoint) -> Result<(), SyncError> {
        self.lock().insert(key.to_string(), checkpoint.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SyncError> {
        self.lock().remove(key);
        Ok(())
    }
}
