//! File-backed checkpoint store.
//!
//! One JSON document per key inside a directory. File names are the keccak-256
//! of the key, since keys embed topic lists and are not path-safe.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chainsync_core::hash::keccak256;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checkpoint::{CheckpointStore, SyncCheckpoint};
use crate::error::SyncError;

#[derive(Serialize, Deserialize)]
struct Document {
    key: String,
    checkpoint: SyncCheckpoint,
}

#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, SyncError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| SyncError::Storage(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", hex::encode(keccak256(key.as_bytes()))))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn get(&self, key: &str) -> Result<Option<SyncCheckpoint>, SyncError> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SyncError::Storage(format!("read {}: {e}", path.display()))),
        };
        let doc: Document = serde_json::from_slice(&raw)?;
        Ok(Some(doc.checkpoint))
    }

    async fn set(&self, key: &str, checkpoint: &SyncCheckpoint) -> Result<(), SyncError> {
        let path = self.path_for(key);
        let body = serde_json::to_vec_pretty(&Document {
            key: key.to_string(),
            checkpoint: checkpoint.clone(),
        })?;

        // Write-then-rename so readers never observe a partial document
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| SyncError::Storage(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| SyncError::Storage(format!("rename {}: {e}", path.display())))?;

        debug!(key, path = %path.display(), "Checkpoint file written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SyncError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::Storage(format!("remove {}: {e}", path.display()))),
        }
    }
}
