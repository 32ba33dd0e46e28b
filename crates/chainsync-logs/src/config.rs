//! Synchronizer configuration.

use serde::{Deserialize, Serialize};

/// Block at which log sync begins when no checkpoint exists, chosen to
/// predate the protocol's first deployments.
pub const DEFAULT_START_BLOCK: u64 = 10_750_000;

/// Configuration for one `LogSynchronizer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Initial `last_processed_block` when no checkpoint exists; the first
    /// historical query starts one block later.
    #[serde(default = "default_start_block")]
    pub default_start_block: u64,
    /// Part of the checkpoint key. Bump it when the transform's output shape
    /// changes so stale results are not resumed.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Split historical queries into ranges of at most this many blocks.
    /// `None` queries the whole range at once.
    #[serde(default)]
    pub max_block_range: Option<u64>,
    /// Pause before re-opening a live subscription that ended or errored.
    #[serde(default = "default_resubscribe_delay_ms")]
    pub resubscribe_delay_ms: u64,
}

fn default_start_block() -> u64 { DEFAULT_START_BLOCK }
fn default_schema_version() -> String { "1".into() }
fn default_resubscribe_delay_ms() -> u64 { 1_000 }

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_start_block: DEFAULT_START_BLOCK,
            schema_version: default_schema_version(),
            max_block_range: None,
            resubscribe_delay_ms: default_resubscribe_delay_ms(),
        }
    }
}

impl SyncConfig {
    /// Effective chunk size for historical queries.
    pub(crate) fn block_span(&self) -> u64 {
        self.max_block_range.filter(|n| *n > 0).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_json() {
        let cfg: SyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, SyncConfig::default());
        assert_eq!(cfg.default_start_block, 10_750_000);
        assert_eq!(cfg.schema_version, "1");
        assert_eq!(cfg.block_span(), u64::MAX);
    }

    #[test]
    fn zero_range_means_unbounded() {
        let cfg = SyncConfig {
            max_block_range: Some(0),
            ..Default::default()
        };
        assert_eq!(cfg.block_span(), u64::MAX);
    }
}
