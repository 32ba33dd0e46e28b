//! Fluent builder for `LogSynchronizer`.
//!
//! # Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use chainsync_logs::{SyncBuilder, DecodeTransform, MemoryCheckpointStore, LogSource};
//! # fn demo(rpc: Arc<dyn LogSource>, decoder: Arc<chainsync_evm::Decoder>) {
//! let sync = SyncBuilder::new(rpc, DecodeTransform::new(decoder))
//!     .address("0xC2EdaD668740f1aA35E4D8f227fB8E17dcA888Cd")
//!     .topic("0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef")
//!     .store(Arc::new(MemoryCheckpointStore::new()))
//!     .max_block_range(2_000)
//!     .build();
//! # }
//! ```

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::checkpoint::CheckpointStore;
use crate::config::SyncConfig;
use crate::filter::LogFilter;
use crate::source::LogSource;
use crate::synchronizer::LogSynchronizer;
use crate::transform::LogTransform;

pub struct SyncBuilder<T> {
    source: Arc<dyn LogSource>,
    transform: T,
    filter: LogFilter,
    store: Option<Arc<dyn CheckpointStore>>,
    config: SyncConfig,
}

impl<T> SyncBuilder<T>
where
    T: LogTransform,
    T::Output: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(source: Arc<dyn LogSource>, transform: T) -> Self {
        Self {
            source,
            transform,
            filter: LogFilter::default(),
            store: None,
            config: SyncConfig::default(),
        }
    }

    /// Set the contract address to follow.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.filter.address = address.into();
        self
    }

    /// Append an exact topic position.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.filter = self.filter.topic(topic);
        self
    }

    /// Append a wildcard topic position.
    pub fn any_topic(mut self) -> Self {
        self.filter = self.filter.any_topic();
        self
    }

    /// Replace the whole filter.
    pub fn filter(mut self, filter: LogFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Persist checkpoints to `store`. Without one, progress is in-memory only.
    pub fn store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn default_start_block(mut self, block: u64) -> Self {
        self.config.default_start_block = block;
        self
    }

    pub fn schema_version(mut self, version: impl Into<String>) -> Self {
        self.config.schema_version = version.into();
        self
    }

    /// Split historical queries into ranges of at most `blocks`.
    pub fn max_block_range(mut self, blocks: u64) -> Self {
        self.config.max_block_range = Some(blocks);
        self
    }

    pub fn resubscribe_delay_ms(mut self, ms: u64) -> Self {
        self.config.resubscribe_delay_ms = ms;
        self
    }

    pub fn build(self) -> LogSynchronizer<T> {
        LogSynchronizer::new(
            self.source,
            self.filter,
            self.transform,
            self.store,
            self.config,
        )
    }
}
