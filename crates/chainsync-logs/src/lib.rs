//! # chainsync-logs
//!
//! Incremental event-log synchronization for ChainSync.
//!
//! A `LogSynchronizer` backfills the historical logs matching an address/topic
//! filter, switches to a live subscription, feeds every entry exactly once
//! through a transform, and persists resumable progress to a
//! `CheckpointStore`.
//!
//! ## Architecture
//! ```text
//! LogSource (RPC) ──► LogSynchronizer ──► LogTransform ──► results
//!                          │
//!                          └──► CheckpointStore (memory / file)
//! ```

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod filter;
pub mod source;
pub mod store;
pub mod synchronizer;
pub mod transform;

pub use builder::SyncBuilder;
pub use checkpoint::{CheckpointStore, MemoryCheckpointStore, SyncCheckpoint};
pub use config::{SyncConfig, DEFAULT_START_BLOCK};
pub use error::{BoxError, SyncError};
pub use filter::{LogFilter, TopicFilter};
pub use source::{LogSource, LogStream};
pub use store::FileCheckpointStore;
pub use synchronizer::{LogSynchronizer, SyncHandle, SyncState};
pub use transform::{DecodeTransform, FnTransform, LogTransform};
