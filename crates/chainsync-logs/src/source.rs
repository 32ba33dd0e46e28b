//! `LogSource` trait: abstraction over the node RPC used for log sync.
//!
//! Implementations wrap a JSON-RPC / WebSocket client. The synchronizer only
//! needs three capabilities: the current head, a historical range query, and a
//! live subscription.

use std::pin::Pin;

use async_trait::async_trait;
use chainsync_core::LogEntry;
use futures::Stream;
use serde_json::{json, Value};

use crate::error::SyncError;
use crate::filter::LogFilter;

/// Live log entries. Dropping the stream cancels the subscription.
pub type LogStream = Pin<Box<dyn Stream<Item = Result<LogEntry, SyncError>> + Send>>;

#[async_trait]
pub trait LogSource: Send + Sync {
    /// Current chain head block number.
    async fn head_block_number(&self) -> Result<u64, SyncError>;

    /// All entries matching `filter` in `[from, to]`, sorted by
    /// `(block_number, log_index)` ascending.
    async fn query_logs(
        &self,
        filter: &LogFilter,
        from: u64,
        to: u64,
    ) -> Result<Vec<LogEntry>, SyncError>;

    /// Subscribe to new entries matching `filter`.
    async fn subscribe_logs(&self, filter: &LogFilter) -> Result<LogStream, SyncError>;
}

/// `eth_getLogs` parameter object for `filter` over `[from, to]`.
pub fn rpc_log_params(filter: &LogFilter, from: u64, to: u64) -> Value {
    json!({
        "address": filter.address,
        "topics": filter.topics,
        "fromBlock": format!("0x{from:x}"),
        "toBlock": format!("0x{to:x}"),
    })
}
