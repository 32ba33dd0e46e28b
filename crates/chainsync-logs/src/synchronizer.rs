//! `LogSynchronizer`: backfill + live log sync with dedup and checkpoints.
//!
//! # Lifecycle
//! `Initializing → Backfilling → Live`, `Refreshing` re-enters `Backfilling`,
//! `Closed` is terminal.
//!
//! # Backfill
//! Query `[last_processed_block + 1, head]` (optionally in chunks), process the
//! entries strictly in order, then persist the checkpoint once for the batch.
//!
//! # Live
//! Subscribe with the same filter. Each delivered entry goes through the same
//! pipeline and is followed by a single-entry checkpoint save. Entries landing
//! between the backfill head and the subscription are picked up by a short
//! catch-up query; the dedup set absorbs any overlap.
//!
//! # Recovery
//! `last_processed_block` moves to block B on the first live entry of B, so it
//! cannot tell whether B is complete. Gap queries start instead from
//! `synced_through + 1`: the highest block known to be fully covered, either by
//! a finished range query or by a live entry of a later block.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chainsync_core::LogEntry;
use futures::StreamExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::checkpoint::{CheckpointStore, SyncCheckpoint};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::filter::LogFilter;
use crate::source::{LogSource, LogStream};
use crate::transform::LogTransform;

/// Runtime state of a synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// Loading the checkpoint.
    Initializing,
    /// Processing historical entries up to the chain head.
    Backfilling,
    /// Following the live subscription.
    Live,
    /// Discarding all progress before a full resync.
    Refreshing,
    /// Terminated.
    Closed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Backfilling => write!(f, "backfilling"),
            Self::Live => write!(f, "live"),
            Self::Refreshing => write!(f, "refreshing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug)]
enum Control {
    Refresh,
    Close,
}

/// State visible to `SyncHandle`s.
struct Shared<O> {
    state: watch::Sender<SyncState>,
    results: RwLock<Vec<O>>,
    last_processed_block: AtomicU64,
    closed: AtomicBool,
}

impl<O> Shared<O> {
    fn results(&self) -> RwLockReadGuard<'_, Vec<O>> {
        self.results.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn results_mut(&self) -> RwLockWriteGuard<'_, Vec<O>> {
        self.results.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable control handle for a running synchronizer.
pub struct SyncHandle<O> {
    shared: Arc<Shared<O>>,
    control: mpsc::UnboundedSender<Control>,
}

impl<O> Clone for SyncHandle<O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            control: self.control.clone(),
        }
    }
}

impl<O: Clone> SyncHandle<O> {
    /// Ask `run` to discard all progress and resync from the default start block.
    pub fn refresh(&self) -> Result<(), SyncError> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(SyncError::Closed);
        }
        self.control
            .send(Control::Refresh)
            .map_err(|_| SyncError::Closed)
    }

    /// Stop accepting entries. Work already dispatched may complete.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        let _ = self.control.send(Control::Close);
    }

    pub fn state(&self) -> SyncState {
        *self.shared.state.borrow()
    }

    /// Wait until the synchronizer reaches `state`.
    pub async fn wait_for(&self, state: SyncState) -> Result<(), SyncError> {
        let mut rx = self.shared.state.subscribe();
        rx.wait_for(|s| *s == state)
            .await
            .map(|_| ())
            .map_err(|_| SyncError::Closed)
    }

    /// Snapshot of the result list.
    pub fn results(&self) -> Vec<O> {
        self.shared.results().clone()
    }

    pub fn last_processed_block(&self) -> u64 {
        self.shared.last_processed_block.load(Ordering::SeqCst)
    }
}

/// Follows the logs matching one filter, feeding each entry exactly once
/// (per instance) through a transform and accumulating its results.
pub struct LogSynchronizer<T: LogTransform> {
    source: Arc<dyn LogSource>,
    store: Option<Arc<dyn CheckpointStore>>,
    transform: T,
    filter: LogFilter,
    config: SyncConfig,
    key: String,
    last_processed_block: u64,
    /// Every block up to here has been fully delivered.
    synced_through: u64,
    /// The checkpoint has been loaded; later `start` calls keep in-memory state.
    initialized: bool,
    /// `(block_number, log_index)` of every entry handed to the transform.
    seen: HashSet<(u64, u64)>,
    live: Option<LogStream>,
    shared: Arc<Shared<T::Output>>,
    control_tx: mpsc::UnboundedSender<Control>,
    control_rx: mpsc::UnboundedReceiver<Control>,
}

impl<T> LogSynchronizer<T>
where
    T: LogTransform,
    T::Output: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create a synchronizer. With `store = None`, progress lives only as long
    /// as this instance.
    pub fn new(
        source: Arc<dyn LogSource>,
        filter: LogFilter,
        transform: T,
        store: Option<Arc<dyn CheckpointStore>>,
        config: SyncConfig,
    ) -> Self {
        let key = filter.checkpoint_key(&config.schema_version);
        let (state, _) = watch::channel(SyncState::Initializing);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        Self {
            source,
            store,
            transform,
            filter,
            last_processed_block: config.default_start_block,
            synced_through: config.default_start_block,
            initialized: false,
            shared: Arc::new(Shared {
                state,
                results: RwLock::new(Vec::new()),
                last_processed_block: AtomicU64::new(config.default_start_block),
                closed: AtomicBool::new(false),
            }),
            config,
            key,
            seen: HashSet::new(),
            live: None,
            control_tx,
            control_rx,
        }
    }

    pub fn handle(&self) -> SyncHandle<T::Output> {
        SyncHandle {
            shared: Arc::clone(&self.shared),
            control: self.control_tx.clone(),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.shared.state.borrow()
    }

    pub fn last_processed_block(&self) -> u64 {
        self.last_processed_block
    }

    /// Snapshot of the result list.
    pub fn results(&self) -> Vec<T::Output> {
        self.shared.results().clone()
    }

    pub fn checkpoint_key(&self) -> &str {
        &self.key
    }

    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Load the checkpoint, backfill to the chain head and open the live
    /// subscription. On success the state is `Live` (or `Closed` if a close
    /// arrived meanwhile).
    ///
    /// The checkpoint is read only by the first call. Calling `start` again
    /// after a failure continues from the in-memory position, and the dedup
    /// set still guards every entry already handed to the transform.
    pub async fn start(&mut self) -> Result<(), SyncError> {
        if self.is_closed() {
            return Err(SyncError::Closed);
        }
        if !self.initialized {
            self.initialize().await?;
        }
        self.sync_and_subscribe().await
    }

    /// Discard the checkpoint, results and dedup set, reset to the default
    /// start block, and backfill again from scratch.
    pub async fn refresh(&mut self) -> Result<(), SyncError> {
        if self.is_closed() {
            return Err(SyncError::Closed);
        }
        self.set_state(SyncState::Refreshing);
        info!(key = %self.key, "Refreshing: discarding checkpoint and results");

        self.live = None;
        if let Some(store) = &self.store {
            store.delete(&self.key).await?;
        }
        self.shared.results_mut().clear();
        self.seen.clear();
        self.set_last_block(self.config.default_start_block);
        self.synced_through = self.config.default_start_block;

        self.sync_and_subscribe().await
    }

    /// Cancel the live subscription. Terminal.
    pub fn close(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        if self.live.take().is_some() || self.state() != SyncState::Closed {
            info!(key = %self.key, "Synchronizer closed");
        }
        self.set_state(SyncState::Closed);
    }

    /// Wait for the next live entry and process it.
    ///
    /// Returns `Ok(false)` once the subscription has ended or the synchronizer
    /// is closed.
    pub async fn process_next_live(&mut self) -> Result<bool, SyncError> {
        if self.is_closed() {
            return Ok(false);
        }
        let Some(stream) = self.live.as_mut() else {
            return Ok(false);
        };
        let item = stream.next().await;
        match item {
            Some(Ok(entry)) => {
                self.handle_live(&entry).await?;
                Ok(true)
            }
            Some(Err(e)) => {
                self.live = None;
                Err(e)
            }
            None => {
                self.live = None;
                Ok(false)
            }
        }
    }

    /// Start, then follow the live subscription until closed.
    ///
    /// Refresh and close requests arrive through `SyncHandle`. If the live
    /// subscription ends or errors, the gap is backfilled and a new
    /// subscription is opened.
    pub async fn run(&mut self) -> Result<(), SyncError> {
        self.start().await?;

        loop {
            if self.is_closed() {
                self.close();
                return Ok(());
            }

            if self.live.is_none() {
                tokio::time::sleep(Duration::from_millis(self.config.resubscribe_delay_ms)).await;
                self.sync_and_subscribe().await?;
                continue;
            }
            let Some(stream) = self.live.as_mut() else {
                continue;
            };

            let event = tokio::select! {
                ctl = self.control_rx.recv() => Event::Control(ctl),
                item = stream.next() => Event::Live(item),
            };

            match event {
                Event::Control(Some(Control::Refresh)) => self.refresh().await?,
                Event::Control(Some(Control::Close)) | Event::Control(None) => {
                    self.close();
                    return Ok(());
                }
                Event::Live(Some(Ok(entry))) => self.handle_live(&entry).await?,
                Event::Live(Some(Err(e))) => {
                    warn!(key = %self.key, error = %e, "Live subscription error, resubscribing");
                    self.live = None;
                }
                Event::Live(None) => {
                    info!(key = %self.key, "Live subscription ended, resubscribing");
                    self.live = None;
                }
            }
        }
    }

    // ─── Phases ───────────────────────────────────────────────────────────────

    async fn initialize(&mut self) -> Result<(), SyncError> {
        self.set_state(SyncState::Initializing);
        self.seen.clear();
        self.shared.results_mut().clear();
        self.set_last_block(self.config.default_start_block);

        self.synced_through = self.config.default_start_block;

        let Some(store) = self.store.clone() else {
            debug!(key = %self.key, "No checkpoint store, starting in memory");
            self.initialized = true;
            return Ok(());
        };
        match store.get(&self.key).await? {
            Some(cp) => {
                let results = cp
                    .results
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<T::Output>, _>>()?;
                info!(
                    key = %self.key,
                    block = cp.last_processed_block,
                    results = results.len(),
                    "Resuming from checkpoint"
                );
                *self.shared.results_mut() = results;
                self.set_last_block(cp.last_processed_block);
                self.synced_through = cp.last_processed_block;
            }
            None => {
                info!(
                    key = %self.key,
                    block = self.config.default_start_block,
                    "No checkpoint, starting from default block"
                );
            }
        }
        self.initialized = true;
        Ok(())
    }

    /// Backfill to the current head, subscribe, then catch up on anything
    /// that landed before the subscription opened.
    async fn sync_and_subscribe(&mut self) -> Result<(), SyncError> {
        self.set_state(SyncState::Backfilling);

        let head = self.source.head_block_number().await?;
        let from = self.synced_through.saturating_add(1);
        if !self.backfill(from, head).await? {
            return Ok(());
        }

        let stream = self.source.subscribe_logs(&self.filter).await?;
        self.live = Some(stream);

        let new_head = self.source.head_block_number().await?;
        if new_head > self.synced_through && !self.backfill(self.synced_through + 1, new_head).await? {
            return Ok(());
        }

        self.set_state(SyncState::Live);
        info!(key = %self.key, address = %self.filter.address, "Live subscription open");
        Ok(())
    }

    /// Process every entry in `[from, to]` and persist once.
    ///
    /// Returns `Ok(false)` if a close interrupted the batch; nothing is
    /// persisted in that case.
    async fn backfill(&mut self, from: u64, to: u64) -> Result<bool, SyncError> {
        if from > to {
            debug!(from, to, "Nothing to backfill");
            return Ok(true);
        }
        info!(key = %self.key, from, to, "Starting backfill");

        let span = self.config.block_span();
        let mut cursor = from;
        let mut fetched = 0usize;
        let mut processed = 0usize;
        loop {
            let end = cursor.saturating_add(span - 1).min(to);
            let entries = self.source.query_logs(&self.filter, cursor, end).await?;
            fetched += entries.len();

            for entry in &entries {
                if self.is_closed() {
                    info!(key = %self.key, at = entry.block_number, "Closed during backfill");
                    self.close();
                    return Ok(false);
                }
                if self.process_entry(entry).await? {
                    processed += 1;
                }
            }

            if end >= to {
                break;
            }
            cursor = end + 1;
        }

        self.persist().await?;
        self.synced_through = self.synced_through.max(to);
        info!(
            key = %self.key,
            from,
            to,
            fetched,
            processed,
            last_processed_block = self.last_processed_block,
            "Backfill complete"
        );
        Ok(true)
    }

    async fn handle_live(&mut self, entry: &LogEntry) -> Result<(), SyncError> {
        if self.is_closed() {
            return Ok(());
        }
        if self.process_entry(entry).await? {
            self.persist().await?;
        }
        // The feed is ordered: an entry of block B means every earlier block is done.
        let before = entry.block_number.saturating_sub(1);
        if !entry.removed && before > self.synced_through {
            self.synced_through = before;
        }
        Ok(())
    }

    /// Dedup, transform and record one entry. Returns `true` if the transform ran.
    async fn process_entry(&mut self, entry: &LogEntry) -> Result<bool, SyncError> {
        if entry.removed {
            debug!(block = entry.block_number, log_index = entry.log_index, "Skipping removed log");
            return Ok(false);
        }
        let pos = entry.position();
        if !self.seen.insert(pos) {
            debug!(block = entry.block_number, log_index = entry.log_index, "Skipping duplicate log");
            return Ok(false);
        }

        match self.transform.apply(entry).await {
            Ok(output) => {
                if let Some(output) = output {
                    self.shared.results_mut().push(output);
                }
                if entry.block_number > self.last_processed_block {
                    self.set_last_block(entry.block_number);
                }
                Ok(true)
            }
            Err(source) => {
                // Let a later attempt in this session retry the entry
                self.seen.remove(&pos);
                warn!(
                    block = entry.block_number,
                    log_index = entry.log_index,
                    error = %source,
                    "Transform failed, aborting batch"
                );
                Err(SyncError::Transform {
                    block_number: entry.block_number,
                    log_index: entry.log_index,
                    source,
                })
            }
        }
    }

    async fn persist(&mut self) -> Result<(), SyncError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let results = self
            .shared
            .results()
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let count = results.len();
        store
            .set(&self.key, &SyncCheckpoint::new(self.last_processed_block, results))
            .await?;
        debug!(
            key = %self.key,
            block = self.last_processed_block,
            results = count,
            "Checkpoint saved"
        );
        Ok(())
    }

    fn set_state(&self, state: SyncState) {
        self.shared.state.send_replace(state);
    }

    fn set_last_block(&mut self, block: u64) {
        self.last_processed_block = block;
        self.shared.last_processed_block.store(block, Ordering::SeqCst);
    }
}

enum Event {
    Control(Option<Control>),
    Live(Option<Result<LogEntry, SyncError>>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display() {
        assert_eq!(SyncState::Backfilling.to_string(), "backfilling");
        assert_eq!(SyncState::Closed.to_string(), "closed");
    }
}
