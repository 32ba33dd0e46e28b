//! Per-entry transforms applied by the synchronizer.
//!
//! A transform turns one `LogEntry` into an optional result. `Ok(None)` means
//! "skip": the entry is consumed but contributes nothing to the result list.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chainsync_core::{DecodedEvent, LogEntry};
use chainsync_evm::Decoder;

use crate::error::BoxError;

#[async_trait]
pub trait LogTransform: Send + Sync {
    type Output: Send;

    async fn apply(&self, entry: &LogEntry) -> Result<Option<Self::Output>, BoxError>;
}

/// Adapts an async closure into a `LogTransform`.
pub struct FnTransform<F> {
    f: F,
}

impl<F> FnTransform<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut, T> LogTransform for FnTransform<F>
where
    F: Fn(LogEntry) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<T>, BoxError>> + Send,
    T: Send,
{
    type Output = T;

    async fn apply(&self, entry: &LogEntry) -> Result<Option<T>, BoxError> {
        (self.f)(entry.clone()).await
    }
}

/// Decodes each entry against a shared `Decoder`. Entries whose topic is not
/// registered are skipped.
#[derive(Debug, Clone)]
pub struct DecodeTransform {
    decoder: Arc<Decoder>,
}

impl DecodeTransform {
    pub fn new(decoder: Arc<Decoder>) -> Self {
        Self { decoder }
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }
}

#[async_trait]
impl LogTransform for DecodeTransform {
    type Output = DecodedEvent;

    async fn apply(&self, entry: &LogEntry) -> Result<Option<DecodedEvent>, BoxError> {
        Ok(self.decoder.decode_log(entry)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(topics: Vec<String>, data: Vec<u8>) -> LogEntry {
        LogEntry {
            address: "0xc2edad668740f1aa35e4d8f227fb8e17dca888cd".into(),
            topics,
            data,
            block_number: 10_750_001,
            log_index: 0,
            transaction_hash: String::new(),
            removed: false,
        }
    }

    #[tokio::test]
    async fn fn_transform_passes_entry_through() {
        let t = FnTransform::new(|e: LogEntry| async move {
            Ok::<_, BoxError>((e.log_index == 0).then_some(e.block_number))
        });
        assert_eq!(t.apply(&entry(vec![], vec![])).await.unwrap(), Some(10_750_001));
    }

    #[tokio::test]
    async fn decode_transform_skips_unknown_and_fails_on_bad_data() {
        let mut decoder = Decoder::new();
        decoder
            .register_json(
                r#"[{"type":"event","name":"Transfer","inputs":[
                    {"indexed":true,"name":"from","type":"address"},
                    {"indexed":true,"name":"to","type":"address"},
                    {"indexed":false,"name":"value","type":"uint256"}]}]"#,
            )
            .unwrap();
        let t = DecodeTransform::new(Arc::new(decoder));

        let unknown = entry(vec![format!("0x{}", "11".repeat(32))], vec![]);
        assert!(t.apply(&unknown).await.unwrap().is_none());

        let word = format!("0x{}", "00".repeat(32));
        let transfer = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
        let short = entry(vec![transfer.into(), word.clone(), word.clone()], vec![0; 8]);
        assert!(t.apply(&short).await.is_err());

        let mut value = vec![0u8; 32];
        value[31] = 9;
        let ok = entry(vec![transfer.into(), word.clone(), word], value);
        let ev = t.apply(&ok).await.unwrap().unwrap();
        assert_eq!(ev.schema_name, "Transfer");
        assert_eq!(ev.param("value").and_then(|v| v.as_integer()), Some("9"));
    }
}
