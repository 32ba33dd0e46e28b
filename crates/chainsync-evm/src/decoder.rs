//! `Decoder`: decodes call data and log entries against registered schemas.
//!
//! A `Decoder` is an owned value: construct one per consumer, register the
//! schemas it needs, then share it (e.g. behind an `Arc`) with whatever decodes.

use std::sync::Arc;

use chainsync_core::{
    call::{DecodedCall, DecodedConstructor},
    error::{DecodeError, RegistrationError},
    event::{parse_hex, DecodedEvent, LogEntry},
    hash::{Keccak256, SignatureHasher},
    schema::{EntryKind, SchemaEntry},
};
use rayon::prelude::*;
use tracing::debug;

use crate::codec;
use crate::selector::{Selector, SelectorRegistry};

#[derive(Debug, Default)]
pub struct Decoder {
    registry: SelectorRegistry,
    /// Every entry registered so far, in registration order.
    schemas: Vec<SchemaEntry>,
}

impl Decoder {
    /// A decoder hashing signatures with keccak-256.
    pub fn new() -> Self {
        Self::default()
    }

    /// A decoder hashing signatures with the given hasher.
    pub fn with_hasher(hasher: Arc<dyn SignatureHasher>) -> Self {
        Self {
            registry: SelectorRegistry::new(hasher),
            schemas: Vec::new(),
        }
    }

    /// Build a decoder pre-loaded with `entries`.
    pub fn from_entries(entries: &[SchemaEntry]) -> Result<Self, RegistrationError> {
        let mut decoder = Self::with_hasher(Arc::new(Keccak256));
        decoder.register(entries)?;
        Ok(decoder)
    }

    /// Register schema entries. Returns the number of selector/topic keys written.
    pub fn register(&mut self, entries: &[SchemaEntry]) -> Result<usize, RegistrationError> {
        let written = self.registry.register(entries)?;
        self.schemas.extend_from_slice(entries);
        Ok(written)
    }

    /// Register a JSON schema document; the document must be an array.
    pub fn register_json(&mut self, json: &str) -> Result<usize, RegistrationError> {
        let entries = SchemaEntry::list_from_json(json)?;
        self.register(&entries)
    }

    /// Unregister schema entries. Returns the number of keys removed.
    pub fn unregister(&mut self, entries: &[SchemaEntry]) -> usize {
        let removed = self.registry.unregister(entries);
        for entry in entries {
            if let Some(pos) = self.schemas.iter().position(|s| s == entry) {
                self.schemas.remove(pos);
            }
        }
        removed
    }

    pub fn unregister_json(&mut self, json: &str) -> Result<usize, RegistrationError> {
        let entries = SchemaEntry::list_from_json(json)?;
        Ok(self.unregister(&entries))
    }

    /// All registered entries, including constructors and anonymous events.
    pub fn schemas(&self) -> &[SchemaEntry] {
        &self.schemas
    }

    /// The current selector table, sorted by key.
    pub fn selectors(&self) -> Vec<(Selector, Arc<SchemaEntry>)> {
        self.registry.entries()
    }

    pub fn registry(&self) -> &SelectorRegistry {
        &self.registry
    }

    /// Decode call data: a 4-byte selector followed by the encoded inputs.
    pub fn decode_method_call(&self, raw: &[u8]) -> Result<DecodedCall, DecodeError> {
        if raw.len() < 4 {
            return Err(DecodeError::short(0, 4, raw.len()));
        }
        let selector = [raw[0], raw[1], raw[2], raw[3]];
        let entry = self.registry.function(selector).ok_or_else(|| {
            DecodeError::UnknownSelector {
                selector: format!("0x{}", hex::encode(selector)),
            }
        })?;

        Ok(DecodedCall {
            schema_name: entry.name.clone(),
            selector,
            params: codec::decode(&entry.inputs, &raw[4..])?,
        })
    }

    /// `decode_method_call` for `0x`-prefixed hex input.
    pub fn decode_method_call_hex(&self, raw: &str) -> Result<DecodedCall, DecodeError> {
        self.decode_method_call(&parse_hex(raw)?)
    }

    /// Decode constructor arguments against the most recently registered constructor.
    pub fn decode_constructor(&self, data: &[u8]) -> Result<DecodedConstructor, DecodeError> {
        let ctor = self
            .schemas
            .iter()
            .rev()
            .find(|s| s.kind == EntryKind::Constructor)
            .ok_or(DecodeError::NoConstructor)?;
        Ok(DecodedConstructor {
            params: codec::decode(&ctor.inputs, data)?,
        })
    }

    /// Decode a single log entry.
    ///
    /// Returns `Ok(None)` when the entry has no topics or its signature topic is
    /// not registered; many contracts emit events from several unrelated schemas.
    /// A topics[0] that is not a 32-byte hex word is `DecodeError::InvalidHex`.
    pub fn decode_log(&self, entry: &LogEntry) -> Result<Option<DecodedEvent>, DecodeError> {
        let Some(topic) = entry.signature_topic()? else {
            return Ok(None);
        };
        let Some(schema) = self.registry.event(topic) else {
            debug!(
                topic = %Selector::Event(topic),
                address = %entry.address,
                "Skipping log with unregistered topic"
            );
            return Ok(None);
        };

        Ok(Some(DecodedEvent {
            schema_name: schema.name.clone(),
            contract_address: entry.address.clone(),
            params: codec::decode_log_params(&schema.inputs, &entry.topics, &entry.data)?,
        }))
    }

    /// Decode log entries, omitting those whose topic is unmatched.
    /// Output preserves input order.
    pub fn decode_logs(&self, entries: &[LogEntry]) -> Result<Vec<DecodedEvent>, DecodeError> {
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(event) = self.decode_log(entry)? {
                out.push(event);
            }
        }
        Ok(out)
    }

    /// `decode_logs` with the pure decode step spread over Rayon's pool.
    /// Results are reassembled in input order.
    pub fn decode_logs_par(&self, entries: &[LogEntry]) -> Result<Vec<DecodedEvent>, DecodeError> {
        let decoded: Vec<Option<DecodedEvent>> = entries
            .par_iter()
            .map(|entry| self.decode_log(entry))
            .collect::<Result<_, _>>()?;
        Ok(decoded.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainsync_core::types::DecodedValue;

    const ERC20_ABI: &str = r#"[
        {"type":"function","name":"transfer","inputs":[
            {"name":"to","type":"address"},{"name":"amount","type":"uint256"}
        ],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
        {"type":"event","name":"Transfer","anonymous":false,"inputs":[
            {"indexed":true,"name":"from","type":"address"},
            {"indexed":true,"name":"to","type":"address"},
            {"indexed":false,"name":"value","type":"uint256"}
        ]},
        {"type":"constructor","inputs":[{"name":"supply","type":"uint256"}]}
    ]"#;

    fn decoder() -> Decoder {
        let mut d = Decoder::new();
        d.register_json(ERC20_ABI).unwrap();
        d
    }

    #[test]
    fn decode_transfer_calldata() {
        let calldata = concat!(
            "0xa9059cbb",
            "000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa96045",
            "00000000000000000000000000000000000000000000000000000000000f4240"
        );
        let call = decoder().decode_method_call_hex(calldata).unwrap();
        assert_eq!(call.schema_name, "transfer");
        assert_eq!(call.selector_hex(), "0xa9059cbb");
        assert_eq!(
            call.param("to").and_then(|v| v.as_address()),
            Some("0xd8da6bf26964af9d7eed9e03e53415d37aa96045")
        );
        assert_eq!(call.param("amount"), Some(&DecodedValue::Uint("1000000".into())));
    }

    #[test]
    fn unknown_selector() {
        let err = decoder().decode_method_call(&[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert!(err.is_unknown_selector());
    }

    #[test]
    fn calldata_shorter_than_selector() {
        let err = decoder().decode_method_call(&[0xa9, 0x05]).unwrap_err();
        assert!(matches!(err, DecodeError::DataTooShort { .. }));
    }

    #[test]
    fn constructor_args() {
        let mut data = vec![0u8; 32];
        data[31] = 7;
        let ctor = decoder().decode_constructor(&data).unwrap();
        assert_eq!(ctor.params[0].value, DecodedValue::Uint("7".into()));
        assert_eq!(Decoder::new().decode_constructor(&data), Err(DecodeError::NoConstructor));
    }

    #[test]
    fn unregister_removes_from_saved_list() {
        let mut d = decoder();
        assert_eq!(d.schemas().len(), 3);
        assert_eq!(d.selectors().len(), 2);
        let removed = d.unregister_json(ERC20_ABI).unwrap();
        assert_eq!(removed, 2);
        assert!(d.schemas().is_empty());
        assert!(d.selectors().is_empty());
    }

    #[test]
    fn register_json_rejects_non_list() {
        let mut d = Decoder::new();
        let err = d.register_json(r#""transfer""#).unwrap_err();
        assert!(matches!(err, RegistrationError::NotAList { .. }));
    }

    #[test]
    fn malformed_signature_topic_is_an_error() {
        let entry = LogEntry {
            address: "0xc2edad668740f1aa35e4d8f227fb8e17dca888cd".into(),
            topics: vec!["0xddf252ad".into()],
            data: vec![],
            block_number: 1,
            log_index: 0,
            transaction_hash: String::new(),
            removed: false,
        };
        let err = decoder().decode_log(&entry).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidHex { .. }));
        assert!(decoder().decode_logs(&[entry.clone()]).is_err());

        let untopiced = LogEntry {
            topics: vec![],
            ..entry
        };
        assert_eq!(decoder().decode_log(&untopiced), Ok(None));
    }
}
