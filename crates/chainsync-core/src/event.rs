//! Raw log entries and decoded events.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::types::{find_param, DecodedParam, DecodedValue};

/// A log entry as delivered by the RPC node. This is the input to log decoding
/// and to the synchronizer's transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Contract that emitted the log.
    pub address: String,
    /// `0x`-prefixed 32-byte hex values; topics[0] is the event signature hash.
    pub topics: Vec<String>,
    /// ABI-encoded non-indexed parameters.
    #[serde(with = "hex_bytes", default)]
    pub data: Vec<u8>,
    pub block_number: u64,
    pub log_index: u64,
    #[serde(default)]
    pub transaction_hash: String,
    /// Set by the node when the log was dropped by a reorg.
    #[serde(default)]
    pub removed: bool,
}

impl LogEntry {
    /// Position of this log on the chain; entries are totally ordered by it.
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }

    /// topics[0] as raw bytes; `None` for a log without topics.
    pub fn signature_topic(&self) -> Result<Option<[u8; 32]>, DecodeError> {
        self.topics.first().map(|t| parse_word(t)).transpose()
    }
}

/// Parse a `0x`-prefixed (or bare) 32-byte hex word.
pub fn parse_word(hex_str: &str) -> Result<[u8; 32], DecodeError> {
    let raw = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let mut out = [0u8; 32];
    hex::decode_to_slice(raw, &mut out).map_err(|e| DecodeError::InvalidHex {
        reason: format!("'{hex_str}': {e}"),
    })?;
    Ok(out)
}

/// Parse `0x`-prefixed (or bare) hex into bytes.
pub fn parse_hex(hex_str: &str) -> Result<Vec<u8>, DecodeError> {
    let raw = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(raw).map_err(|e| DecodeError::InvalidHex {
        reason: e.to_string(),
    })
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}

/// A log entry decoded against a registered event schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedEvent {
    /// Event name from the schema, e.g. `"Transfer"`.
    pub schema_name: String,
    /// Emitting contract, as given in the log entry.
    pub contract_address: String,
    /// Parameters in the schema's declared order, indexed and non-indexed merged.
    pub params: Vec<DecodedParam>,
}

impl DecodedEvent {
    pub fn param(&self, name: &str) -> Option<&DecodedValue> {
        find_param(&self.params, name)
    }
}
