//! Decoded function calls and constructor invocations.

use serde::{Deserialize, Serialize};

use crate::types::{find_param, DecodedParam, DecodedValue};

/// Result of decoding call data against a registered function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedCall {
    /// Function name, e.g. `"transfer"`.
    pub schema_name: String,
    /// First 4 bytes of the call data.
    pub selector: [u8; 4],
    /// Inputs in declaration order.
    pub params: Vec<DecodedParam>,
}

impl DecodedCall {
    /// Selector as `0x`-prefixed hex.
    pub fn selector_hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector))
    }

    pub fn param(&self, name: &str) -> Option<&DecodedValue> {
        find_param(&self.params, name)
    }
}

/// Result of decoding constructor arguments (no selector prefix).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedConstructor {
    pub params: Vec<DecodedParam>,
}
