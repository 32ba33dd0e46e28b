//! Converts single 32-byte ABI words into `DecodedValue`s.
//!
//! All integer widths go through `U256` / `I256` and are rendered as exact
//! decimal text, so nothing is ever squeezed through a machine-width number.

use alloy_primitives::{I256, U256};
use chainsync_core::types::{DecodedValue, ParamType};

/// Decode a value type held in one word (a head slot or a log topic).
///
/// Callers must only pass value types; anything else is rendered as raw bytes.
pub fn word_value(ty: &ParamType, word: &[u8; 32]) -> DecodedValue {
    match ty {
        ParamType::Uint(_) => DecodedValue::Uint(U256::from_be_bytes(*word).to_string()),
        // Narrow signed ints are sign-extended to 256 bits in the encoding.
        ParamType::Int(_) => {
            DecodedValue::Int(I256::from_raw(U256::from_be_bytes(*word)).to_string())
        }
        ParamType::Bool => DecodedValue::Bool(word.iter().any(|b| *b != 0)),
        ParamType::Address => address_from_word(word),
        ParamType::FixedBytes(n) => {
            DecodedValue::FixedBytes(format!("0x{}", hex::encode(&word[..*n as usize])))
        }
        _ => DecodedValue::FixedBytes(format!("0x{}", hex::encode(word))),
    }
}

/// Strip the 12 leading padding bytes and render lowercase hex.
pub fn address_from_word(word: &[u8; 32]) -> DecodedValue {
    DecodedValue::Address(format!("0x{}", hex::encode(&word[12..])))
}
