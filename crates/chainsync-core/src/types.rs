//! Structured parameter types and the decoded value model.
//!
//! `ParamType` is the resolved form of a declared type string; the codec walks
//! it to decide head/tail layout. `DecodedValue` is what consumers receive:
//! integers of every width are exact decimal text, addresses are lowercase
//! `0x`-prefixed 20-byte hex.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DecodeError;
use crate::schema::ParamDescriptor;

/// Size of one ABI slot.
pub const WORD: usize = 32;

/// A resolved contract-interface parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    Address,
    Bool,
    /// Unsigned integer, width in bits (8..=256).
    Uint(u16),
    /// Signed integer, width in bits (8..=256).
    Int(u16),
    /// `bytes1` .. `bytes32` (also `function`, which is 24 bytes).
    FixedBytes(u8),
    /// Variable-length `bytes`.
    Bytes,
    String,
    /// `T[]`
    Array(Box<ParamType>),
    /// `T[N]`
    FixedArray(Box<ParamType>, usize),
    /// Named components in declaration order.
    Tuple(Vec<(String, ParamType)>),
}

impl ParamType {
    /// Resolve a declared type string. `components` is consulted for `tuple` roots.
    pub fn parse(ty: &str, components: &[ParamDescriptor]) -> Result<Self, DecodeError> {
        let invalid = || DecodeError::InvalidType { ty: ty.to_string() };

        if let Some(body) = ty.strip_suffix(']') {
            let open = body.rfind('[').ok_or_else(invalid)?;
            let elem = Box::new(Self::parse(&body[..open], components)?);
            let size = &body[open + 1..];
            if size.is_empty() {
                return Ok(Self::Array(elem));
            }
            let len: usize = size.parse().map_err(|_| invalid())?;
            if len == 0 {
                return Err(invalid());
            }
            return Ok(Self::FixedArray(elem, len));
        }

        match ty {
            "address" => Ok(Self::Address),
            "bool" => Ok(Self::Bool),
            "string" => Ok(Self::String),
            "bytes" => Ok(Self::Bytes),
            "function" => Ok(Self::FixedBytes(24)),
            "tuple" => {
                let fields = components
                    .iter()
                    .map(|c| Ok((c.name.clone(), c.param_type()?)))
                    .collect::<Result<Vec<_>, DecodeError>>()?;
                Ok(Self::Tuple(fields))
            }
            _ => {
                if let Some(bits) = ty.strip_prefix("uint") {
                    parse_int_width(bits).map(Self::Uint).ok_or_else(invalid)
                } else if let Some(bits) = ty.strip_prefix("int") {
                    parse_int_width(bits).map(Self::Int).ok_or_else(invalid)
                } else if let Some(len) = ty.strip_prefix("bytes") {
                    match len.parse::<u8>() {
                        Ok(n) if (1..=32).contains(&n) => Ok(Self::FixedBytes(n)),
                        _ => Err(invalid()),
                    }
                } else {
                    Err(invalid())
                }
            }
        }
    }

    /// Dynamic types store an offset in their head slot and their content in the tail.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Bytes | Self::String | Self::Array(_) => true,
            Self::FixedArray(elem, _) => elem.is_dynamic(),
            Self::Tuple(fields) => fields.iter().any(|(_, t)| t.is_dynamic()),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head of its enclosing sequence.
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return WORD;
        }
        match self {
            Self::FixedArray(elem, len) => elem.head_size().saturating_mul(*len),
            Self::Tuple(fields) => fields.iter().map(|(_, t)| t.head_size()).sum(),
            _ => WORD,
        }
    }

    /// Value types can be recovered from a 32-byte topic; reference types are hashed.
    pub fn is_value_type(&self) -> bool {
        !matches!(
            self,
            Self::Bytes | Self::String | Self::Array(_) | Self::FixedArray(..) | Self::Tuple(_)
        )
    }
}

fn parse_int_width(bits: &str) -> Option<u16> {
    if bits.is_empty() {
        return Some(256);
    }
    match bits.parse::<u16>() {
        Ok(n) if n % 8 == 0 && (8..=256).contains(&n) => Some(n),
        _ => None,
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => write!(f, "address"),
            Self::Bool => write!(f, "bool"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::FixedBytes(n) => write!(f, "bytes{n}"),
            Self::Bytes => write!(f, "bytes"),
            Self::String => write!(f, "string"),
            Self::Array(elem) => write!(f, "{elem}[]"),
            Self::FixedArray(elem, len) => write!(f, "{elem}[{len}]"),
            Self::Tuple(fields) => {
                let parts: Vec<_> = fields.iter().map(|(_, t)| t.to_string()).collect();
                write!(f, "({})", parts.join(","))
            }
        }
    }
}

/// A decoded value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DecodedValue {
    /// Unsigned integer of any width, as exact decimal text.
    Uint(String),
    /// Signed integer of any width, as exact decimal text.
    Int(String),
    Bool(bool),
    /// Lowercase `0x` + 40 hex chars.
    Address(String),
    /// `bytesN`, or the topic hash of an indexed reference type; lowercase `0x` hex.
    FixedBytes(String),
    /// Variable-length `bytes`; lowercase `0x` hex.
    Bytes(String),
    Str(String),
    Array(Vec<DecodedValue>),
    Tuple(Vec<(String, DecodedValue)>),
}

impl DecodedValue {
    /// Decimal text of an integer value.
    pub fn as_integer(&self) -> Option<&str> {
        match self {
            Self::Uint(s) | Self::Int(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&str> {
        match self {
            Self::Address(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DecodedValue]> {
        match self {
            Self::Array(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Look up a tuple member by name.
    pub fn field(&self, name: &str) -> Option<&DecodedValue> {
        match self {
            Self::Tuple(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(v) | Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Address(v) | Self::FixedBytes(v) | Self::Bytes(v) | Self::Str(v) => {
                write!(f, "{v}")
            }
            Self::Array(v) => {
                let parts: Vec<_> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Self::Tuple(fields) => {
                let parts: Vec<_> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

/// One decoded parameter, in schema declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedParam {
    pub name: String,
    /// Declared type string, as in the schema.
    #[serde(rename = "type")]
    pub ty: String,
    pub value: DecodedValue,
}

/// Look up a decoded parameter by name.
pub fn find_param<'a>(params: &'a [DecodedParam], name: &str) -> Option<&'a DecodedValue> {
    params.iter().find(|p| p.name == name).map(|p| &p.value)
}
