//! Error types for schema registration and the decode pipeline.

use thiserror::Error;

/// Errors that can occur while decoding call data, constructor arguments or a log entry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The blob ends before a slot, offset target or length-prefixed body it declares.
    #[error("data too short: need {needed} bytes at offset {offset}, only {available} available")]
    DataTooShort {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// An offset or length word does not fit the platform's address space.
    #[error("offset or length {value} at byte {at} is out of range")]
    OffsetOutOfRange { at: usize, value: String },

    /// No schema entry is registered under this selector or topic.
    #[error("unknown selector {selector}")]
    UnknownSelector { selector: String },

    #[error("unsupported parameter type '{ty}'")]
    InvalidType { ty: String },

    /// An indexed parameter has no matching topic in the log entry.
    #[error("indexed parameter #{index} has no topic")]
    MissingTopic { index: usize },

    #[error("invalid hex: {reason}")]
    InvalidHex { reason: String },

    #[error("no constructor registered")]
    NoConstructor,

    /// Nested offsets expand to more values than a blob of this size can hold.
    #[error("blob decodes to more than {limit} values")]
    TooManyValues { limit: usize },
}

impl DecodeError {
    pub fn short(offset: usize, needed: usize, available: usize) -> Self {
        Self::DataTooShort {
            offset,
            needed,
            available,
        }
    }

    /// Returns `true` if the error means "not found" rather than "malformed".
    pub fn is_unknown_selector(&self) -> bool {
        matches!(self, Self::UnknownSelector { .. })
    }
}

/// Errors from registering or unregistering schema entries.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The schema document is not a JSON array of entries.
    #[error("expected a list of schema entries, got {got}")]
    NotAList { got: String },

    #[error("invalid schema entry: {0}")]
    InvalidSchema(#[from] serde_json::Error),

    #[error("entry '{entry}' declares unsupported type '{ty}'")]
    InvalidType { entry: String, ty: String },
}
