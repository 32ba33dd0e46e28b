//! # chainsync-core
//!
//! Shared model for ChainSync: contract schemas in the standard JSON interface
//! format, resolved parameter types and canonical signatures, the decoded value
//! model, raw log entries, and the signature hash abstraction. The codec and
//! the log synchronizer are both built on these types.

pub mod call;
pub mod error;
pub mod event;
pub mod hash;
pub mod schema;
pub mod types;

pub use call::{DecodedCall, DecodedConstructor};
pub use error::{DecodeError, RegistrationError};
pub use event::{DecodedEvent, LogEntry};
pub use hash::{Keccak256, SignatureHasher};
pub use schema::{EntryKind, ParamDescriptor, SchemaEntry};
pub use types::{DecodedParam, DecodedValue, ParamType, WORD};
