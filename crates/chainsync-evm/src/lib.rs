//! # chainsync-evm
//!
//! EVM contract-interface decoding for ChainSync.
//!
//! ## Implementation notes
//! - `codec` implements head/tail ABI decoding directly over byte slices, with
//!   bounds checks on every offset and length
//! - `selector` derives 4-byte selectors / 32-byte topics from canonical signatures
//! - `decoder` combines both: calldata → `DecodedCall`, logs → `DecodedEvent`
//! - Topics[1..] → indexed parameters; `data` → non-indexed parameters

pub mod codec;
pub mod decoder;
pub mod normalizer;
pub mod selector;

pub use decoder::Decoder;
pub use selector::{compute_event_topic, compute_function_selector, Selector, SelectorRegistry};
