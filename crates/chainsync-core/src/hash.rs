//! 256-bit signature hashing.
//!
//! Selectors and event topics are derived from `hash256(signature)`. The hash is
//! supplied by the node-facing collaborator; `Keccak256` is the standard one.

use tiny_keccak::{Hasher, Keccak};

/// Hash function used to derive selectors and topics from canonical signatures.
pub trait SignatureHasher: Send + Sync {
    fn hash256(&self, data: &[u8]) -> [u8; 32];
}

/// Ethereum keccak-256.
#[derive(Debug, Default, Clone, Copy)]
pub struct Keccak256;

impl SignatureHasher for Keccak256 {
    fn hash256(&self, data: &[u8]) -> [u8; 32] {
        keccak256(data)
    }
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}
