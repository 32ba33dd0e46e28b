//! Selector / topic computation and the selector table.
//!
//! A function's selector is the first 4 bytes of `hash256(signature)`; an
//! event's topic is the full 32 bytes. `signature` is
//! `name(canonicalType(input0),canonicalType(input1),...)`, so keys depend only
//! on the name and ordered input types, never on parameter names or `indexed`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chainsync_core::{
    error::RegistrationError,
    hash::{Keccak256, SignatureHasher},
    schema::{EntryKind, SchemaEntry},
};
use tracing::{debug, warn};

/// Fixed-width table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Selector {
    Function([u8; 4]),
    Event([u8; 32]),
}

impl Selector {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Function(b) => b,
            Self::Event(b) => b,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.as_bytes()))
    }
}

pub fn compute_function_selector(entry: &SchemaEntry, hasher: &dyn SignatureHasher) -> [u8; 4] {
    let hash = hasher.hash256(entry.signature().as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn compute_event_topic(entry: &SchemaEntry, hasher: &dyn SignatureHasher) -> [u8; 32] {
    hasher.hash256(entry.signature().as_bytes())
}

/// Maps selectors and topics to the schema entries that produced them.
///
/// Registering a second entry under an existing key replaces the first
/// (last write wins). Unregistering only removes a key while it still maps to
/// an equal entry, so double-unregistration and stale removals are no-ops.
pub struct SelectorRegistry {
    hasher: Arc<dyn SignatureHasher>,
    table: HashMap<Selector, Arc<SchemaEntry>>,
}

impl SelectorRegistry {
    pub fn new(hasher: Arc<dyn SignatureHasher>) -> Self {
        Self {
            hasher,
            table: HashMap::new(),
        }
    }

    /// Table key for an entry, or `None` if the entry is not addressable
    /// (constructors, fallback/receive, errors, anonymous events).
    pub fn key_for(&self, entry: &SchemaEntry) -> Option<Selector> {
        if !entry.is_named() {
            return None;
        }
        match entry.kind {
            EntryKind::Function => Some(Selector::Function(compute_function_selector(
                entry,
                self.hasher.as_ref(),
            ))),
            EntryKind::Event if !entry.anonymous => Some(Selector::Event(compute_event_topic(
                entry,
                self.hasher.as_ref(),
            ))),
            _ => None,
        }
    }

    /// Insert a table entry per addressable schema item.
    ///
    /// All entries are validated before any is inserted. Returns the number of
    /// keys written.
    pub fn register(&mut self, entries: &[SchemaEntry]) -> Result<usize, RegistrationError> {
        for entry in entries {
            entry.validate()?;
        }

        let mut written = 0;
        for entry in entries {
            let Some(key) = self.key_for(entry) else {
                continue;
            };
            let new = Arc::new(entry.clone());
            if let Some(prev) = self.table.insert(key, new) {
                if *prev != *entry {
                    warn!(
                        %key,
                        replaced = %prev.label(),
                        by = %entry.label(),
                        "Selector collision, last registration wins"
                    );
                }
            }
            debug!(%key, entry = %entry.label(), "Registered selector");
            written += 1;
        }
        Ok(written)
    }

    /// Remove the keys of `entries` that still map to an equal entry.
    /// Returns the number of keys removed.
    pub fn unregister(&mut self, entries: &[SchemaEntry]) -> usize {
        let mut removed = 0;
        for entry in entries {
            let Some(key) = self.key_for(entry) else {
                continue;
            };
            if self.table.get(&key).is_some_and(|cur| **cur == *entry) {
                self.table.remove(&key);
                debug!(%key, entry = %entry.label(), "Unregistered selector");
                removed += 1;
            }
        }
        removed
    }

    pub fn get(&self, key: &Selector) -> Option<&Arc<SchemaEntry>> {
        self.table.get(key)
    }

    pub fn function(&self, selector: [u8; 4]) -> Option<&Arc<SchemaEntry>> {
        self.table.get(&Selector::Function(selector))
    }

    pub fn event(&self, topic: [u8; 32]) -> Option<&Arc<SchemaEntry>> {
        self.table.get(&Selector::Event(topic))
    }

    pub fn hasher(&self) -> &dyn SignatureHasher {
        self.hasher.as_ref()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// All keys with their entries, sorted by key.
    pub fn entries(&self) -> Vec<(Selector, Arc<SchemaEntry>)> {
        let mut all: Vec<_> = self
            .table
            .iter()
            .map(|(k, v)| (*k, Arc::clone(v)))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

impl Default for SelectorRegistry {
    fn default() -> Self {
        Self::new(Arc::new(Keccak256))
    }
}

impl fmt::Debug for SelectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorRegistry")
            .field("len", &self.table.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainsync_core::schema::ParamDescriptor;

    fn transfer_fn(to_name: &str) -> SchemaEntry {
        SchemaEntry::function(
            "transfer",
            vec![
                ParamDescriptor::new(to_name, "address"),
                ParamDescriptor::new("amount", "uint256"),
            ],
            vec![ParamDescriptor::new("", "bool")],
        )
    }

    fn transfer_event() -> SchemaEntry {
        SchemaEntry::event(
            "Transfer",
            vec![
                ParamDescriptor::new("from", "address").indexed(),
                ParamDescriptor::new("to", "address").indexed(),
                ParamDescriptor::new("value", "uint256"),
            ],
        )
    }

    #[test]
    fn transfer_selector() {
        let sel = compute_function_selector(&transfer_fn("to"), &Keccak256);
        assert_eq!(hex::encode(sel), "a9059cbb");
    }

    #[test]
    fn selector_ignores_param_names_and_indexed() {
        assert_eq!(
            compute_function_selector(&transfer_fn("to"), &Keccak256),
            compute_function_selector(&transfer_fn("recipient"), &Keccak256)
        );

        let mut plain = transfer_event();
        for p in &mut plain.inputs {
            p.indexed = false;
            p.name.push('_');
        }
        assert_eq!(
            compute_event_topic(&plain, &Keccak256),
            compute_event_topic(&transfer_event(), &Keccak256)
        );
    }

    #[test]
    fn register_skips_unaddressable_entries() {
        let mut reg = SelectorRegistry::default();
        let mut anon = transfer_event();
        anon.anonymous = true;
        let written = reg
            .register(&[
                transfer_fn("to"),
                transfer_event(),
                SchemaEntry::constructor(vec![]),
                anon,
            ])
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(reg.len(), 2);
        assert!(reg.function([0xa9, 0x05, 0x9c, 0xbb]).is_some());
    }

    #[test]
    fn last_registration_wins() {
        let mut reg = SelectorRegistry::default();
        reg.register(&[transfer_fn("to")]).unwrap();
        reg.register(&[transfer_fn("recipient")]).unwrap();
        assert_eq!(reg.len(), 1);
        let entry = reg.function([0xa9, 0x05, 0x9c, 0xbb]).unwrap();
        assert_eq!(entry.inputs[0].name, "recipient");
    }

    #[test]
    fn unregister_only_removes_matching_entry() {
        let mut reg = SelectorRegistry::default();
        reg.register(&[transfer_fn("to")]).unwrap();
        reg.register(&[transfer_fn("recipient")]).unwrap();

        // Stale entry no longer owns the key
        assert_eq!(reg.unregister(&[transfer_fn("to")]), 0);
        assert_eq!(reg.len(), 1);

        assert_eq!(reg.unregister(&[transfer_fn("recipient")]), 1);
        assert!(reg.is_empty());
        // Idempotent
        assert_eq!(reg.unregister(&[transfer_fn("recipient")]), 0);
    }

    #[test]
    fn invalid_entry_registers_nothing() {
        let mut reg = SelectorRegistry::default();
        let bad = SchemaEntry::function("f", vec![ParamDescriptor::new("x", "uint9")], vec![]);
        assert!(reg.register(&[transfer_fn("to"), bad]).is_err());
        assert!(reg.is_empty());
    }
}
