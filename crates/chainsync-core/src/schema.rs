//! Contract schema model: the standard JSON contract-interface description.
//!
//! Entries deserialize bit-compatibly from the `[{ "type": ..., "name": ...,
//! "inputs": [...], "outputs": [...] }]` documents produced by Solidity and
//! Vyper toolchains, so externally authored schemas load unchanged.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, RegistrationError};
use crate::types::ParamType;

fn is_false(b: &bool) -> bool {
    !*b
}

/// Definition of a single input or output parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    /// Parameter name; may be empty for unnamed parameters.
    #[serde(default)]
    pub name: String,
    /// Declared type string, e.g. `"uint256"`, `"address[]"`, `"tuple[2]"`.
    #[serde(rename = "type")]
    pub ty: String,
    /// Events only: is this parameter carried in a topic?
    #[serde(default, skip_serializing_if = "is_false")]
    pub indexed: bool,
    /// Members of a `tuple` type, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ParamDescriptor>,
    /// Compiler-level type name (`"struct Pool.Info"`); informational only.
    #[serde(
        rename = "internalType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_type: Option<String>,
}

impl ParamDescriptor {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            indexed: false,
            components: Vec::new(),
            internal_type: None,
        }
    }

    /// Builder-style: mark this parameter as indexed.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Builder-style: attach tuple components.
    pub fn with_components(mut self, components: Vec<ParamDescriptor>) -> Self {
        self.components = components;
        self
    }

    /// Canonical type string used for signature hashing.
    ///
    /// Primitive types render as declared. `tuple` renders as the parenthesised,
    /// comma-joined canonical types of its components (names dropped), keeping any
    /// array suffix: `tuple[2]` with `(uint256 a, address b)` → `(uint256,address)[2]`.
    pub fn canonical_type(&self) -> String {
        match self.ty.strip_prefix("tuple") {
            Some(suffix) => {
                let inner: Vec<String> =
                    self.components.iter().map(|c| c.canonical_type()).collect();
                format!("({}){}", inner.join(","), suffix)
            }
            None => self.ty.clone(),
        }
    }

    /// Resolve the declared type string into a structured `ParamType`.
    pub fn param_type(&self) -> Result<ParamType, DecodeError> {
        ParamType::parse(&self.ty, &self.components)
    }
}

/// Kind of a schema entry (the JSON `"type"` field).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Absent `"type"` means function per the interface format.
    #[default]
    Function,
    Event,
    Constructor,
    Fallback,
    Receive,
    Error,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Function => "function",
            Self::Event => "event",
            Self::Constructor => "constructor",
            Self::Fallback => "fallback",
            Self::Receive => "receive",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One entry of a contract schema. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
    /// Function / event name; empty for constructors, fallback and receive.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<ParamDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<ParamDescriptor>,
    /// Events only: an anonymous event has no signature topic.
    #[serde(default, skip_serializing_if = "is_false")]
    pub anonymous: bool,
    #[serde(
        rename = "stateMutability",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub state_mutability: Option<String>,
}

impl SchemaEntry {
    fn with_kind(kind: EntryKind, name: impl Into<String>, inputs: Vec<ParamDescriptor>) -> Self {
        Self {
            kind,
            name: name.into(),
            inputs,
            outputs: Vec::new(),
            anonymous: false,
            state_mutability: None,
        }
    }

    pub fn function(
        name: impl Into<String>,
        inputs: Vec<ParamDescriptor>,
        outputs: Vec<ParamDescriptor>,
    ) -> Self {
        let mut entry = Self::with_kind(EntryKind::Function, name, inputs);
        entry.outputs = outputs;
        entry
    }

    pub fn event(name: impl Into<String>, inputs: Vec<ParamDescriptor>) -> Self {
        Self::with_kind(EntryKind::Event, name, inputs)
    }

    pub fn constructor(inputs: Vec<ParamDescriptor>) -> Self {
        Self::with_kind(EntryKind::Constructor, "", inputs)
    }

    /// `name(type1,type2,...)`, depends only on the name and ordered input types.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.canonical_type()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }

    /// Inputs carried in topics[1..], in declaration order.
    pub fn indexed_inputs(&self) -> impl Iterator<Item = &ParamDescriptor> {
        self.inputs.iter().filter(|p| p.indexed)
    }

    /// Inputs carried in the data blob, in declaration order.
    pub fn data_inputs(&self) -> impl Iterator<Item = &ParamDescriptor> {
        self.inputs.iter().filter(|p| !p.indexed)
    }

    /// Resolve every input and output type, reporting the first one that does not parse.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        for param in self.inputs.iter().chain(self.outputs.iter()) {
            param.param_type().map_err(|_| RegistrationError::InvalidType {
                entry: self.label(),
                ty: param.ty.clone(),
            })?;
        }
        Ok(())
    }

    /// Human-readable label for logs and errors.
    pub fn label(&self) -> String {
        if self.is_named() {
            format!("{} {}", self.kind, self.signature())
        } else {
            self.kind.to_string()
        }
    }

    /// Parse a JSON schema document. The top-level value must be an array.
    pub fn list_from_json(json: &str) -> Result<Vec<SchemaEntry>, RegistrationError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::list_from_value(value)
    }

    pub fn list_from_value(value: serde_json::Value) -> Result<Vec<SchemaEntry>, RegistrationError> {
        if !value.is_array() {
            let got = match &value {
                serde_json::Value::Null => "null",
                serde_json::Value::Bool(_) => "bool",
                serde_json::Value::Number(_) => "number",
                serde_json::Value::String(_) => "string",
                serde_json::Value::Object(_) => "object",
                serde_json::Value::Array(_) => "array",
            };
            return Err(RegistrationError::NotAList { got: got.into() });
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIR_ABI: &str = r#"[
        {"type":"constructor","inputs":[{"name":"factory","type":"address","internalType":"address"}]},
        {"type":"event","name":"Swap","anonymous":false,"inputs":[
            {"indexed":true,"name":"sender","type":"address"},
            {"indexed":false,"name":"amount0In","type":"uint256"},
            {"indexed":false,"name":"amount1In","type":"uint256"},
            {"indexed":true,"name":"to","type":"address"}
        ]},
        {"type":"function","name":"getReserves","inputs":[],"outputs":[
            {"name":"_reserve0","type":"uint112"},{"name":"_reserve1","type":"uint112"}
        ],"stateMutability":"view"},
        {"name":"deposit","inputs":[{"name":"pid","type":"uint256"}],"outputs":[]},
        {"type":"receive","stateMutability":"payable"}
    ]"#;

    #[test]
    fn parses_standard_interface_document() {
        let entries = SchemaEntry::list_from_json(PAIR_ABI).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].kind, EntryKind::Constructor);
        assert_eq!(entries[1].kind, EntryKind::Event);
        assert_eq!(entries[1].indexed_inputs().count(), 2);
        assert_eq!(entries[1].data_inputs().count(), 2);
        assert_eq!(entries[2].outputs.len(), 2);
        // Missing "type" defaults to function
        assert_eq!(entries[3].kind, EntryKind::Function);
        assert_eq!(entries[4].kind, EntryKind::Receive);
        assert!(!entries[4].is_named());
    }

    #[test]
    fn non_array_document_is_rejected() {
        let err = SchemaEntry::list_from_json(r#"{"type":"function","name":"x"}"#).unwrap_err();
        assert!(matches!(err, RegistrationError::NotAList { ref got } if got == "object"));
    }

    #[test]
    fn canonical_tuple_signature_drops_names() {
        let order = ParamDescriptor::new("order", "tuple").with_components(vec![
            ParamDescriptor::new("maker", "address"),
            ParamDescriptor::new("amounts", "uint256[]"),
            ParamDescriptor::new("legs", "tuple[2]").with_components(vec![
                ParamDescriptor::new("a", "bool"),
                ParamDescriptor::new("b", "bytes32"),
            ]),
        ]);
        let entry = SchemaEntry::function(
            "fill",
            vec![order, ParamDescriptor::new("deadline", "uint64")],
            vec![],
        );
        assert_eq!(
            entry.signature(),
            "fill((address,uint256[],(bool,bytes32)[2]),uint64)"
        );
    }

    #[test]
    fn validate_reports_bad_type() {
        let entry = SchemaEntry::function("f", vec![ParamDescriptor::new("x", "uint7")], vec![]);
        let err = entry.validate().unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidType { ref ty, .. } if ty == "uint7"));
    }
}
