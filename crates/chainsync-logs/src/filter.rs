//! Address + topic filters and the checkpoint key derived from them.

use std::fmt;

use chainsync_core::LogEntry;
use serde::{Deserialize, Serialize};

/// One topic position: wildcard or an exact 32-byte value.
///
/// Serialized as `null` / `"0x…"`, the shape node RPC filters use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum TopicFilter {
    Any,
    Exact(String),
}

impl TopicFilter {
    pub fn exact(topic: impl Into<String>) -> Self {
        Self::Exact(topic.into().to_lowercase())
    }

    pub fn matches(&self, topic: Option<&String>) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(want) => topic.is_some_and(|t| t.eq_ignore_ascii_case(want)),
        }
    }
}

impl From<Option<String>> for TopicFilter {
    fn from(v: Option<String>) -> Self {
        v.map_or(Self::Any, Self::exact)
    }
}

impl From<TopicFilter> for Option<String> {
    fn from(f: TopicFilter) -> Self {
        match f {
            TopicFilter::Any => None,
            TopicFilter::Exact(t) => Some(t),
        }
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "null"),
            Self::Exact(t) => write!(f, "\"{t}\""),
        }
    }
}

/// Which logs a synchronizer follows: one contract address and an ordered
/// list of topic positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<TopicFilter>,
}

impl LogFilter {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            topics: Vec::new(),
        }
    }

    /// Append an exact topic position.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topics.push(TopicFilter::exact(topic));
        self
    }

    /// Append a wildcard topic position.
    pub fn any_topic(mut self) -> Self {
        self.topics.push(TopicFilter::Any);
        self
    }

    /// Whether `entry` satisfies this filter.
    pub fn matches(&self, entry: &LogEntry) -> bool {
        entry.address.eq_ignore_ascii_case(&self.address)
            && self
                .topics
                .iter()
                .enumerate()
                .all(|(i, f)| f.matches(entry.topics.get(i)))
    }

    /// Persistence key for `(address, topics, schema version)`.
    ///
    /// Format: `<address>[<topic>,…]<version>`, topics rendered as JSON
    /// (`null` for wildcards). Changing the schema version starts a fresh
    /// checkpoint.
    pub fn checkpoint_key(&self, schema_version: &str) -> String {
        let topics: Vec<String> = self.topics.iter().map(ToString::to_string).collect();
        format!(
            "{}[{}]{}",
            self.address.to_lowercase(),
            topics.join(","),
            schema_version
        )
    }
}
