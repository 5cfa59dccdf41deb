//! Grouping keys and final output records.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The partition identity under which partial states are collected.
///
/// Word count and dedup use one `Key` group per distinct token or line. The
/// top-K job folds every number into the single `Global` group, which the
/// partitioner always routes to the same final partition.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub enum Group {
    Key(String),
    Global,
}

impl Group {
    pub fn key(key: impl Into<String>) -> Self {
        Group::Key(key.into())
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Key(key) => f.write_str(key),
            Group::Global => f.write_str("<global>"),
        }
    }
}

/// A final output record. Written once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Record {
    /// Word count output: `key\tcount`
    Count { key: String, count: u64 },
    /// Dedup output: the distinct line itself
    Distinct { key: String },
    /// Top-K output: one of the K largest numbers
    Number(i64),
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Count { key, count } => write!(f, "{key}\t{count}"),
            Record::Distinct { key } => f.write_str(key),
            Record::Number(n) => write!(f, "{n}"),
        }
    }
}
