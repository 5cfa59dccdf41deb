//! Line tokenizers
//!
//! A tokenizer turns one input line into zero or more emissions. Emissions are
//! produced lazily and consumed immediately by the shard's aggregator, so a
//! tokenizer never buffers more than the line it was handed.

use crate::record::Group;
use std::fmt::Debug;

/// A single `(group, value)` pair produced by a tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission<V> {
    pub group: Group,
    pub value: V,
}

impl<V> Emission<V> {
    pub fn new(group: Group, value: V) -> Self {
        Self { group, value }
    }
}

/// How emissions of a tokenizer are spread over groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// One group per distinct key; any number of final partitions.
    PerKey,
    /// Every emission lands in `Group::Global`; exactly one final partition.
    Global,
}

/// Splits a raw input line into emissions.
pub trait Tokenizer: Send + Sync + Debug {
    type Value: Send + 'static;

    /// Produce the emissions for one line.
    fn tokenize<'a>(&self, line: &'a str) -> impl Iterator<Item = Emission<Self::Value>>;

    /// The grouping every emission of this tokenizer follows.
    fn grouping(&self) -> Grouping;
}

/// Emits the trimmed line itself as the key. Blank lines emit nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeLineTokenizer;

impl Tokenizer for WholeLineTokenizer {
    type Value = ();

    fn tokenize<'a>(&self, line: &'a str) -> impl Iterator<Item = Emission<()>> {
        let trimmed = line.trim();
        (!trimmed.is_empty())
            .then(|| Emission::new(Group::key(trimmed), ()))
            .into_iter()
    }

    fn grouping(&self) -> Grouping {
        Grouping::PerKey
    }
}

/// Emits `(token, 1)` for every whitespace separated token.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    type Value = u64;

    fn tokenize<'a>(&self, line: &'a str) -> impl Iterator<Item = Emission<u64>> {
        line.split_whitespace()
            .map(|token| Emission::new(Group::key(token), 1))
    }

    fn grouping(&self) -> Grouping {
        Grouping::PerKey
    }
}

/// Emits every whitespace separated token that parses as an `i64` into the
/// global group. Tokens that are not integers are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberTokenizer;

impl Tokenizer for NumberTokenizer {
    type Value = i64;

    fn tokenize<'a>(&self, line: &'a str) -> impl Iterator<Item = Emission<i64>> {
        line.split_whitespace()
            .filter_map(|token| token.parse::<i64>().ok())
            .map(|number| Emission::new(Group::Global, number))
    }

    fn grouping(&self) -> Grouping {
        Grouping::Global
    }
}
