//! Shard processing: the local pre-aggregation stage.

use crate::record::Group;
use crate::shuffle::Aggregator;
use crate::tokenizer::Tokenizer;
use mapfold_common::error::Result;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Debug;

/// A source of input lines for one shard.
///
/// `lines` may be called more than once: a re-executed shard task reads its
/// input again from the start.
pub trait ShardInput: Send + Sync + Debug {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Open the shard and iterate over its lines.
    fn lines(&self) -> Result<Box<dyn Iterator<Item = Result<String>> + '_>>;
}

/// A shard held in memory.
#[derive(Debug, Clone)]
pub struct MemoryShard {
    name: String,
    lines: Vec<String>,
}

impl MemoryShard {
    pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            lines,
        }
    }

    /// Build a shard from newline separated text.
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, text.lines().map(str::to_string).collect())
    }
}

impl ShardInput for MemoryShard {
    fn name(&self) -> &str {
        &self.name
    }

    fn lines(&self) -> Result<Box<dyn Iterator<Item = Result<String>> + '_>> {
        Ok(Box::new(self.lines.iter().cloned().map(Ok)))
    }
}

/// What a shard contributes once it has been fully read.
#[derive(Debug, Clone)]
pub struct ShardOutput<S> {
    /// Exactly one partial state per group seen in the shard
    pub pairs: Vec<(Group, S)>,
    pub lines: u64,
    pub emissions: u64,
}

/// Drives one shard through a tokenizer into a local group-to-state map.
///
/// The processor owns its map for the lifetime of the shard and is consumed by
/// [`ShardProcessor::finish`].
#[derive(Debug)]
pub struct ShardProcessor<'a, T, A>
where
    T: Tokenizer,
    A: Aggregator<Value = T::Value>,
{
    tokenizer: &'a T,
    aggregator: &'a A,
    states: HashMap<Group, A::State>,
    lines: u64,
    emissions: u64,
}

impl<'a, T, A> ShardProcessor<'a, T, A>
where
    T: Tokenizer,
    A: Aggregator<Value = T::Value>,
{
    pub fn new(tokenizer: &'a T, aggregator: &'a A) -> Self {
        Self {
            tokenizer,
            aggregator,
            states: HashMap::new(),
            lines: 0,
            emissions: 0,
        }
    }

    pub fn process_line(&mut self, line: &str) {
        self.lines += 1;
        for emission in self.tokenizer.tokenize(line) {
            self.emissions += 1;
            match self.states.entry(emission.group) {
                Entry::Occupied(mut slot) => {
                    let current = std::mem::replace(slot.get_mut(), self.aggregator.identity());
                    *slot.get_mut() = self.aggregator.merge_value(current, emission.value);
                }
                Entry::Vacant(slot) => {
                    let identity = self.aggregator.identity();
                    slot.insert(self.aggregator.merge_value(identity, emission.value));
                }
            }
        }
    }

    pub fn finish(self) -> ShardOutput<A::State> {
        ShardOutput {
            pairs: self.states.into_iter().collect(),
            lines: self.lines,
            emissions: self.emissions,
        }
    }
}

/// Read a whole shard and return its partial states.
pub fn process_shard<T, A>(
    tokenizer: &T,
    aggregator: &A,
    shard: &dyn ShardInput,
) -> Result<ShardOutput<A::State>>
where
    T: Tokenizer,
    A: Aggregator<Value = T::Value>,
{
    let mut processor = ShardProcessor::new(tokenizer, aggregator);
    for line in shard.lines()? {
        processor.process_line(&line?);
    }
    Ok(processor.finish())
}
