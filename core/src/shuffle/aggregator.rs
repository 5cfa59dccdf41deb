//! Defines the Aggregator trait for combining values in shuffle operations.

use crate::record::{Group, Record};
use crate::traits::StateData;
use bincode::{Decode, Encode};
use std::fmt::Debug;

/// Aggregator trait for folding the values of one group into a partial state.
///
/// The runtime may call `merge_state` with any grouping of partial states and
/// any number of times, including zero, so implementations must guarantee:
///
/// - `merge_state` is associative and commutative (equality meaning the same
///   `emit` output),
/// - `identity` is a two-sided identity for `merge_state`,
/// - folding a value stream with `merge_value` directly gives the same state as
///   folding any split of that stream separately and merging the parts.
///
/// All methods are total. Bad input is dropped by the tokenizer before it
/// reaches an aggregator.
pub trait Aggregator: Send + Sync + Debug {
    /// Value carried by an emission
    type Value;
    /// Partial (combiner) state
    type State: StateData;

    /// The empty state.
    fn identity(&self) -> Self::State;

    /// Fold one emitted value into a state.
    fn merge_value(&self, state: Self::State, value: Self::Value) -> Self::State;

    /// Merge two partial states.
    fn merge_state(&self, a: Self::State, b: Self::State) -> Self::State;

    /// Produce the final records of a group.
    fn emit(&self, group: &Group, state: Self::State) -> Vec<Record>;
}

/// Occurrence count of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct Count(pub u64);

/// Counts occurrences per key (word count).
#[derive(Debug, Clone, Copy, Default)]
pub struct SumAggregator;

impl SumAggregator {
    pub fn new() -> Self {
        Self
    }
}

impl Aggregator for SumAggregator {
    type Value = u64;
    type State = Count;

    fn identity(&self) -> Count {
        Count(0)
    }

    fn merge_value(&self, state: Count, _value: u64) -> Count {
        Count(state.0.saturating_add(1))
    }

    fn merge_state(&self, a: Count, b: Count) -> Count {
        Count(a.0.saturating_add(b.0))
    }

    fn emit(&self, group: &Group, state: Count) -> Vec<Record> {
        vec![Record::Count {
            key: group.to_string(),
            count: state.0,
        }]
    }
}

/// Whether a key has been seen at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct Present(pub bool);

/// Records key presence and emits each distinct key once (dedup).
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceAggregator;

impl PresenceAggregator {
    pub fn new() -> Self {
        Self
    }
}

impl Aggregator for PresenceAggregator {
    type Value = ();
    type State = Present;

    fn identity(&self) -> Present {
        Present(false)
    }

    fn merge_value(&self, _state: Present, _value: ()) -> Present {
        Present(true)
    }

    fn merge_state(&self, a: Present, b: Present) -> Present {
        Present(a.0 || b.0)
    }

    fn emit(&self, group: &Group, state: Present) -> Vec<Record> {
        if state.0 {
            vec![Record::Distinct {
                key: group.to_string(),
            }]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold<A: Aggregator>(aggregator: &A, values: Vec<A::Value>) -> A::State {
        values
            .into_iter()
            .fold(aggregator.identity(), |state, v| aggregator.merge_value(state, v))
    }

    #[test]
    fn test_sum_aggregator() {
        let aggregator = SumAggregator::new();

        let state = fold(&aggregator, vec![1, 1, 1]);
        assert_eq!(state, Count(3));

        let merged = aggregator.merge_state(state, Count(2));
        assert_eq!(merged, Count(5));

        let records = aggregator.emit(&Group::key("a"), merged);
        assert_eq!(
            records,
            vec![Record::Count {
                key: "a".to_string(),
                count: 5
            }]
        );
    }

    #[test]
    fn test_sum_aggregator_identity() {
        let aggregator = SumAggregator::new();
        assert_eq!(aggregator.merge_state(Count(7), aggregator.identity()), Count(7));
        assert_eq!(aggregator.merge_state(aggregator.identity(), Count(7)), Count(7));
    }

    #[test]
    fn test_sum_aggregator_saturates() {
        let aggregator = SumAggregator::new();
        assert_eq!(
            aggregator.merge_state(Count(u64::MAX), Count(1)),
            Count(u64::MAX)
        );
        assert_eq!(aggregator.merge_value(Count(u64::MAX), 1), Count(u64::MAX));
    }

    #[test]
    fn test_presence_aggregator() {
        let aggregator = PresenceAggregator::new();

        let seen = fold(&aggregator, vec![(), (), ()]);
        assert_eq!(seen, Present(true));

        let records = aggregator.emit(&Group::key("line"), seen);
        assert_eq!(
            records,
            vec![Record::Distinct {
                key: "line".to_string()
            }]
        );
    }

    #[test]
    fn test_presence_aggregator_unseen_emits_nothing() {
        let aggregator = PresenceAggregator::new();
        let empty = fold(&aggregator, vec![]);
        assert_eq!(empty, Present(false));
        assert!(aggregator.emit(&Group::key("line"), empty).is_empty());
    }

    #[test]
    fn test_presence_aggregator_is_idempotent() {
        let aggregator = PresenceAggregator::new();
        let once = aggregator.merge_state(Present(true), Present(false));
        let twice = aggregator.merge_state(once, Present(true));
        assert_eq!(once, twice);
    }
}
