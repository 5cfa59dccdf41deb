//! Bounded top-K aggregation.
//!
//! [`TopKSet`] keeps the K largest numbers seen so far in a min-heap (via
//! `BinaryHeap<Reverse<i64>>`), so the smallest retained value is always at the
//! top and a new value is either rejected in O(1) or swapped in for it in
//! O(log K). Memory is bounded by K no matter how many values are folded in.
//!
//! "Keep the K largest, drop the rest" only depends on which values were seen,
//! not on the order they arrived in, which is what makes the merge associative
//! and commutative under any sharding and any number of merge passes.

use crate::record::{Group, Record};
use crate::shuffle::Aggregator;
use bincode::de::Decoder;
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::num::NonZeroUsize;

/// A multiset of at most `capacity` of the largest values pushed into it.
///
/// Duplicates are retained: top-K is computed over the raw value stream, not
/// over distinct values.
#[derive(Debug, Clone)]
pub struct TopKSet {
    capacity: NonZeroUsize,
    heap: BinaryHeap<Reverse<i64>>,
}

impl TopKSet {
    /// Create an empty set that retains up to `capacity` values.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::new(),
        }
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The smallest retained value.
    pub fn min(&self) -> Option<i64> {
        self.heap.peek().map(|Reverse(v)| *v)
    }

    /// Offer a value. Returns `true` if it was retained.
    pub fn push(&mut self, value: i64) -> bool {
        if self.heap.len() < self.capacity.get() {
            self.heap.push(Reverse(value));
            return true;
        }
        match self.heap.peek() {
            Some(Reverse(min)) if value > *min => {
                self.heap.pop();
                self.heap.push(Reverse(value));
                true
            }
            _ => false,
        }
    }

    /// Fold every value of `other` into the larger of the two sets.
    ///
    /// Cost is O(min(|a|, |b|) log K); the two sets are never sorted.
    pub fn merge(self, other: TopKSet) -> TopKSet {
        let (mut base, smaller) = if self.heap.len() >= other.heap.len() {
            (self, other)
        } else {
            (other, self)
        };
        for Reverse(value) in smaller.heap {
            base.push(value);
        }
        base
    }

    /// The retained values in heap order (unsorted).
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.heap.iter().map(|Reverse(v)| *v)
    }

    /// The retained values, largest first.
    pub fn into_sorted_desc(self) -> Vec<i64> {
        // Sorting `Reverse<i64>` ascending orders the inner values descending.
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(v)| v)
            .collect()
    }
}

// The shuffle form of a set is its capacity followed by the raw, unsorted heap
// contents. Downstream stages rebuild the heap; only the final stage sorts.
impl Encode for TopKSet {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&(self.capacity.get() as u64), encoder)?;
        let values: Vec<i64> = self.iter().collect();
        Encode::encode(&values, encoder)
    }
}

impl<Context> Decode<Context> for TopKSet {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let capacity = u64::decode(decoder)?;
        let values = Vec::<i64>::decode(decoder)?;

        let capacity = usize::try_from(capacity)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| DecodeError::OtherString(format!("invalid top-k capacity {capacity}")))?;
        if values.len() > capacity.get() {
            return Err(DecodeError::OtherString(format!(
                "top-k set holds {} values, capacity is {}",
                values.len(),
                capacity
            )));
        }

        Ok(Self {
            capacity,
            heap: values.into_iter().map(Reverse).collect(),
        })
    }
}

bincode::impl_borrow_decode!(TopKSet);

/// Maintains the K largest numbers of the global group (top-K job).
#[derive(Debug, Clone, Copy)]
pub struct BoundedTopKAggregator {
    capacity: NonZeroUsize,
}

impl BoundedTopKAggregator {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }
}

impl Aggregator for BoundedTopKAggregator {
    type Value = i64;
    type State = TopKSet;

    fn identity(&self) -> TopKSet {
        TopKSet::new(self.capacity)
    }

    fn merge_value(&self, mut state: TopKSet, value: i64) -> TopKSet {
        state.push(value);
        state
    }

    fn merge_state(&self, a: TopKSet, b: TopKSet) -> TopKSet {
        a.merge(b)
    }

    /// One record per retained number, strictly largest first.
    fn emit(&self, _group: &Group, state: TopKSet) -> Vec<Record> {
        state
            .into_sorted_desc()
            .into_iter()
            .map(Record::Number)
            .collect()
    }
}
