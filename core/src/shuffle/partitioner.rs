//! Defines partitioners for distributing groups in a shuffle.

use crate::record::Group;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

/// Assigns each key to one of `num_partitions` final partitions.
pub trait Partitioner<K>: Send + Sync + Debug {
    fn num_partitions(&self) -> usize;

    /// Partition index in `0..num_partitions()`.
    fn get_partition(&self, key: &K) -> usize;
}

/// A partitioner that uses the hash of the group key to distribute data.
///
/// `Group::Global` always maps to partition 0, so every partial state of a
/// global aggregation meets in a single final stage regardless of how many
/// partitions exist.
#[derive(Clone, Debug)]
pub struct HashPartitioner {
    num_partitions: NonZeroUsize,
}

impl HashPartitioner {
    pub fn new(num_partitions: NonZeroUsize) -> Self {
        Self { num_partitions }
    }
}

impl Partitioner<Group> for HashPartitioner {
    fn num_partitions(&self) -> usize {
        self.num_partitions.get()
    }

    fn get_partition(&self, key: &Group) -> usize {
        match key {
            Group::Global => 0,
            Group::Key(text) => {
                let mut s = DefaultHasher::new();
                text.hash(&mut s);
                (s.finish() % self.num_partitions.get() as u64) as usize
            }
        }
    }
}
