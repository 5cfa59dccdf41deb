//! Core traits for the mapfold aggregation engine
//!
//! This module defines the fundamental abstractions shared by the pipeline
//! stages: partitions of work and the bounds a partial state must satisfy to
//! travel through the shuffle.

use bincode::{Decode, Encode};
use std::fmt::Debug;

/// Partition represents a logical partition of work in a stage
pub trait Partition: Send + Sync + Debug {
    /// Get the partition index
    fn index(&self) -> usize;

    /// Get a unique identifier for this partition
    fn id(&self) -> String {
        format!("partition_{}", self.index())
    }
}

/// Basic partition implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicPartition {
    index: usize,
}

impl BasicPartition {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl Partition for BasicPartition {
    fn index(&self) -> usize {
        self.index
    }
}

/// A partial aggregation state that can be moved between stages.
///
/// States cross the shuffle in encoded form, so every state owned by one stage
/// instance reaches the next one as an independent copy.
pub trait StateData: Send + Sync + Clone + Debug + Encode + Decode<()> + 'static {}

impl<T> StateData for T where T: Send + Sync + Clone + Debug + Encode + Decode<()> + 'static {}
