//! Final reconciliation of one partition after the shuffle barrier.

use super::merge::fold_pairs;
use crate::record::{Group, Record};
use crate::shuffle::Aggregator;

/// Folds every partial state delivered to a partition and emits the records.
///
/// Groups are emitted in ascending order. Within a group the order of the
/// incoming states does not matter.
#[derive(Debug)]
pub struct FinalStage<'a, A: Aggregator> {
    aggregator: &'a A,
}

impl<'a, A: Aggregator> FinalStage<'a, A> {
    pub fn new(aggregator: &'a A) -> Self {
        Self { aggregator }
    }

    pub fn run<I>(&self, pairs: I) -> Vec<Record>
    where
        I: IntoIterator<Item = (Group, A::State)>,
    {
        fold_pairs(self.aggregator, pairs)
            .into_iter()
            .flat_map(|(group, state)| self.aggregator.emit(&group, state))
            .collect()
    }
}
