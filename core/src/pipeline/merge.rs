//! Merge passes over partial states of one group partition.

use crate::record::Group;
use crate::shuffle::Aggregator;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Fold `(group, state)` pairs with `merge_state`, one state per group,
/// ordered by group.
pub(crate) fn fold_pairs<A, I>(aggregator: &A, pairs: I) -> BTreeMap<Group, A::State>
where
    A: Aggregator,
    I: IntoIterator<Item = (Group, A::State)>,
{
    let mut folded: BTreeMap<Group, A::State> = BTreeMap::new();
    for (group, state) in pairs {
        match folded.entry(group) {
            Entry::Vacant(slot) => {
                slot.insert(state);
            }
            Entry::Occupied(mut slot) => {
                let current = std::mem::replace(slot.get_mut(), aggregator.identity());
                *slot.get_mut() = aggregator.merge_state(current, state);
            }
        }
    }
    folded
}

/// Combines several runs of partial states into one.
///
/// Runs may come from any shards or earlier passes and arrive in any order;
/// the result holds one state per group. A stage may be applied any number of
/// times, including never.
#[derive(Debug)]
pub struct MergeStage<'a, A: Aggregator> {
    aggregator: &'a A,
}

impl<'a, A: Aggregator> MergeStage<'a, A> {
    pub fn new(aggregator: &'a A) -> Self {
        Self { aggregator }
    }

    /// Merge borrowed runs. The runs are left untouched so that the same
    /// input can be merged again.
    pub fn merge(&self, runs: &[Vec<(Group, A::State)>]) -> Vec<(Group, A::State)> {
        let pairs = runs.iter().flat_map(|run| run.iter().cloned());
        fold_pairs(self.aggregator, pairs).into_iter().collect()
    }
}
