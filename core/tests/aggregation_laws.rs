//! Property tests for the aggregator contract
//!
//! Every aggregator must behave as a commutative monoid over its states:
//! states compare equal when they emit the same records.

use mapfold_core::shuffle::Aggregator;
use mapfold_core::{BoundedTopKAggregator, Group, PresenceAggregator, Record, SumAggregator};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::num::NonZeroUsize;

fn fold<A: Aggregator>(aggregator: &A, values: Vec<A::Value>) -> A::State {
    values
        .into_iter()
        .fold(aggregator.identity(), |state, value| aggregator.merge_value(state, value))
}

fn emitted<A: Aggregator>(aggregator: &A, state: A::State) -> Vec<Record> {
    aggregator.emit(&Group::key("k"), state)
}

fn check_monoid_laws<A: Aggregator>(
    aggregator: &A,
    a: Vec<A::Value>,
    b: Vec<A::Value>,
    c: Vec<A::Value>,
) -> Result<(), TestCaseError>
where
    A::Value: Clone,
{
    let sa = fold(aggregator, a.clone());
    let sb = fold(aggregator, b.clone());
    let sc = fold(aggregator, c.clone());

    // identity
    prop_assert_eq!(
        emitted(aggregator, aggregator.merge_state(aggregator.identity(), sa.clone())),
        emitted(aggregator, sa.clone())
    );
    prop_assert_eq!(
        emitted(aggregator, aggregator.merge_state(sa.clone(), aggregator.identity())),
        emitted(aggregator, sa.clone())
    );

    // commutativity
    prop_assert_eq!(
        emitted(aggregator, aggregator.merge_state(sa.clone(), sb.clone())),
        emitted(aggregator, aggregator.merge_state(sb.clone(), sa.clone()))
    );

    // associativity
    let left = aggregator.merge_state(aggregator.merge_state(sa.clone(), sb.clone()), sc.clone());
    let right = aggregator.merge_state(sa, aggregator.merge_state(sb, sc));
    prop_assert_eq!(emitted(aggregator, left.clone()), emitted(aggregator, right));

    // merging partial folds equals folding the whole stream
    let whole: Vec<A::Value> = a.into_iter().chain(b).chain(c).collect();
    prop_assert_eq!(emitted(aggregator, left), emitted(aggregator, fold(aggregator, whole)));
    Ok(())
}

proptest! {
    #[test]
    fn sum_aggregator_is_a_monoid(
        a in prop::collection::vec(1u64..5, 0..20),
        b in prop::collection::vec(1u64..5, 0..20),
        c in prop::collection::vec(1u64..5, 0..20),
    ) {
        check_monoid_laws(&SumAggregator::new(), a, b, c)?;
    }

    #[test]
    fn presence_aggregator_is_a_monoid(
        a in 0usize..4,
        b in 0usize..4,
        c in 0usize..4,
    ) {
        check_monoid_laws(&PresenceAggregator::new(), vec![(); a], vec![(); b], vec![(); c])?;
    }

    #[test]
    fn top_k_aggregator_is_a_monoid(
        k in 1usize..8,
        a in prop::collection::vec(-100i64..100, 0..20),
        b in prop::collection::vec(-100i64..100, 0..20),
        c in prop::collection::vec(any::<i64>(), 0..20),
    ) {
        let aggregator = BoundedTopKAggregator::new(NonZeroUsize::new(k).unwrap());
        check_monoid_laws(&aggregator, a, b, c)?;
    }

    #[test]
    fn top_k_state_never_exceeds_capacity(
        k in 1usize..8,
        values in prop::collection::vec(any::<i64>(), 0..50),
    ) {
        let aggregator = BoundedTopKAggregator::new(NonZeroUsize::new(k).unwrap());
        let state = fold(&aggregator, values.clone());
        prop_assert!(state.len() <= k);
        prop_assert_eq!(state.len(), values.len().min(k));
    }
}
