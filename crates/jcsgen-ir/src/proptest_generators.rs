//! Proptest strategies for invocations and well-formed scenarios.

use proptest::prelude::*;
use serde_json::json;

use crate::invocation::Invocation;
use crate::schema::{Schema, SequenceSchema};

/// A call with a short lowercase name and up to two small integer arguments.
pub fn arb_invocation() -> impl Strategy<Value = Invocation> {
    (
        "[a-z]{1,8}",
        proptest::collection::vec(0..4i64, 0..=2),
        any::<bool>(),
    )
        .prop_map(|(method, args, is_void)| {
            let inv = Invocation::new(method, args.into_iter().map(|a| json!(a)).collect());
            if is_void {
                inv.void()
            } else {
                inv
            }
        })
}

/// Up to `max_len` invocations.
pub fn arb_invocations(max_len: usize) -> impl Strategy<Value = Vec<Invocation>> {
    proptest::collection::vec(arb_invocation(), 0..=max_len)
}

/// A valid scenario: 1–3 sequences of 0–3 invocations each, with an order
/// drawn from pairs `(i, j)` where `i < j`, so it is always acyclic.
pub fn arb_schema() -> impl Strategy<Value = Schema> {
    (1..=3usize)
        .prop_flat_map(|n| {
            let pairs: Vec<(usize, usize)> = (0..n)
                .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
                .collect();
            let npairs = pairs.len();
            (
                proptest::collection::vec(proptest::collection::vec(arb_invocation(), 0..=3), n),
                Just(pairs),
                proptest::collection::vec(any::<bool>(), npairs),
            )
        })
        .prop_map(|(bodies, pairs, keep)| {
            let sequences = bodies
                .into_iter()
                .enumerate()
                .map(|(index, invocations)| SequenceSchema {
                    index,
                    invocations: invocations
                        .into_iter()
                        .map(|inv| inv.on_thread(index))
                        .collect(),
                })
                .collect();
            let order = pairs
                .into_iter()
                .zip(keep)
                .filter_map(|(pair, k)| k.then_some(pair))
                .collect();
            Schema {
                sequences,
                order,
                ..Schema::default()
            }
        })
}
