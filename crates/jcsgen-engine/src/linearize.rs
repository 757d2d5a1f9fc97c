//! Linearization search.
//!
//! A linearization is a total order of every invocation in a scenario that
//! keeps each sequence's program order and runs a sequence only after every
//! sequence ordered before it has finished. The search is a depth-first
//! backtracking walk over per-sequence cursors. It keeps a single mutable
//! path and an explicit choice stack, so memory and stack depth stay linear
//! in the scenario length; an [`InvocationSequence`] is built only for each
//! completed path.

use jcsgen_ir::{Invocation, InvocationSequence, Schema};

use crate::harness::HarnessError;

/// Enumerate every linearization of `schema`, in deterministic order.
///
/// At each step sequences are tried in declaration order. The scenario must
/// already be validated (acyclic order, declared indices).
///
/// # Errors
/// [`HarnessError::TooManyLinearizations`] once more than `limit` would be produced.
pub fn linearizations(
    schema: &Schema,
    limit: usize,
) -> Result<Vec<InvocationSequence>, HarnessError> {
    let mut search = Search {
        bodies: schema
            .sequences
            .iter()
            .map(|s| s.invocations.as_slice())
            .collect(),
        preds: schema.predecessor_positions(),
        cursors: vec![0; schema.sequences.len()],
        path: Vec::with_capacity(schema.invocation_count()),
        choices: Vec::with_capacity(schema.invocation_count()),
    };
    search.run(limit)
}

struct Search<'a> {
    bodies: Vec<&'a [Invocation]>,
    preds: Vec<Vec<usize>>,
    cursors: Vec<usize>,
    /// Invocations of the current partial linearization.
    path: Vec<Invocation>,
    /// Sequence position advanced at each step of `path`.
    choices: Vec<usize>,
}

impl Search<'_> {
    fn finished(&self, pos: usize) -> bool {
        self.cursors[pos] == self.bodies[pos].len()
    }

    fn enabled(&self, pos: usize) -> bool {
        !self.finished(pos) && self.preds[pos].iter().all(|&p| self.finished(p))
    }

    fn next_enabled(&self, from: usize) -> Option<usize> {
        (from..self.bodies.len()).find(|&pos| self.enabled(pos))
    }

    fn advance(&mut self, pos: usize) {
        self.path.push(self.bodies[pos][self.cursors[pos]].clone());
        self.cursors[pos] += 1;
        self.choices.push(pos);
    }

    /// Undo the last step, returning the position it advanced.
    fn retreat(&mut self) -> Option<usize> {
        let pos = self.choices.pop()?;
        self.cursors[pos] -= 1;
        self.path.pop();
        Some(pos)
    }

    fn run(&mut self, limit: usize) -> Result<Vec<InvocationSequence>, HarnessError> {
        let mut found = Vec::new();
        // Position to resume from at the current node, and whether the node
        // is being entered for the first time.
        let mut from = 0;
        let mut fresh = true;
        loop {
            if let Some(pos) = self.next_enabled(from) {
                self.advance(pos);
                from = 0;
                fresh = true;
                continue;
            }
            if fresh {
                debug_assert!((0..self.bodies.len()).all(|p| self.finished(p)));
                if found.len() >= limit {
                    return Err(HarnessError::TooManyLinearizations { limit });
                }
                found.push(InvocationSequence::from(self.path.as_slice()));
            }
            match self.retreat() {
                Some(pos) => {
                    from = pos + 1;
                    fresh = false;
                }
                None => return Ok(found),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jcsgen_ir::proptest_generators::arb_schema;
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};
    use std::collections::HashSet;

    fn decode(value: Value) -> Schema {
        let Value::Object(map) = value else {
            panic!("expected object")
        };
        Schema::from_object(&map).expect("valid scenario")
    }

    fn rendered(schema: &Schema) -> Vec<String> {
        linearizations(schema, usize::MAX)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn binomial(n: usize, k: usize) -> usize {
        (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
    }

    #[test]
    fn empty_scenario_has_one_empty_linearization() {
        let schema = Schema::from_object(&Map::new()).unwrap();
        let all = linearizations(&schema, 10).unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_empty());
    }

    #[test]
    fn two_unordered_threads_interleave() {
        let schema = decode(json!({
            "sequences": [
                {"index": 0, "invocations": [{"method": "a"}, {"method": "b"}]},
                {"index": 1, "invocations": [{"method": "x"}]}
            ]
        }));
        assert_eq!(
            rendered(&schema),
            vec!["a(); b(); x()", "a(); x(); b()", "x(); a(); b()"]
        );
    }

    #[test]
    fn order_forces_sequence_completion_first() {
        let schema = decode(json!({
            "sequences": [
                {"index": 0, "invocations": [{"method": "a"}, {"method": "b"}]},
                {"index": 1, "invocations": [{"method": "x"}]}
            ],
            "order": [[1, 0]]
        }));
        assert_eq!(rendered(&schema), vec!["x(); a(); b()"]);
    }

    #[test]
    fn empty_predecessor_does_not_block() {
        let schema = decode(json!({
            "sequences": [
                {"index": 0, "invocations": []},
                {"index": 1, "invocations": [{"method": "x"}]}
            ],
            "order": [[0, 1]]
        }));
        assert_eq!(rendered(&schema), vec!["x()"]);
    }

    #[test]
    fn limit_is_enforced() {
        let schema = decode(json!({
            "sequences": [
                {"index": 0, "invocations": [{"method": "a"}, {"method": "b"}]},
                {"index": 1, "invocations": [{"method": "x"}, {"method": "y"}]}
            ]
        }));
        assert_eq!(linearizations(&schema, 6).unwrap().len(), 6);
        assert!(matches!(
            linearizations(&schema, 5),
            Err(HarnessError::TooManyLinearizations { limit: 5 })
        ));
    }

    #[test]
    fn long_single_sequence_has_one_linearization() {
        let invocations: Vec<Value> = (0..5000)
            .map(|i| json!({"method": "m", "arguments": [i]}))
            .collect();
        let schema = decode(json!({"sequences": [{"index": 0, "invocations": invocations}]}));
        let all = linearizations(&schema, 1).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].len(), 5000);
        assert_eq!(all[0].head().unwrap().arguments, vec![json!(0)]);
    }

    #[test]
    fn long_ordered_sequences_run_back_to_back() {
        let body = |name: &str| -> Vec<Value> {
            (0..3000).map(|_| json!({"method": name})).collect()
        };
        let schema = decode(json!({
            "sequences": [
                {"index": 0, "invocations": body("a")},
                {"index": 1, "invocations": body("b")}
            ],
            "order": [[1, 0]]
        }));
        let all = linearizations(&schema, 1).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].len(), 6000);
        assert_eq!(all[0].invocations()[2999].method, "b");
        assert_eq!(all[0].invocations()[3000].method, "a");
    }

    proptest! {
        #[test]
        fn linearizations_respect_program_and_sequence_order(schema in arb_schema()) {
            let all = linearizations(&schema, usize::MAX).unwrap();
            prop_assert!(!all.is_empty());

            let distinct: HashSet<Vec<(Option<usize>, String)>> = all
                .iter()
                .map(|lin| lin.iter().map(|i| (i.thread, i.to_string())).collect())
                .collect();
            prop_assert_eq!(distinct.len(), all.len());

            for lin in &all {
                prop_assert_eq!(lin.len(), schema.invocation_count());
                for sequence in &schema.sequences {
                    let projected: Vec<&Invocation> = lin
                        .iter()
                        .filter(|i| i.thread == Some(sequence.index))
                        .collect();
                    let expected: Vec<&Invocation> = sequence.invocations.iter().collect();
                    prop_assert_eq!(projected, expected);
                }
                for &(before, after) in &schema.order {
                    let last_before = lin.iter().rposition(|i| i.thread == Some(before));
                    let first_after = lin.iter().position(|i| i.thread == Some(after));
                    if let (Some(b), Some(a)) = (last_before, first_after) {
                        prop_assert!(b < a);
                    }
                }
            }
        }

        #[test]
        fn unordered_count_is_multinomial(schema in arb_schema()) {
            prop_assume!(schema.order.is_empty());
            let mut remaining = schema.invocation_count();
            let mut expected = 1;
            for sequence in &schema.sequences {
                let k = sequence.invocations.len();
                expected *= binomial(remaining, k);
                remaining -= k;
            }
            prop_assert_eq!(linearizations(&schema, usize::MAX).unwrap().len(), expected);
        }
    }
}
