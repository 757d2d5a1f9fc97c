//! Typed view of a scenario document.
//!
//! A scenario names a set of invocation sequences (one per thread) and an
//! `order` relation between whole sequences. Keys this module does not know
//! about are ignored here and survive untouched in the original document.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::invocation::Invocation;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("scenario does not match the harness schema: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("sequence index {index} is declared more than once")]
    DuplicateSequence { index: usize },
    #[error("order pair [{before}, {after}] names undeclared sequence {missing}")]
    UnknownSequence {
        before: usize,
        after: usize,
        missing: usize,
    },
    #[error("order relation is cyclic (sequence {index} must run before itself)")]
    CyclicOrder { index: usize },
}

/// Target language of the native translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "c")]
    C,
    #[serde(rename = "cpp", alias = "c++", alias = "cxx")]
    Cpp,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }
}

/// The invocations issued by one thread, in program order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceSchema {
    pub index: usize,
    #[serde(default)]
    pub invocations: Vec<Invocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub sequences: Vec<SequenceSchema>,
    /// `[a, b]`: every invocation of sequence `a` precedes every invocation of `b`.
    #[serde(default)]
    pub order: Vec<(usize, usize)>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_parameters: Vec<Value>,
    /// Accepted outcomes, one value per invocation in flattened order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<Vec<Value>>,
}

impl Schema {
    /// Decode and validate a scenario object.
    ///
    /// Each decoded invocation is tagged with the index of its sequence.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, SchemaError> {
        let mut schema: Schema = serde_json::from_value(Value::Object(object.clone()))?;
        for sequence in &mut schema.sequences {
            for invocation in &mut sequence.invocations {
                invocation.thread = Some(sequence.index);
            }
        }
        schema.validate()?;
        Ok(schema)
    }

    /// Check sequence indices and the `order` relation.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = BTreeSet::new();
        for sequence in &self.sequences {
            if !seen.insert(sequence.index) {
                return Err(SchemaError::DuplicateSequence {
                    index: sequence.index,
                });
            }
        }
        for &(before, after) in &self.order {
            for endpoint in [before, after] {
                if !seen.contains(&endpoint) {
                    return Err(SchemaError::UnknownSequence {
                        before,
                        after,
                        missing: endpoint,
                    });
                }
            }
        }
        self.check_acyclic()
    }

    /// Kahn's algorithm over sequence positions.
    fn check_acyclic(&self) -> Result<(), SchemaError> {
        let n = self.sequences.len();
        let mut indegree = vec![0usize; n];
        let successors = self.successor_positions();
        for succs in &successors {
            for &s in succs {
                indegree[s] += 1;
            }
        }
        let mut ready: VecDeque<usize> = (0..n).filter(|&p| indegree[p] == 0).collect();
        let mut visited = 0;
        while let Some(p) = ready.pop_front() {
            visited += 1;
            for &s in &successors[p] {
                indegree[s] -= 1;
                if indegree[s] == 0 {
                    ready.push_back(s);
                }
            }
        }
        if visited == n {
            return Ok(());
        }
        let stuck = (0..n)
            .find(|&p| indegree[p] > 0)
            .map(|p| self.sequences[p].index)
            .unwrap_or_default();
        Err(SchemaError::CyclicOrder { index: stuck })
    }

    /// Position in `sequences` of the sequence with the given index.
    pub fn position_of(&self, index: usize) -> Option<usize> {
        self.sequences.iter().position(|s| s.index == index)
    }

    fn positions(&self) -> HashMap<usize, usize> {
        self.sequences
            .iter()
            .enumerate()
            .map(|(pos, s)| (s.index, pos))
            .collect()
    }

    /// For each sequence position, the positions that must complete before it starts.
    ///
    /// Pairs naming undeclared sequences are skipped; call [`Schema::validate`] first.
    pub fn predecessor_positions(&self) -> Vec<Vec<usize>> {
        let positions = self.positions();
        let mut preds = vec![Vec::new(); self.sequences.len()];
        for (before, after) in &self.order {
            if let (Some(&b), Some(&a)) = (positions.get(before), positions.get(after)) {
                if !preds[a].contains(&b) {
                    preds[a].push(b);
                }
            }
        }
        preds
    }

    /// For each sequence position, the positions ordered after it.
    pub fn successor_positions(&self) -> Vec<Vec<usize>> {
        let positions = self.positions();
        let mut succs = vec![Vec::new(); self.sequences.len()];
        for (before, after) in &self.order {
            if let (Some(&b), Some(&a)) = (positions.get(before), positions.get(after)) {
                if !succs[b].contains(&a) {
                    succs[b].push(a);
                }
            }
        }
        succs
    }

    /// The unique sequence with no predecessor, when the order singles one out.
    pub fn initial_sequence(&self) -> Option<usize> {
        if self.order.is_empty() {
            return None;
        }
        let minimals: Vec<usize> = self
            .sequences
            .iter()
            .map(|s| s.index)
            .filter(|&i| self.order.iter().all(|&(_, after)| after != i))
            .collect();
        unique(minimals)
    }

    /// The unique sequence with no successor, when the order singles one out.
    pub fn final_sequence(&self) -> Option<usize> {
        if self.order.is_empty() {
            return None;
        }
        let maximals: Vec<usize> = self
            .sequences
            .iter()
            .map(|s| s.index)
            .filter(|&i| self.order.iter().all(|&(before, _)| before != i))
            .collect();
        unique(maximals)
    }

    /// Total number of invocation slots across all sequences.
    pub fn invocation_count(&self) -> usize {
        self.sequences.iter().map(|s| s.invocations.len()).sum()
    }
}

fn unique(candidates: Vec<usize>) -> Option<usize> {
    match candidates.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn three_sequences(order: Value) -> Map<String, Value> {
        object(json!({
            "class": "java.util.concurrent.ConcurrentLinkedDeque",
            "sequences": [
                {"index": 0, "invocations": [{"method": "addFirst", "arguments": [0], "void": true}]},
                {"index": 1, "invocations": [{"method": "pollLast", "arguments": []}]},
                {"index": 2, "invocations": [{"method": "size", "arguments": []}]}
            ],
            "order": order
        }))
    }

    #[test]
    fn unrelated_keys_decode_to_empty_schema() {
        let schema = Schema::from_object(&object(json!({"threads": 2}))).unwrap();
        assert!(schema.sequences.is_empty());
        assert!(schema.order.is_empty());
        assert_eq!(schema.invocation_count(), 0);
    }

    #[test]
    fn invocations_are_tagged_with_their_thread() {
        let schema = Schema::from_object(&three_sequences(json!([]))).unwrap();
        assert_eq!(schema.sequences[2].invocations[0].thread, Some(2));
        assert!(schema.sequences[0].invocations[0].is_void);
    }

    #[test]
    fn duplicate_indices_are_rejected() {
        let doc = object(json!({"sequences": [{"index": 1}, {"index": 1}]}));
        assert!(matches!(
            Schema::from_object(&doc),
            Err(SchemaError::DuplicateSequence { index: 1 })
        ));
    }

    #[test]
    fn order_naming_unknown_sequence_is_rejected() {
        let err = Schema::from_object(&three_sequences(json!([[0, 5]]))).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnknownSequence {
                before: 0,
                after: 5,
                missing: 5
            }
        ));
    }

    #[test]
    fn cycles_and_self_loops_are_rejected() {
        assert!(matches!(
            Schema::from_object(&three_sequences(json!([[0, 1], [1, 0]]))),
            Err(SchemaError::CyclicOrder { .. })
        ));
        assert!(matches!(
            Schema::from_object(&three_sequences(json!([[2, 2]]))),
            Err(SchemaError::CyclicOrder { index: 2 })
        ));
    }

    #[test]
    fn malformed_invocation_is_a_decode_error() {
        let doc = object(json!({"sequences": [{"index": 0, "invocations": [{"arguments": []}]}]}));
        assert!(matches!(
            Schema::from_object(&doc),
            Err(SchemaError::Decode(_))
        ));
    }

    #[test]
    fn initial_and_final_sequences() {
        let fork = Schema::from_object(&three_sequences(json!([[0, 1], [0, 2]]))).unwrap();
        assert_eq!(fork.initial_sequence(), Some(0));
        assert_eq!(fork.final_sequence(), None);

        let join = Schema::from_object(&three_sequences(json!([[0, 2], [1, 2]]))).unwrap();
        assert_eq!(join.initial_sequence(), None);
        assert_eq!(join.final_sequence(), Some(2));

        let chain = Schema::from_object(&three_sequences(json!([[0, 1], [1, 2]]))).unwrap();
        assert_eq!(chain.initial_sequence(), Some(0));
        assert_eq!(chain.final_sequence(), Some(2));

        let unordered = Schema::from_object(&three_sequences(json!([]))).unwrap();
        assert_eq!(unordered.initial_sequence(), None);
        assert_eq!(unordered.final_sequence(), None);
    }

    #[test]
    fn predecessors_follow_order_pairs() {
        let schema = Schema::from_object(&three_sequences(json!([[0, 2], [1, 2]]))).unwrap();
        assert_eq!(schema.predecessor_positions(), vec![vec![], vec![], vec![0, 1]]);
        assert_eq!(schema.successor_positions(), vec![vec![2], vec![2], vec![]]);
    }

    #[test]
    fn language_accepts_aliases() {
        let doc = object(json!({"language": "c++"}));
        assert_eq!(Schema::from_object(&doc).unwrap().language, Some(Language::Cpp));
        assert_eq!(Language::default().as_str(), "c");
    }
}
