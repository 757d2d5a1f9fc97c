//! Scenario enumeration.
//!
//! Expands a class specification into every small scenario that exercises a
//! chosen method: each sequence count and order shape, each placement of
//! invocation slots, each assignment of methods to slots and each assignment
//! of argument values. The result is the document stream that
//! [`crate::pipeline::run_pipeline`] consumes.

use std::io::{self, Write};

use jcsgen_ir::{Invocation, Schema, SequenceSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::pipeline::write_document;

/// The only parameter type scenarios can be generated for.
pub const INT_TYPE: &str = "int";
pub const DEFAULT_SEQUENCES: usize = 2;
pub const DEFAULT_INVOCATIONS: usize = 2;
pub const DEFAULT_VALUES: usize = 2;

#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("class specification is malformed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("method '{method}' is not declared by the class specification")]
    UnknownMethod { method: String },
    #[error("cannot enumerate scenarios with {count} sequences (expected 2 or 3)")]
    UnsupportedSequenceCount { count: usize },
    #[error("method '{method}' takes a parameter of unsupported type '{ty}'")]
    UnsupportedType { method: String, ty: String },
    #[error("cannot serialize scenario {id}: {source}")]
    Serialize {
        id: u64,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error writing scenarios: {0}")]
    Io(#[from] io::Error),
}

/// A method of the class under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Trusted methods may fill the slots around the method under test.
    #[serde(default)]
    pub trusted: bool,
    #[serde(default, rename = "void")]
    pub is_void: bool,
}

/// A class under test and its methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSpec {
    pub class: String,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
}

impl ClassSpec {
    pub fn from_json(text: &str) -> Result<Self, EnumerationError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }

    fn trusted(&self) -> Vec<&MethodSpec> {
        self.methods.iter().filter(|m| m.trusted).collect()
    }
}

#[derive(Debug, Clone)]
pub struct EnumerationOptions {
    /// Method placed in every scenario.
    pub method: String,
    pub sequences: usize,
    /// Total invocations per scenario; fewer than `sequences` yields nothing.
    pub invocations: usize,
    /// Number of distinct `int` argument values, `0..values`.
    pub values: usize,
}

impl EnumerationOptions {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            sequences: DEFAULT_SEQUENCES,
            invocations: DEFAULT_INVOCATIONS,
            values: DEFAULT_VALUES,
        }
    }
}

/// Order shapes for a scenario with `count` sequences.
fn order_shapes(count: usize) -> Result<Vec<Vec<(usize, usize)>>, EnumerationError> {
    match count {
        2 => Ok(vec![vec![]]),
        3 => Ok(vec![
            vec![],
            vec![(0, 1), (0, 2)],
            vec![(0, 2), (1, 2)],
            vec![(0, 1), (1, 2)],
        ]),
        _ => Err(EnumerationError::UnsupportedSequenceCount { count }),
    }
}

/// Slot counts per sequence: one each, plus `extra` more spread over the
/// sequences. Placements are non-decreasing choices of sequence, so every
/// distinct shape appears exactly once.
fn slot_shapes(sequences: usize, extra: usize) -> Vec<Vec<usize>> {
    fn place(from: usize, left: usize, counts: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if left == 0 {
            out.push(counts.clone());
            return;
        }
        for seq in from..counts.len() {
            counts[seq] += 1;
            place(seq, left - 1, counts, out);
            counts[seq] -= 1;
        }
    }

    let mut out = Vec::new();
    place(0, extra, &mut vec![1; sequences], &mut out);
    out
}

/// Every way to pick one element from each list, leftmost varying slowest.
fn cartesian<T: Clone>(choices: &[Vec<T>]) -> Vec<Vec<T>> {
    choices.iter().fold(vec![Vec::new()], |partial, options| {
        partial
            .iter()
            .flat_map(|prefix| {
                options.iter().map(move |choice| {
                    let mut next = prefix.clone();
                    next.push(choice.clone());
                    next
                })
            })
            .collect()
    })
}

fn values_of(method: &MethodSpec, ty: &str, values: usize) -> Result<Vec<Value>, EnumerationError> {
    match ty {
        INT_TYPE => Ok((0..values).map(Value::from).collect()),
        other => Err(EnumerationError::UnsupportedType {
            method: method.name.clone(),
            ty: other.into(),
        }),
    }
}

/// Enumerate every scenario for `spec` under `options`, numbered from 0.
pub fn enumerate(
    spec: &ClassSpec,
    options: &EnumerationOptions,
) -> Result<Vec<Schema>, EnumerationError> {
    let target = spec
        .method(&options.method)
        .ok_or_else(|| EnumerationError::UnknownMethod {
            method: options.method.clone(),
        })?;
    let orders = order_shapes(options.sequences)?;
    let trusted = spec.trusted();

    let Some(extra) = options.invocations.checked_sub(options.sequences) else {
        debug!(
            sequences = options.sequences,
            invocations = options.invocations,
            "fewer invocations than sequences, nothing to enumerate"
        );
        return Ok(Vec::new());
    };
    let shapes = slot_shapes(options.sequences, extra);
    // The target sits in its first slot holding it: earlier slots never repeat it.
    let without_target: Vec<&MethodSpec> = trusted
        .iter()
        .copied()
        .filter(|m| m.name != target.name)
        .collect();
    let fillers: Vec<Vec<Vec<&MethodSpec>>> = (0..options.invocations)
        .map(|target_slot| {
            let slots: Vec<Vec<&MethodSpec>> = (0..options.invocations - 1)
                .map(|slot| {
                    if slot < target_slot {
                        without_target.clone()
                    } else {
                        trusted.clone()
                    }
                })
                .collect();
            cartesian(&slots)
        })
        .collect();

    let mut schemas = Vec::new();
    for order in &orders {
        for shape in &shapes {
            for (target_slot, choices) in fillers.iter().enumerate() {
                for filler in choices {
                    let mut methods = filler.clone();
                    methods.insert(target_slot, target);
                    for schema in with_arguments(&spec.class, order, shape, &methods, options)? {
                        let id = schemas.len() as u64;
                        schemas.push(Schema {
                            id: Some(id),
                            ..schema
                        });
                    }
                }
            }
        }
    }

    info!(
        class = %spec.class,
        method = %options.method,
        scenarios = schemas.len(),
        "enumerated scenarios"
    );
    Ok(schemas)
}

/// Lay `methods` out over the slots of `shape` and expand argument values.
fn with_arguments(
    class: &str,
    order: &[(usize, usize)],
    shape: &[usize],
    methods: &[&MethodSpec],
    options: &EnumerationOptions,
) -> Result<Vec<Schema>, EnumerationError> {
    let mut argument_choices = Vec::new();
    for method in methods {
        for ty in &method.parameters {
            argument_choices.push(values_of(method, ty, options.values)?);
        }
    }

    let mut out = Vec::new();
    for assignment in cartesian(&argument_choices) {
        let mut values = assignment.into_iter();
        let mut slots = methods.iter();
        let mut sequences = Vec::with_capacity(shape.len());
        for (index, &len) in shape.iter().enumerate() {
            let invocations = slots
                .by_ref()
                .take(len)
                .map(|method| {
                    let arguments = values.by_ref().take(method.parameters.len()).collect();
                    let invocation = Invocation::new(method.name.clone(), arguments).on_thread(index);
                    if method.is_void {
                        invocation.void()
                    } else {
                        invocation
                    }
                })
                .collect();
            sequences.push(SequenceSchema { index, invocations });
        }
        out.push(Schema {
            class: Some(class.to_string()),
            sequences,
            order: order.to_vec(),
            ..Schema::default()
        });
    }
    Ok(out)
}

/// Write each schema as `---\n<pretty JSON>\n`, returning how many were written.
pub fn write_schemas<W: Write>(schemas: &[Schema], output: &mut W) -> Result<usize, EnumerationError> {
    for schema in schemas {
        let text = serde_json::to_string_pretty(schema).map_err(|source| {
            EnumerationError::Serialize {
                id: schema.id.unwrap_or_default(),
                source,
            }
        })?;
        write_document(output, &text)?;
    }
    Ok(schemas.len())
}
