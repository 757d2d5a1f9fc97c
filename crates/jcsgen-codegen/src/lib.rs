#![doc = include_str!("../README.md")]

//! Native harness generation from jcsgen scenarios.
//!
//! The generated program runs each invocation sequence on its own pthread,
//! except for a unique initial (resp. final) sequence singled out by the
//! scenario's order, which runs on the main thread before (resp. after) the
//! others.

pub mod c_gen;
pub mod common;

use jcsgen_ir::Schema;
use serde_json::{Map, Value};

/// Errors returned by code generation entry points.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// A sequence is ordered relative to something other than the initial or final sequence.
    #[error("sequence {index} cannot be translated: only an initial and a final sequence may be ordered")]
    IllegalOrder { index: usize },
    /// C++ invocations are member calls and need an object to call them on.
    #[error("{language} translation requires `object_name`")]
    MissingObject { language: &'static str },
    /// The shared object is declared with the scenario's class as its type.
    #[error("`object_name` is set but the scenario has no `class` to declare it with")]
    MissingClass,
    /// An accepted outcome does not cover every invocation.
    #[error("outcome {outcome} has {got} values, expected {expected}")]
    OutcomeArity {
        outcome: usize,
        expected: usize,
        got: usize,
    },
    /// The input uses a feature not implemented by the translator.
    #[error("unsupported feature: {0}")]
    Unsupported(String),
}

/// Provenance metadata embedded as a header comment in generated harnesses.
#[derive(Debug, Clone)]
pub struct ProvenanceInfo {
    /// SHA-256 of the compact JSON of the scenario document.
    pub scenario_sha256: String,
    /// SHA-256 of the inlined library source, when one was supplied.
    pub library_sha256: Option<String>,
}

impl ProvenanceInfo {
    pub fn for_scenario(scenario: &Map<String, Value>, include_source: Option<&str>) -> Self {
        let encoded = Value::Object(scenario.clone()).to_string();
        Self {
            scenario_sha256: common::sha256_hex(encoded.as_bytes()),
            library_sha256: include_source.map(|src| common::sha256_hex(src.as_bytes())),
        }
    }
}

/// Generate a native harness for `schema`.
///
/// # Parameters
/// - `schema`: Validated scenario.
/// - `include_source`: Library source inlined ahead of the harness, if any.
///
/// # Returns
/// The complete translation unit, or a codegen error.
pub fn generate(schema: &Schema, include_source: Option<&str>) -> Result<String, CodegenError> {
    c_gen::generate_native(schema, include_source)
}

/// Generate a native harness with a provenance header.
pub fn generate_with_provenance(
    schema: &Schema,
    include_source: Option<&str>,
    provenance: &ProvenanceInfo,
) -> Result<String, CodegenError> {
    let code = generate(schema, include_source)?;
    let mut header = String::new();
    header.push_str(&format!(
        "// @jcsgen-provenance scenario_sha256={}\n",
        provenance.scenario_sha256
    ));
    if let Some(library) = &provenance.library_sha256 {
        header.push_str(&format!(
            "// @jcsgen-provenance library_sha256={library}\n"
        ));
    }
    header.push('\n');
    Ok(format!("{header}{code}"))
}

/// File name for the generated harness: `<Class>Test<id>.<ext>`.
pub fn harness_file_name(schema: &Schema) -> String {
    let class = schema
        .class
        .as_deref()
        .map(common::short_class_name)
        .filter(|name| !name.is_empty())
        .unwrap_or("Harness");
    let id = schema.id.map(|id| id.to_string()).unwrap_or_default();
    let language = schema.language.unwrap_or_default();
    format!(
        "{}Test{id}.{}",
        common::to_pascal_case(class),
        language.as_str()
    )
}
