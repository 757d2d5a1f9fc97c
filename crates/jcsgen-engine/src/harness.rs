//! Harness construction.
//!
//! A harness is built from exactly one scenario document. The pipeline only
//! relies on the [`Harness`] and [`HarnessFactory`] traits; the default
//! implementation, [`SchemaHarness`], decodes the document as a
//! [`Schema`], enumerates its linearizations and, when native support is
//! enabled, translates it into a C/C++ test program.

use jcsgen_codegen::{CodegenError, ProvenanceInfo};
use jcsgen_ir::{InvocationSequence, Language, Schema, SchemaError};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::linearize::linearizations;

/// Default cap on the number of linearizations a single harness may enumerate.
pub const DEFAULT_LINEARIZATION_LIMIT: usize = 100_000;

/// Reasons a scenario cannot be realized as a harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("scenario has more than {limit} linearizations")]
    TooManyLinearizations { limit: usize },
    #[error("native translation failed: {0}")]
    Translation(#[from] CodegenError),
}

/// Settings applied uniformly to every harness in a run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Engage the native (C/C++) translator.
    pub native_support: bool,
    /// Library source inlined into native harnesses.
    pub include_source: Option<String>,
    pub linearization_limit: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            native_support: false,
            include_source: None,
            linearization_limit: DEFAULT_LINEARIZATION_LIMIT,
        }
    }
}

impl HarnessConfig {
    pub fn native(mut self, enabled: bool) -> Self {
        self.native_support = enabled;
        self
    }
}

/// A constructed test scenario.
pub trait Harness {
    /// Every valid ordering of the scenario's invocations.
    fn linearizations(&self) -> &[InvocationSequence];
    /// Summary merged into the output document.
    fn results(&self) -> Value;
}

/// Builds a [`Harness`] from a scenario document.
pub trait HarnessFactory {
    type Output: Harness;

    fn build(
        &self,
        scenario: &Map<String, Value>,
        config: &HarnessConfig,
    ) -> Result<Self::Output, HarnessError>;
}

/// A generated native test program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub language: Language,
    pub file_name: String,
    pub code: String,
}

impl Translation {
    fn to_json(&self) -> Value {
        json!({
            "language": self.language.as_str(),
            "file_name": self.file_name,
            "code": self.code,
        })
    }
}

/// The default harness: linearizations of a decoded [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaHarness {
    linearizations: Vec<InvocationSequence>,
    translation: Option<Translation>,
}

impl SchemaHarness {
    pub fn translation(&self) -> Option<&Translation> {
        self.translation.as_ref()
    }
}

impl Harness for SchemaHarness {
    fn linearizations(&self) -> &[InvocationSequence] {
        &self.linearizations
    }

    fn results(&self) -> Value {
        let mut results = Map::new();
        results.insert(
            "orderings".into(),
            Value::Array(
                self.linearizations
                    .iter()
                    .map(|lin| Value::String(lin.to_string()))
                    .collect(),
            ),
        );
        if let Some(translation) = &self.translation {
            results.insert("translation".into(), translation.to_json());
        }
        Value::Object(results)
    }
}

/// Factory for [`SchemaHarness`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaHarnessFactory;

impl HarnessFactory for SchemaHarnessFactory {
    type Output = SchemaHarness;

    fn build(
        &self,
        scenario: &Map<String, Value>,
        config: &HarnessConfig,
    ) -> Result<SchemaHarness, HarnessError> {
        build_harness(scenario, config)
    }
}

/// Build the default harness for one scenario document.
///
/// # Errors
/// Any [`HarnessError`]: schema decoding or validation, the linearization
/// cap, or native translation when `config.native_support` is set.
pub fn build_harness(
    scenario: &Map<String, Value>,
    config: &HarnessConfig,
) -> Result<SchemaHarness, HarnessError> {
    let schema = Schema::from_object(scenario)?;
    let linearizations = linearizations(&schema, config.linearization_limit)?;
    debug!(
        sequences = schema.sequences.len(),
        invocations = schema.invocation_count(),
        linearizations = linearizations.len(),
        "built harness"
    );

    let translation = if config.native_support {
        let include = config.include_source.as_deref();
        let provenance = ProvenanceInfo::for_scenario(scenario, include);
        let code = jcsgen_codegen::generate_with_provenance(&schema, include, &provenance)?;
        Some(Translation {
            language: schema.language.unwrap_or_default(),
            file_name: jcsgen_codegen::harness_file_name(&schema),
            code,
        })
    } else {
        None
    };

    Ok(SchemaHarness {
        linearizations,
        translation,
    })
}
