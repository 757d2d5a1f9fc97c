//! Streaming scenario pipeline.
//!
//! Input and output are text streams of JSON objects separated by the literal
//! delimiter `---`. Documents are processed strictly one at a time and in
//! input order: parse, build a harness, count its linearizations, merge the
//! results into the original object, emit. Each emitted document is
//! serialized in full before anything is written and the output is flushed
//! after it, so a later failure never leaves a partial document behind or
//! loses an earlier one.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, debug_span, info, warn};

use crate::harness::{Harness, HarnessConfig, HarnessError, HarnessFactory};
use crate::results::merge_results;

/// Separator between documents on both input and output.
pub const DELIMITER: &str = "---";

pub const POLICY_ABORT: &str = "abort";
pub const POLICY_SKIP: &str = "skip";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error on document stream: {0}")]
    Io(#[from] io::Error),
    /// The document is not a JSON object.
    #[error("document {document}: malformed JSON object: {source}")]
    MalformedInput {
        document: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("document {document}: harness construction failed: {source}")]
    Harness {
        document: usize,
        #[source]
        source: HarnessError,
    },
    #[error("document {document}: cannot serialize output: {source}")]
    Serialize {
        document: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown error policy '{0}' (expected 'abort' or 'skip')")]
    UnknownPolicy(String),
}

impl PipelineError {
    /// 1-based position of the offending document, when there is one.
    pub fn document(&self) -> Option<usize> {
        match self {
            PipelineError::MalformedInput { document, .. }
            | PipelineError::Harness { document, .. }
            | PipelineError::Serialize { document, .. } => Some(*document),
            PipelineError::Io(_) | PipelineError::UnknownPolicy(_) => None,
        }
    }
}

/// What to do when a single document cannot be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop the run at the first failing document.
    #[default]
    Abort,
    /// Emit an error record in the failing document's place and continue.
    Skip,
}

impl ErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorPolicy::Abort => POLICY_ABORT,
            ErrorPolicy::Skip => POLICY_SKIP,
        }
    }
}

impl FromStr for ErrorPolicy {
    type Err = PipelineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            POLICY_ABORT => Ok(ErrorPolicy::Abort),
            POLICY_SKIP => Ok(ErrorPolicy::Skip),
            other => Err(PipelineError::UnknownPolicy(other.into())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub on_error: ErrorPolicy,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Documents written to the output, error records included.
    pub emitted: usize,
    /// Documents that failed and were replaced by an error record.
    pub failed: usize,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Splits a byte stream on [`DELIMITER`] as data arrives.
///
/// The split is a plain substring match and is not JSON-aware. Segments that
/// are empty or whitespace-only are not documents and are skipped.
pub struct DocumentReader<R> {
    reader: R,
    pending: Vec<u8>,
    /// Bytes of `pending` already known not to start a delimiter.
    scanned: usize,
    eof: bool,
}

impl<R: BufRead> DocumentReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            scanned: 0,
            eof: false,
        }
    }

    /// Read the next document.
    ///
    /// Returns `Ok(None)` once the input is exhausted.
    pub fn next_document(&mut self) -> io::Result<Option<Vec<u8>>> {
        let delimiter = DELIMITER.as_bytes();
        loop {
            if let Some(offset) = find(&self.pending[self.scanned..], delimiter) {
                let end = self.scanned + offset;
                let segment: Vec<u8> = self.pending.drain(..end).collect();
                self.pending.drain(..delimiter.len());
                self.scanned = 0;
                if is_blank(&segment) {
                    continue;
                }
                return Ok(Some(segment));
            }
            self.scanned = self.pending.len().saturating_sub(delimiter.len() - 1);

            if self.eof {
                let segment = std::mem::take(&mut self.pending);
                self.scanned = 0;
                if is_blank(&segment) {
                    return Ok(None);
                }
                return Ok(Some(segment));
            }

            let chunk = self.reader.fill_buf()?;
            if chunk.is_empty() {
                self.eof = true;
                continue;
            }
            self.pending.extend_from_slice(chunk);
            let consumed = chunk.len();
            self.reader.consume(consumed);
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn is_blank(segment: &[u8]) -> bool {
    segment.iter().all(u8::is_ascii_whitespace)
}

/// Write one framed document: the delimiter line, the object, a newline.
pub fn write_document<W: Write>(output: &mut W, serialized: &str) -> io::Result<()> {
    writeln!(output, "{DELIMITER}")?;
    writeln!(output, "{serialized}")?;
    output.flush()
}

/// Parse, build, count and merge a single document.
fn process_document<F: HarnessFactory>(
    raw: &[u8],
    document: usize,
    factory: &F,
    config: &HarnessConfig,
) -> Result<String, PipelineError> {
    let scenario: Map<String, Value> = serde_json::from_slice(raw)
        .map_err(|source| PipelineError::MalformedInput { document, source })?;
    let harness = factory
        .build(&scenario, config)
        .map_err(|source| PipelineError::Harness { document, source })?;
    let count = harness.linearizations().len();
    debug!(linearizations = count, "harness ready");
    let merged = merge_results(&scenario, harness.results(), count);
    serde_json::to_string(&Value::Object(merged))
        .map_err(|source| PipelineError::Serialize { document, source })
}

/// Run the pipeline over `input`, writing results to `output`.
///
/// # Errors
/// I/O failures always stop the run. Per-document failures stop it under
/// [`ErrorPolicy::Abort`]; under [`ErrorPolicy::Skip`] they are recorded in
/// the output and counted in [`RunSummary::failed`].
pub fn run_pipeline<R, W, F>(
    input: R,
    output: &mut W,
    factory: &F,
    config: &HarnessConfig,
    options: &PipelineOptions,
) -> Result<RunSummary, PipelineError>
where
    R: BufRead,
    W: Write,
    F: HarnessFactory,
{
    let mut reader = DocumentReader::new(input);
    let mut summary = RunSummary::default();
    let mut document = 0;

    while let Some(raw) = reader.next_document()? {
        document += 1;
        let _span = debug_span!("document", ordinal = document).entered();

        match process_document(&raw, document, factory, config) {
            Ok(serialized) => {
                write_document(output, &serialized)?;
                summary.emitted += 1;
            }
            Err(err) if options.on_error == ErrorPolicy::Skip => {
                warn!("skipping document {document}: {err}");
                let record = json!({"error": err.to_string(), "document": document});
                write_document(output, &record.to_string())?;
                summary.emitted += 1;
                summary.failed += 1;
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        emitted = summary.emitted,
        failed = summary.failed,
        "document stream exhausted"
    );
    Ok(summary)
}
