// Command handler for: Generate
//
// Streams `---`-delimited scenarios from stdin to stdout, adding each
// scenario's harness results and linearization count.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::CommandFactory;
use miette::IntoDiagnostic;
use tracing::info;

use jcsgen_engine::harness::{HarnessConfig, SchemaHarnessFactory};
use jcsgen_engine::pipeline::{run_pipeline, ErrorPolicy, PipelineOptions};

use crate::cli::Cli;

/// Run the `generate` CLI command.
pub(crate) fn run_generate_command(
    clang: bool,
    lib_file: Option<PathBuf>,
    max_linearizations: usize,
    on_error: String,
) -> miette::Result<()> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        let mut command = Cli::command();
        if let Some(generate) = command.find_subcommand_mut("generate") {
            generate.print_help().into_diagnostic()?;
        }
        return Ok(());
    }

    let on_error: ErrorPolicy = on_error.parse().into_diagnostic()?;
    let include_source = match &lib_file {
        Some(path) => Some(fs::read_to_string(path).map_err(|e| {
            miette::miette!("Cannot read library file {}: {e}", path.display())
        })?),
        None => None,
    };

    let config = HarnessConfig {
        native_support: clang,
        include_source,
        linearization_limit: max_linearizations,
    };
    let options = PipelineOptions { on_error };
    info!(
        native = clang,
        on_error = on_error.as_str(),
        "generating harnesses from stdin"
    );

    let stdout = io::stdout();
    let summary = run_pipeline(
        stdin.lock(),
        &mut stdout.lock(),
        &SchemaHarnessFactory,
        &config,
        &options,
    )
    .map_err(|e| miette::miette!("Harness generation failed: {e}"))?;

    if !summary.is_success() {
        miette::bail!(
            "{} of {} documents failed (see error records in the output)",
            summary.failed,
            summary.emitted
        );
    }
    Ok(())
}
