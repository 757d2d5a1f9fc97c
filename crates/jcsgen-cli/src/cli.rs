//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use jcsgen_engine::enumeration::{DEFAULT_INVOCATIONS, DEFAULT_SEQUENCES, DEFAULT_VALUES};
use jcsgen_engine::harness::DEFAULT_LINEARIZATION_LIMIT;

pub(crate) const CLI_LONG_ABOUT: &str =
    "Concurrency test-harness generator.\n\n\
    Typical use:\n  \
    1. jcsgen enumerate --spec map.json --method put > scenarios.txt\n  \
    2. jcsgen generate < scenarios.txt > results.txt\n\n\
    Documents on stdin and stdout are JSON objects separated by '---'.\n\
    Logs are written to stderr; set RUST_LOG to adjust verbosity.";

#[derive(Parser)]
#[command(name = "jcsgen")]
#[command(about = "Generate linearizations and test harnesses for concurrent scenarios")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Read scenarios from stdin and write them back with harness results
    Generate {
        /// Also translate each scenario into a C/C++ pthread test program
        #[arg(long)]
        clang: bool,

        /// Library source inlined into native test programs (requires --clang)
        #[arg(long, requires = "clang")]
        lib_file: Option<PathBuf>,

        /// Fail a scenario with more linearizations than this
        #[arg(long, default_value_t = DEFAULT_LINEARIZATION_LIMIT)]
        max_linearizations: usize,

        /// What to do when a scenario fails: abort | skip
        #[arg(long, default_value = "abort")]
        on_error: String,
    },

    /// Enumerate scenarios exercising one method of a class
    Enumerate {
        /// Class specification (JSON with "class" and "methods")
        #[arg(long)]
        spec: PathBuf,

        /// Method every scenario calls
        #[arg(long)]
        method: String,

        /// Number of sequences (threads): 2 | 3
        #[arg(long, default_value_t = DEFAULT_SEQUENCES)]
        sequences: usize,

        /// Total invocations per scenario
        #[arg(long, default_value_t = DEFAULT_INVOCATIONS)]
        invocations: usize,

        /// Distinct values per int argument
        #[arg(long, default_value_t = DEFAULT_VALUES)]
        values: usize,
    },
}
