#![doc = include_str!("../README.md")]

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            clang,
            lib_file,
            max_linearizations,
            on_error,
        } => {
            commands::generate::run_generate_command(
                clang,
                lib_file,
                max_linearizations,
                on_error,
            )?;
        }
        Commands::Enumerate {
            spec,
            method,
            sequences,
            invocations,
            values,
        } => {
            commands::enumerate::run_enumerate_command(
                spec,
                method,
                sequences,
                invocations,
                values,
            )?;
        }
    }

    Ok(())
}
