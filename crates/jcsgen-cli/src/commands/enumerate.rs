// Command handler for: Enumerate
//
// Expands a class specification into a scenario stream on stdout, ready to
// be piped into `jcsgen generate`.

use std::fs;
use std::io;
use std::path::PathBuf;

use jcsgen_engine::enumeration::{enumerate, write_schemas, ClassSpec, EnumerationOptions};

/// Run the `enumerate` CLI command.
pub(crate) fn run_enumerate_command(
    spec: PathBuf,
    method: String,
    sequences: usize,
    invocations: usize,
    values: usize,
) -> miette::Result<()> {
    let text = fs::read_to_string(&spec)
        .map_err(|e| miette::miette!("Cannot find file {}: {e}", spec.display()))?;
    let class = ClassSpec::from_json(&text)
        .map_err(|e| miette::miette!("Invalid class specification {}: {e}", spec.display()))?;

    let options = EnumerationOptions {
        method,
        sequences,
        invocations,
        values,
    };
    let schemas =
        enumerate(&class, &options).map_err(|e| miette::miette!("Enumeration failed: {e}"))?;

    let stdout = io::stdout();
    write_schemas(&schemas, &mut stdout.lock())
        .map_err(|e| miette::miette!("Cannot write scenarios: {e}"))?;
    Ok(())
}
