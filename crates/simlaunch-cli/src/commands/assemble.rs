//! Assemble command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use simlaunch_codegen::{SimulationKind, SourceAssembler};

use super::common::current_parameters;

/// Execute the assemble command: write `<name>.cpp` without compiling.
pub async fn execute(
    kind: SimulationKind,
    simname: &str,
    work_dir: &Path,
    name: Option<&str>,
    body: Option<&Path>,
    out_dir: &Path,
) -> Result<()> {
    let parameters = current_parameters(kind, work_dir, simname).await?;

    let mut source = kind.program_named(name.unwrap_or(kind.as_str()));
    if let Some(body) = body {
        let text = tokio::fs::read_to_string(body)
            .await
            .with_context(|| format!("Failed to read body: {}", body.display()))?;
        source = source.with_main_body(text);
    }

    let path = SourceAssembler::new(&parameters)
        .write_src(&source, out_dir)
        .await?;

    println!(
        "{} Wrote {} ({} parameters)",
        style("✓").green().bold(),
        style(path.display()).cyan(),
        parameters.len()
    );
    Ok(())
}
