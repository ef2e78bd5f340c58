//! Init command implementation.
//!
//! Writes the initial state file of a simulation.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use simlaunch_codegen::{SimulationKind, StateFile};

/// Execute the init command.
pub async fn execute(
    kind: SimulationKind,
    simname: &str,
    work_dir: &Path,
    assignments: &[String],
) -> Result<()> {
    let mut parameters = kind.default_parameters();
    for assignment in assignments {
        parameters.apply_assignment(assignment)?;
    }

    tokio::fs::create_dir_all(work_dir)
        .await
        .with_context(|| format!("Failed to create {}", work_dir.display()))?;

    let state = StateFile::new(work_dir, simname);
    state.initialize(&parameters).await?;

    println!(
        "{} Initialized {} ({}) at {}",
        style("✓").green().bold(),
        style(simname).cyan(),
        kind,
        state.path().display()
    );
    for (name, value) in parameters.iter() {
        println!("  {name:<16} {value}");
    }
    Ok(())
}
