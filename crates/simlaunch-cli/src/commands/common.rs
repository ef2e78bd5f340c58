//! Shared helpers for CLI commands.

use std::path::Path;

use anyhow::Result;
use console::style;

use simlaunch_codegen::{Parameters, SimulationKind, StateFile};
use simlaunch_sched::{ChainReport, HostType};

use crate::config::SimlaunchConfig;

/// Command-line overrides of the configured host.
#[derive(Debug, Clone, Default)]
pub struct HostOverrides {
    pub host_type: Option<HostType>,
    pub environment: Option<String>,
    pub cores_per_node: Option<u32>,
}

/// Load the configuration and apply `overrides` on top of it.
pub async fn load_config(
    config_path: Option<&Path>,
    overrides: &HostOverrides,
) -> Result<SimlaunchConfig> {
    let (mut config, _) = SimlaunchConfig::load(config_path).await?;
    if let Some(host_type) = overrides.host_type {
        config.host.host_type = host_type;
    }
    if let Some(ref environment) = overrides.environment {
        config.host.environment = Some(environment.clone());
    }
    if let Some(cores) = overrides.cores_per_node {
        config.host.cores_per_node = cores;
    }
    config.host.validate()?;
    Ok(config)
}

/// Parameters stored for `simname`, or the defaults of `kind` when the
/// simulation has not been initialized yet.
pub async fn current_parameters(
    kind: SimulationKind,
    work_dir: &Path,
    simname: &str,
) -> Result<Parameters> {
    let state = StateFile::new(work_dir, simname);
    if state.exists().await? {
        Ok(state.read_parameters().await?)
    } else {
        Ok(kind.default_parameters())
    }
}

/// Print what a chain wrote and submitted.
pub fn print_report(report: &ChainReport) {
    let layout = &report.layout;
    println!(
        "  Layout: {} node(s), {} process(es) per node, {} on the first node",
        layout.node_count, layout.processes_per_node, layout.first_node_task_count
    );
    if let Some(ref warning) = report.warning {
        println!("  {} {}", style("Warning:").yellow().bold(), warning);
    }
    println!(
        "  Starting at iteration {}, {} iteration(s) per job",
        report.iter0, report.niter_todo
    );
    println!();

    for entry in &report.entries {
        let script = entry
            .script_path
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "-".to_string());
        let handle = match entry.handle {
            Some(ref handle) => style(handle.to_string()).green().to_string(),
            None => style("-").dim().to_string(),
        };
        println!(
            "  [{}] {:<24} {:<28} {}",
            entry.index,
            style(&entry.suffix).cyan(),
            script,
            handle
        );
    }

    if report.dry_run {
        println!();
        println!(
            "{} Dry run: scripts written, nothing submitted",
            style("!").yellow().bold()
        );
    }
}
