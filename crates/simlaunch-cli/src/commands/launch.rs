//! Launch command implementation.
//!
//! Builds the program if needed, then writes and submits the job chain.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use simlaunch_codegen::{BuildOutcome, Builder, SimulationKind, StateFile};
use simlaunch_sched::{ChainRequest, JobChain, ResourceRequest, SystemRunner, WallTime};

use super::common::{HostOverrides, load_config, print_report};

/// Options of one launch.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub kind: SimulationKind,
    pub simname: String,
    pub work_dir: PathBuf,
    pub name: Option<String>,
    pub config: Option<PathBuf>,
    pub overrides: HostOverrides,
    pub nb_processes: u32,
    pub nb_threads_per_process: u32,
    pub njobs: u32,
    pub hours: u32,
    pub minutes: u32,
    pub out_file: String,
    pub err_file: String,
    pub no_submit: bool,
}

/// Execute the launch command.
pub async fn execute(opts: LaunchOptions) -> Result<()> {
    let config = load_config(opts.config.as_deref(), &opts.overrides).await?;
    let program = opts.name.clone().unwrap_or_else(|| opts.kind.to_string());
    let request = ResourceRequest::new(opts.nb_processes, opts.nb_threads_per_process)?;

    println!(
        "{} Launching {} ({}) on {} host",
        style("→").cyan().bold(),
        style(&opts.simname).green(),
        style(&program).yellow(),
        style(config.host.host_type).magenta()
    );

    let state = StateFile::new(&opts.work_dir, &opts.simname);
    if !state.exists().await? {
        anyhow::bail!(
            "No state file at {}; run `simlaunch init` first",
            state.path().display()
        );
    }
    let parameters = state.read_parameters().await?;

    let chain_request = ChainRequest::new(&opts.simname, &program, request)
        .with_njobs(opts.njobs)
        .with_wall_time(WallTime::new(opts.hours, opts.minutes))
        .with_output_prefixes(&opts.out_file, &opts.err_file)
        .with_dry_run(opts.no_submit);

    let runner = SystemRunner;
    let chain = JobChain::new(&config.host, &config.toolchain, &opts.work_dir, &runner);
    chain.check(&chain_request)?;
    parameters.clone().prepare_for_chain()?;

    // Build or reuse the program
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message(format!("Checking {program}..."));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let build_dir = std::env::current_dir().context("Cannot determine current directory")?;
    let source = opts.kind.program_named(&program);
    let outcome = Builder::new(&config.toolchain, build_dir)
        .ensure_built(&source, &parameters, &opts.work_dir)
        .await;
    spinner.finish_and_clear();

    match outcome? {
        BuildOutcome::Reused(path) => println!("  Reusing {}", path.display()),
        BuildOutcome::Rebuilt(path) => println!("  Compiled {}", path.display()),
    }

    let report = chain.run(&chain_request).await?;

    print_report(&report);
    if !report.dry_run {
        println!();
        println!(
            "{} {} job(s) launched",
            style("✓").green().bold(),
            report.entries.len()
        );
    }
    Ok(())
}
