//! simlaunch Command-Line Interface
//!
//! Initialize a simulation, assemble and build its program, and launch it as
//! a chain of batch jobs.
//!
//! ```text
//! simlaunch init NavierStokes --simname test --set nx=64 --set dt=0.005
//! simlaunch launch NavierStokes --simname test --np 64 --ntpp 2 --njobs 4 --hours 6
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::common::HostOverrides;
use commands::launch::LaunchOptions;
use commands::{assemble, host, init, launch, version};
use simlaunch_codegen::SimulationKind;
use simlaunch_sched::HostType;

/// simlaunch - simulation job chains for workstations and HPC clusters
#[derive(Parser)]
#[command(name = "simlaunch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to <config dir>/simlaunch/config.yaml)
    #[arg(long, env = "SIMLAUNCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the initial state file of a simulation
    Init {
        /// Simulation kind (NavierStokes, FluidResize)
        kind: SimulationKind,

        /// Simulation name
        #[arg(long, default_value = "test")]
        simname: String,

        /// Working directory
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,

        /// Override a parameter (name=value), may be repeated
        #[arg(long = "set", value_name = "NAME=VALUE")]
        assignments: Vec<String>,
    },

    /// Write the program source without compiling it
    Assemble {
        /// Simulation kind (NavierStokes, FluidResize)
        kind: SimulationKind,

        /// Simulation name, used to read stored parameters
        #[arg(long, default_value = "test")]
        simname: String,

        /// Working directory holding the state file
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,

        /// Program name (defaults to the kind)
        #[arg(long)]
        name: Option<String>,

        /// File replacing the main body of the program
        #[arg(long)]
        body: Option<PathBuf>,

        /// Directory the source is written to
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Build if needed and launch a chain of jobs
    Launch {
        /// Simulation kind (NavierStokes, FluidResize)
        kind: SimulationKind,

        /// Simulation name
        #[arg(long, default_value = "test")]
        simname: String,

        /// Working directory
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,

        /// Program name (defaults to the kind)
        #[arg(long)]
        name: Option<String>,

        /// Number of MPI processes
        #[arg(short = 'n', long = "np", default_value = "4")]
        nb_processes: u32,

        /// Number of OpenMP threads per process
        #[arg(short = 't', long = "ntpp", default_value = "1")]
        nb_threads_per_process: u32,

        /// Number of chained jobs
        #[arg(long, default_value = "1")]
        njobs: u32,

        /// Wall-clock hours per job
        #[arg(long, default_value = "0")]
        hours: u32,

        /// Wall-clock minutes per job
        #[arg(long, default_value = "10")]
        minutes: u32,

        /// Standard output file prefix
        #[arg(long, default_value = "out_file")]
        out_file: String,

        /// Standard error file prefix
        #[arg(long, default_value = "err_file")]
        err_file: String,

        /// Write scripts but do not submit or run anything
        #[arg(long)]
        no_submit: bool,

        /// Host type (pc, cluster, SLURM, IBMLoadLeveler)
        #[arg(long)]
        host_type: Option<HostType>,

        /// Queue, partition, parallel environment or class
        #[arg(long)]
        environment: Option<String>,

        /// Cores per node
        #[arg(long)]
        cores_per_node: Option<u32>,
    },

    /// Show the effective host and toolchain configuration
    Host {
        /// Host type (pc, cluster, SLURM, IBMLoadLeveler)
        #[arg(long)]
        host_type: Option<HostType>,

        /// Queue, partition, parallel environment or class
        #[arg(long)]
        environment: Option<String>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Init {
            kind,
            simname,
            work_dir,
            assignments,
        } => init::execute(kind, &simname, &work_dir, &assignments).await,

        Commands::Assemble {
            kind,
            simname,
            work_dir,
            name,
            body,
            output,
        } => {
            assemble::execute(
                kind,
                &simname,
                &work_dir,
                name.as_deref(),
                body.as_deref(),
                &output,
            )
            .await
        }

        Commands::Launch {
            kind,
            simname,
            work_dir,
            name,
            nb_processes,
            nb_threads_per_process,
            njobs,
            hours,
            minutes,
            out_file,
            err_file,
            no_submit,
            host_type,
            environment,
            cores_per_node,
        } => {
            launch::execute(LaunchOptions {
                kind,
                simname,
                work_dir,
                name,
                config: cli.config,
                overrides: HostOverrides {
                    host_type,
                    environment,
                    cores_per_node,
                },
                nb_processes,
                nb_threads_per_process,
                njobs,
                hours,
                minutes,
                out_file,
                err_file,
                no_submit,
            })
            .await
        }

        Commands::Host {
            host_type,
            environment,
        } => {
            let overrides = HostOverrides {
                host_type,
                environment,
                cores_per_node: None,
            };
            host::execute(cli.config.as_deref(), &overrides).await
        }

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_launch() {
        let cli = Cli::try_parse_from([
            "simlaunch",
            "launch",
            "NavierStokes",
            "--simname",
            "run1",
            "--np",
            "16",
            "-t",
            "2",
            "--njobs",
            "3",
            "--hours",
            "4",
            "--no-submit",
            "--host-type",
            "SLURM",
            "--environment",
            "general",
        ])
        .unwrap();

        match cli.command {
            Commands::Launch {
                kind,
                simname,
                nb_processes,
                nb_threads_per_process,
                njobs,
                hours,
                minutes,
                no_submit,
                host_type,
                environment,
                ..
            } => {
                assert_eq!(kind, SimulationKind::NavierStokes);
                assert_eq!(simname, "run1");
                assert_eq!(nb_processes, 16);
                assert_eq!(nb_threads_per_process, 2);
                assert_eq!(njobs, 3);
                assert_eq!(hours, 4);
                assert_eq!(minutes, 10);
                assert!(no_submit);
                assert_eq!(host_type, Some(HostType::Slurm));
                assert_eq!(environment.as_deref(), Some("general"));
            }
            _ => panic!("expected launch"),
        }
    }

    #[test]
    fn test_parse_launch_defaults() {
        let cli = Cli::try_parse_from(["simlaunch", "launch", "fluidresize"]).unwrap();
        match cli.command {
            Commands::Launch {
                kind,
                nb_processes,
                nb_threads_per_process,
                njobs,
                out_file,
                no_submit,
                ..
            } => {
                assert_eq!(kind, SimulationKind::FluidResize);
                assert_eq!(nb_processes, 4);
                assert_eq!(nb_threads_per_process, 1);
                assert_eq!(njobs, 1);
                assert_eq!(out_file, "out_file");
                assert!(!no_submit);
            }
            _ => panic!("expected launch"),
        }
    }

    #[test]
    fn test_parse_init_assignments() {
        let cli = Cli::try_parse_from([
            "simlaunch",
            "init",
            "NavierStokes",
            "--set",
            "nx=64",
            "--set",
            "dt=0.005",
        ])
        .unwrap();
        match cli.command {
            Commands::Init { assignments, .. } => {
                assert_eq!(assignments, vec!["nx=64", "dt=0.005"]);
            }
            _ => panic!("expected init"),
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(Cli::try_parse_from(["simlaunch", "launch", "Turbulence"]).is_err());
    }

    #[test]
    fn test_verbose_count() {
        let cli = Cli::try_parse_from(["simlaunch", "-vv", "version"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
