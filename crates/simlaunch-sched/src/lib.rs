//! simlaunch job chains for workstations and HPC clusters
//!
//! This crate turns a resource request into scheduler submissions:
//! 1. **Partitioning**: one shared function maps processes/threads onto nodes
//! 2. **Rendering**: four backends spell the layout in their own directives
//! 3. **Chaining**: `N` jobs continue one simulation, each depending on the
//!    previous one
//!
//! # Supported Hosts
//!
//! | Host type | Submission | Dependency |
//! |-----------|------------|------------|
//! | `pc` | `mpirun`, run in sequence | completion order |
//! | `cluster` (Grid Engine) | `qsub` | `-hold_jid <name>` |
//! | `SLURM` | `sbatch` | `--dependency=afterok:<id>` |
//! | `IBMLoadLeveler` | `llsubmit`, one multi-step job | `<step> == 0` |
//!
//! Nothing is retried: the first failed submission stops the chain.
//!
//! # Example
//!
//! ```ignore
//! use simlaunch_codegen::ToolchainConfig;
//! use simlaunch_sched::{
//!     ChainRequest, HostDescriptor, JobChain, ResourceRequest, SystemRunner, WallTime,
//! };
//!
//! let host = HostDescriptor::slurm("general", 40);
//! let toolchain = ToolchainConfig::default();
//! let runner = SystemRunner;
//!
//! let request = ChainRequest::new("test", "NavierStokes", ResourceRequest::new(80, 2)?)
//!     .with_njobs(3)
//!     .with_wall_time(WallTime::new(4, 0));
//!
//! let report = JobChain::new(&host, &toolchain, "/scratch/test", &runner)
//!     .run(&request)
//!     .await?;
//! for entry in &report.entries {
//!     println!("{} -> {:?}", entry.suffix, entry.handle);
//! }
//! ```

pub mod backend;
pub mod chain;
pub mod error;
pub mod host;
pub mod partition;
pub mod runner;

// Re-exports
pub use backend::{
    GridEngineRenderer, JobHandle, JobSpec, LoadLevelerRenderer, LocalRenderer, RenderContext,
    ScriptRenderer, SlurmRenderer, WallTime,
};
pub use chain::{ChainEntry, ChainReport, ChainRequest, JobChain, iteration_offsets, name_suffix};
pub use error::{SchedError, SchedResult};
pub use host::{HostDescriptor, HostType, MailSettings};
pub use partition::{Layout, LayoutWarning, Partition, ResourceRequest, partition};
pub use runner::{CommandOutput, CommandRunner, Invocation, MockRunner, SystemRunner};
