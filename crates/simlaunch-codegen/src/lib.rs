//! Source generation for simlaunch simulations.
//!
//! This crate turns a simulation configuration into a compilable C++ program
//! and decides when an existing build can be reused:
//!
//! 1. **Parameters**: named scalar values, persisted in the state file and
//!    declared as globals in the generated program
//! 2. **Assembly**: fixed boilerplate and the variant's body stitched together
//!    in a fixed order
//! 3. **Build cache**: rebuild only when the artifact is missing or older than
//!    the toolchain install
//!
//! # Checkpoint protocol
//!
//! The generated program reads `iteration` from `<simname>.json` on start-up
//! and rank 0 writes the final value back on exit, so consecutive jobs resume
//! where the previous one stopped.
//!
//! # Example
//!
//! ```ignore
//! use simlaunch_codegen::{Builder, SimulationKind, StateFile, ToolchainConfig};
//!
//! let kind = SimulationKind::NavierStokes;
//! let params = kind.default_parameters();
//! StateFile::new("/scratch/run", "test").initialize(&params).await?;
//!
//! let toolchain = ToolchainConfig::default();
//! let outcome = Builder::new(&toolchain, ".")
//!     .ensure_built(&kind.program(), &params, "/scratch/run".as_ref())
//!     .await?;
//! println!("program at {}", outcome.artifact().display());
//! ```

pub mod assembler;
pub mod build_cache;
pub mod checkpoint;
pub mod error;
pub mod parameters;
pub mod simulation;
pub mod templates;
pub mod toolchain;

// Re-exports
pub use assembler::{ProgramSource, Segment, SourceAssembler};
pub use build_cache::{BuildOutcome, Builder, should_rebuild};
pub use checkpoint::{CheckpointState, StateFile};
pub use error::{CodegenError, CodegenResult};
pub use parameters::{DT, NITER_TODO, ParameterValue, Parameters};
pub use simulation::SimulationKind;
pub use toolchain::ToolchainConfig;
