//! Slurm (`sbatch`) backend.

pub mod parser;
pub mod templates;

use crate::backend::{RenderContext, ScriptRenderer};
use crate::error::SchedResult;

pub use parser::parse_sbatch_output;

/// Renderer for `SLURM` hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlurmRenderer;

impl ScriptRenderer for SlurmRenderer {
    fn render(&self, ctx: &RenderContext<'_>) -> SchedResult<String> {
        let partition = ctx.host.require_environment()?;
        Ok(templates::generate_batch_script(ctx, partition))
    }
}
