//! Grid Engine (`qsub`) scripts.

use crate::backend::{JobHandle, RenderContext, ScriptRenderer, push_footer, sanitize_name};
use crate::error::SchedResult;

/// Renderer for `cluster` hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridEngineRenderer;

impl GridEngineRenderer {
    /// Slots requested from the parallel environment: whole nodes only.
    pub fn slots(ctx: &RenderContext<'_>) -> u64 {
        u64::from(ctx.host.cores_per_node) * u64::from(ctx.layout.node_count)
    }
}

impl ScriptRenderer for GridEngineRenderer {
    fn render(&self, ctx: &RenderContext<'_>) -> SchedResult<String> {
        let pe = ctx.host.require_environment()?;
        let job = ctx.job;
        let mut script = String::new();

        script.push_str("#!/bin/bash\n");

        // Export the submitting environment and run where submitted
        script.push_str("#$ -V\n");
        script.push_str(&format!("#$ -N {}\n", sanitize_name(&job.name)));
        script.push_str("#$ -cwd\n");
        script.push_str(&format!("#$ -e {}\n", job.err_file.display()));
        script.push_str(&format!("#$ -o {}\n", job.out_file.display()));
        script.push_str(&format!("#$ -pe {} {}\n", pe, Self::slots(ctx)));
        script.push_str(&format!("#$ -l h_rt={}\n", job.wall_time));

        if let Some(ref address) = ctx.host.mail.address {
            script.push_str(&format!("#$ -M {address}\n"));
            let events = ctx.host.mail.events.as_deref().unwrap_or("ea");
            script.push_str(&format!("#$ -m {events}\n"));
        }

        if let Some(JobHandle::Name(previous)) = ctx.dependency {
            script.push_str(&format!("#$ -hold_jid {}\n", sanitize_name(previous)));
        }

        script.push_str("echo \"got $NSLOTS slots.\"\n");
        script.push_str("echo \"Start time is `date`\"\n");
        script.push_str(&format!(
            "mpiexec -machinefile $TMPDIR/machines -genv LD_LIBRARY_PATH \"{}\" -n {} {}\n",
            ctx.library_path,
            ctx.request.process_count,
            job.command_line(),
        ));
        push_footer(&mut script);

        Ok(script)
    }
}
