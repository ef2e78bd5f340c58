//! IBM LoadLeveler (`llsubmit`) scripts.
//!
//! A chain of more than one job is expressed as a single multi-step job
//! file: step `j` depends on step `j - 1` exiting with status 0.

use std::path::Path;

use crate::backend::{RenderContext, ScriptRenderer, push_footer};
use crate::error::SchedResult;

/// Renderer for `IBMLoadLeveler` hosts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadLevelerRenderer {
    steps: Option<Steps>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Steps {
    prefix: String,
    count: u32,
}

impl LoadLevelerRenderer {
    /// One job, one step.
    pub fn single() -> Self {
        Self { steps: None }
    }

    /// `count` chained steps named `<prefix>.<j>`.
    pub fn multi_step(prefix: impl Into<String>, count: u32) -> Self {
        Self {
            steps: Some(Steps {
                prefix: prefix.into(),
                count,
            }),
        }
    }

    /// Name of step `index` in a multi-step job.
    pub fn step_name(prefix: &str, index: u32) -> String {
        format!("{prefix}.{index}")
    }

    fn push_resources(script: &mut String, ctx: &RenderContext<'_>) {
        let layout = &ctx.layout;
        script.push_str(&format!(
            "# @ resources = ConsumableCpus({})\n",
            ctx.request.threads_per_process
        ));
        script.push_str("# @ network.MPI = sn_all,not_shared,us\n");
        script.push_str(&format!("# @ wall_clock_limit = {}\n", ctx.job.wall_time));
        script.push_str(&format!("# @ node = {}\n", layout.node_count));
        script.push_str(&format!("# @ tasks_per_node = {}\n", layout.processes_per_node));
        if layout.first_node_task_count > 0 {
            script.push_str(&format!(
                "# @ first_node_tasks = {}\n",
                layout.first_node_task_count
            ));
        }
        script.push_str("# @ queue\n");
    }
}

fn with_step_suffix(file: &Path) -> String {
    format!("{}.$(stepid)", file.display())
}

impl ScriptRenderer for LoadLevelerRenderer {
    fn render(&self, ctx: &RenderContext<'_>) -> SchedResult<String> {
        let class = ctx.host.require_environment()?;
        let job = ctx.job;
        let work_dir = ctx.work_dir;
        let mut script = String::new();

        script.push_str("# @ shell=/bin/bash\n");

        let (err_file, out_file) = match self.steps {
            Some(_) => (
                with_step_suffix(&work_dir.join(&job.err_file)),
                with_step_suffix(&work_dir.join(&job.out_file)),
            ),
            None => (
                work_dir.join(&job.err_file).display().to_string(),
                work_dir.join(&job.out_file).display().to_string(),
            ),
        };
        script.push_str(&format!("# @ error = {err_file}\n"));
        script.push_str(&format!("# @ output = {out_file}\n"));
        script.push_str("# @ job_type = MPICH\n");
        script.push_str(&format!("# @ class = {class}\n"));
        script.push_str("# @ node_usage = not_shared\n");

        match self.steps {
            None => {
                script.push_str("# @ notification = complete\n");
                let user = ctx.host.mail.address.as_deref().unwrap_or("$(user)");
                script.push_str(&format!("# @ notify_user = {user}\n"));
                Self::push_resources(&mut script, ctx);
            }
            Some(Steps { ref prefix, count }) => {
                script.push_str("#\n");
                for index in 0..count {
                    script.push_str(&format!(
                        "# @ step_name = {}\n",
                        Self::step_name(prefix, index)
                    ));
                    if index > 0 {
                        script.push_str(&format!(
                            "# @ dependency = {} == 0\n",
                            Self::step_name(prefix, index - 1)
                        ));
                    }
                    Self::push_resources(&mut script, ctx);
                }
            }
        }

        // Environment setup
        script.push_str(&format!(
            "export OMP_NUM_THREADS={}\n",
            ctx.request.threads_per_process
        ));
        script.push_str(&format!(
            "export LD_LIBRARY_PATH={}:${{LD_LIBRARY_PATH}}\n",
            ctx.library_path
        ));
        script.push_str("echo \"Start time is `date`\"\n");
        script.push_str(&format!("cd {}\n", work_dir.display()));
        script.push_str("export KMP_AFFINITY=compact,verbose\n");
        script.push_str("export I_MPI_PIN_DOMAIN=omp\n");
        script.push_str(&format!(
            "mpiexec.hydra -np {} -ppn {} -ordered-output -prepend-rank {}\n",
            ctx.request.process_count,
            ctx.layout.processes_per_node,
            job.command_line_from(work_dir),
        ));
        push_footer(&mut script);

        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support::{job, layout};
    use crate::error::SchedError;
    use crate::host::{HostDescriptor, HostType};
    use crate::partition::ResourceRequest;

    fn render(renderer: &LoadLevelerRenderer, host: &HostDescriptor) -> SchedResult<String> {
        let job = job("test_100");
        let ctx = RenderContext {
            host,
            request: ResourceRequest::new(10, 4).unwrap(),
            layout: layout(5, 2, 2),
            job: &job,
            work_dir: Path::new("/scratch/run"),
            library_path: "/opt/simlaunch/lib",
            dependency: None,
        };
        renderer.render(&ctx)
    }

    #[test]
    fn test_single_job() {
        let host = HostDescriptor::load_leveler("micro", 8);
        let script = render(&LoadLevelerRenderer::single(), &host).unwrap();

        assert!(script.starts_with("# @ shell=/bin/bash\n"));
        assert!(script.contains("# @ error = /scratch/run/err_file_test_100\n"));
        assert!(script.contains("# @ output = /scratch/run/out_file_test_100\n"));
        assert!(script.contains("# @ job_type = MPICH\n"));
        assert!(script.contains("# @ class = micro\n"));
        assert!(script.contains("# @ notification = complete\n"));
        assert!(script.contains("# @ resources = ConsumableCpus(4)\n"));
        assert!(script.contains("# @ wall_clock_limit = 2:05:00\n"));
        assert!(script.contains("# @ node = 5\n"));
        assert!(script.contains("# @ tasks_per_node = 2\n"));
        assert!(script.contains("# @ first_node_tasks = 2\n"));
        assert_eq!(script.matches("# @ queue\n").count(), 1);
        assert!(!script.contains("step_name"));
        assert!(script.contains(
            "mpiexec.hydra -np 10 -ppn 2 -ordered-output -prepend-rank /scratch/run/NavierStokes test\n"
        ));
        assert!(script.ends_with("exit 0\n"));
    }

    #[test]
    fn test_multi_step_dependencies() {
        let host = HostDescriptor::load_leveler("micro", 8);
        let script = render(&LoadLevelerRenderer::multi_step("test", 3), &host).unwrap();

        assert_eq!(script.matches("# @ queue\n").count(), 3);
        assert!(script.contains("# @ step_name = test.0\n"));
        assert!(script.contains("# @ step_name = test.1\n# @ dependency = test.0 == 0\n"));
        assert!(script.contains("# @ step_name = test.2\n# @ dependency = test.1 == 0\n"));
        assert_eq!(script.matches("# @ dependency").count(), 2);
        assert!(script.contains("# @ output = /scratch/run/out_file_test_100.$(stepid)\n"));
        assert!(!script.contains("notification"));

        // Step 0 has no dependency
        let first_step = script.find("step_name = test.0").unwrap();
        let second_step = script.find("step_name = test.1").unwrap();
        assert!(!script[first_step..second_step].contains("dependency"));
    }

    #[test]
    fn test_missing_class_is_fatal() {
        let host = HostDescriptor::new(HostType::LoadLeveler).with_cores_per_node(8);
        assert!(matches!(
            render(&LoadLevelerRenderer::single(), &host),
            Err(SchedError::MissingHostField { .. })
        ));
    }
}
