//! Slurm batch script templates.

use crate::backend::{JobHandle, RenderContext, push_footer, sanitize_name};

/// Generate a Slurm batch script for one chain entry.
pub fn generate_batch_script(ctx: &RenderContext<'_>, partition: &str) -> String {
    let job = ctx.job;
    let layout = &ctx.layout;
    let threads = ctx.request.threads_per_process;
    let mut script = String::new();

    // Login shell so site profiles (modules) are loaded
    script.push_str("#!/bin/bash -l\n");

    // Slurm directives
    script.push_str(&format!("#SBATCH -J {}\n", sanitize_name(&job.name)));
    script.push_str("#SBATCH -D ./\n");
    script.push_str(&format!("#SBATCH -e {}\n", job.err_file.display()));
    script.push_str(&format!("#SBATCH -o {}\n", job.out_file.display()));
    script.push_str(&format!("#SBATCH --partition={partition}\n"));
    script.push_str(&format!("#SBATCH --nodes={}\n", layout.node_count));
    script.push_str(&format!("#SBATCH --ntasks={}\n", ctx.request.process_count));
    script.push_str(&format!(
        "#SBATCH --ntasks-per-node={}\n",
        layout.processes_per_node
    ));
    script.push_str(&format!("#SBATCH --cpus-per-task={threads}\n"));

    let mail_type = ctx.host.mail.events.as_deref().unwrap_or("none");
    script.push_str(&format!("#SBATCH --mail-type={mail_type}\n"));
    if let Some(ref address) = ctx.host.mail.address {
        script.push_str(&format!("#SBATCH --mail-user={address}\n"));
    }

    script.push_str(&format!("#SBATCH --time={}\n", job.wall_time));

    if let Some(JobHandle::Id(previous)) = ctx.dependency {
        script.push_str(&format!("#SBATCH --dependency=afterok:{previous}\n"));
    }

    // Environment setup
    if threads > 1 {
        script.push_str(&format!("export OMP_NUM_THREADS={threads}\n"));
        script.push_str("export OMP_PLACES=cores\n");
    }
    script.push_str(&format!(
        "export LD_LIBRARY_PATH={}:${{LD_LIBRARY_PATH}}\n",
        ctx.library_path
    ));

    script.push_str("echo \"Start time is `date`\"\n");
    script.push_str(&format!("cd {}\n", ctx.work_dir.display()));
    script.push_str(&format!("srun {}\n", job.command_line()));
    push_footer(&mut script);

    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support::{job, layout};
    use crate::backend::{JobSpec, ScriptRenderer, SlurmRenderer};
    use crate::error::SchedError;
    use crate::host::{HostDescriptor, HostType, MailSettings};
    use crate::partition::ResourceRequest;
    use std::path::Path;

    fn ctx<'a>(
        host: &'a HostDescriptor,
        job: &'a JobSpec,
        threads: u32,
        dependency: Option<&'a JobHandle>,
    ) -> RenderContext<'a> {
        RenderContext {
            host,
            request: ResourceRequest::new(10, threads).unwrap(),
            layout: layout(5, 2, 2),
            job,
            work_dir: Path::new("/scratch/run"),
            library_path: "/opt/simlaunch/lib",
            dependency,
        }
    }

    #[test]
    fn test_generate_batch_script() {
        let host = HostDescriptor::slurm("general", 8);
        let job = job("test_100");
        let script = SlurmRenderer.render(&ctx(&host, &job, 4, None)).unwrap();

        assert!(script.starts_with("#!/bin/bash -l\n"));
        assert!(script.contains("#SBATCH -J test_100\n"));
        assert!(script.contains("#SBATCH -D ./\n"));
        assert!(script.contains("#SBATCH -e err_file_test_100\n"));
        assert!(script.contains("#SBATCH -o out_file_test_100\n"));
        assert!(script.contains("#SBATCH --partition=general\n"));
        assert!(script.contains("#SBATCH --nodes=5\n"));
        assert!(script.contains("#SBATCH --ntasks-per-node=2\n"));
        assert!(script.contains("#SBATCH --cpus-per-task=4\n"));
        assert!(script.contains("#SBATCH --mail-type=none\n"));
        assert!(script.contains("#SBATCH --time=2:05:00\n"));
        assert!(script.contains("export OMP_NUM_THREADS=4\nexport OMP_PLACES=cores\n"));
        assert!(script.contains("export LD_LIBRARY_PATH=/opt/simlaunch/lib:${LD_LIBRARY_PATH}\n"));
        assert!(script.contains("cd /scratch/run\nsrun ./NavierStokes test\n"));
        assert!(!script.contains("--dependency"));
        assert!(!script.contains("--mail-user"));
    }

    #[test]
    fn test_single_thread_skips_omp_exports() {
        let host = HostDescriptor::slurm("general", 8);
        let job = job("test_100");
        let script = SlurmRenderer.render(&ctx(&host, &job, 1, None)).unwrap();
        assert!(!script.contains("OMP_NUM_THREADS"));
    }

    #[test]
    fn test_dependency_and_mail() {
        let host = HostDescriptor::slurm("general", 8).with_mail(MailSettings {
            address: Some("someone@example.org".to_string()),
            events: Some("END,FAIL".to_string()),
        });
        let job = job("test_150");
        let previous = JobHandle::Id(1234);
        let script = SlurmRenderer
            .render(&ctx(&host, &job, 4, Some(&previous)))
            .unwrap();
        assert!(script.contains("#SBATCH --dependency=afterok:1234\n"));
        assert!(script.contains("#SBATCH --mail-type=END,FAIL\n"));
        assert!(script.contains("#SBATCH --mail-user=someone@example.org\n"));
    }

    #[test]
    fn test_missing_partition() {
        let host = HostDescriptor::new(HostType::Slurm).with_cores_per_node(8);
        let job = job("test_100");
        assert!(matches!(
            SlurmRenderer.render(&ctx(&host, &job, 4, None)),
            Err(SchedError::MissingHostField { .. })
        ));
    }
}
