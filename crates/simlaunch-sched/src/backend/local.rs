//! Direct execution on a workstation.
//!
//! Nothing is queued: each chain entry is an `mpirun` child process run to
//! completion before the next one starts. In dry-run mode the same command
//! is written to a script instead.

use std::path::Path;

use crate::backend::{JobSpec, RenderContext, ScriptRenderer, push_footer};
use crate::error::SchedResult;
use crate::partition::ResourceRequest;
use crate::runner::Invocation;

/// Renderer for `pc` hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalRenderer;

/// `mpirun -np <P> -x OMP_NUM_THREADS=<T>` followed by the job command.
pub fn mpirun_args(request: &ResourceRequest, job: &JobSpec) -> Vec<String> {
    let mut args = vec![
        "-np".to_string(),
        request.process_count.to_string(),
        "-x".to_string(),
        format!("OMP_NUM_THREADS={}", request.threads_per_process),
        format!("./{}", job.program),
    ];
    args.extend(job.args.iter().cloned());
    args
}

/// Append `extra` to an existing `LD_LIBRARY_PATH` value.
pub fn extend_library_path(current: Option<&str>, extra: &str) -> String {
    match current {
        Some(existing) if !existing.is_empty() => format!("{existing}:{extra}"),
        _ => extra.to_string(),
    }
}

/// The process to start for one entry, run inside `work_dir` with output
/// redirected to the job's files.
pub fn invocation(ctx: &RenderContext<'_>) -> Invocation {
    let current = std::env::var("LD_LIBRARY_PATH").ok();
    let library_path = extend_library_path(current.as_deref(), ctx.library_path);
    Invocation::new("mpirun")
        .args(mpirun_args(&ctx.request, ctx.job))
        .current_dir(ctx.work_dir)
        .env("LD_LIBRARY_PATH", library_path)
        .redirect(
            resolve(ctx.work_dir, &ctx.job.out_file),
            resolve(ctx.work_dir, &ctx.job.err_file),
        )
}

fn resolve(work_dir: &Path, file: &Path) -> std::path::PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        work_dir.join(file)
    }
}

impl ScriptRenderer for LocalRenderer {
    fn render(&self, ctx: &RenderContext<'_>) -> SchedResult<String> {
        let mut script = String::new();
        script.push_str("#!/bin/bash\n");
        script.push_str(&format!("cd {}\n", ctx.work_dir.display()));
        script.push_str(&format!(
            "export LD_LIBRARY_PATH=${{LD_LIBRARY_PATH:+$LD_LIBRARY_PATH:}}{}\n",
            ctx.library_path
        ));
        script.push_str("echo \"Start time is `date`\"\n");
        script.push_str(&format!(
            "mpirun {} > {} 2> {}\n",
            mpirun_args(&ctx.request, ctx.job).join(" "),
            ctx.job.out_file.display(),
            ctx.job.err_file.display(),
        ));
        push_footer(&mut script);
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support::{job, layout};
    use crate::host::HostDescriptor;
    use std::path::PathBuf;

    #[test]
    fn test_mpirun_args() {
        let request = ResourceRequest::new(4, 2).unwrap();
        assert_eq!(
            mpirun_args(&request, &job("test_0")).join(" "),
            "-np 4 -x OMP_NUM_THREADS=2 ./NavierStokes test"
        );
    }

    #[test]
    fn test_extend_library_path() {
        assert_eq!(extend_library_path(None, "/opt/lib"), "/opt/lib");
        assert_eq!(extend_library_path(Some(""), "/opt/lib"), "/opt/lib");
        assert_eq!(
            extend_library_path(Some("/usr/lib"), "/opt/lib"),
            "/usr/lib:/opt/lib"
        );
    }

    #[test]
    fn test_invocation_and_script() {
        let host = HostDescriptor::pc(8);
        let job = job("test_0");
        let ctx = RenderContext {
            host: &host,
            request: ResourceRequest::new(2, 2).unwrap(),
            layout: layout(1, 2, 2),
            job: &job,
            work_dir: Path::new("/scratch/run"),
            library_path: "/opt/simlaunch/lib",
            dependency: None,
        };

        let inv = invocation(&ctx);
        assert_eq!(inv.program, "mpirun");
        assert_eq!(inv.current_dir, Some(PathBuf::from("/scratch/run")));
        assert_eq!(
            inv.stdout_file,
            Some(PathBuf::from("/scratch/run/out_file_test_0"))
        );
        assert!(
            inv.env
                .iter()
                .any(|(k, v)| k == "LD_LIBRARY_PATH" && v.ends_with("/opt/simlaunch/lib"))
        );

        let script = LocalRenderer.render(&ctx).unwrap();
        assert!(script.starts_with("#!/bin/bash\ncd /scratch/run\n"));
        assert!(script.contains(
            "mpirun -np 2 -x OMP_NUM_THREADS=2 ./NavierStokes test > out_file_test_0 2> err_file_test_0\n"
        ));
        assert!(script.ends_with("exit 0\n"));
    }
}
