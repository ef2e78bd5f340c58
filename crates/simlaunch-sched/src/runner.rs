//! External command execution.
//!
//! Every process the chain starts (submission commands and direct `mpirun`
//! runs) goes through a [`CommandRunner`], so tests can substitute a
//! [`MockRunner`] for the real scheduler tools.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::error::{SchedError, SchedResult};

/// A fully described external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Executable name or path.
    pub program: String,

    /// Arguments.
    pub args: Vec<String>,

    /// Working directory for the child.
    pub current_dir: Option<PathBuf>,

    /// Extra environment variables.
    pub env: Vec<(String, String)>,

    /// Redirect standard output to this file instead of capturing it.
    pub stdout_file: Option<PathBuf>,

    /// Redirect standard error to this file instead of capturing it.
    pub stderr_file: Option<PathBuf>,
}

impl Invocation {
    /// Create an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run in `dir`.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Redirect standard output and standard error to files.
    pub fn redirect(mut self, stdout: impl Into<PathBuf>, stderr: impl Into<PathBuf>) -> Self {
        self.stdout_file = Some(stdout.into());
        self.stderr_file = Some(stderr.into());
        self
    }

    /// The command as it would be typed in a shell.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited with status 0.
    pub success: bool,

    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,

    /// Captured standard output (empty when redirected).
    pub stdout: String,

    /// Captured standard error (empty when redirected).
    pub stderr: String,
}

impl CommandOutput {
    /// Human-readable exit status.
    pub fn status_string(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs external commands to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` and wait for it to finish.
    ///
    /// A command that cannot be started is an error; a command that runs and
    /// exits non-zero is reported through [`CommandOutput::success`].
    async fn run(&self, invocation: &Invocation) -> SchedResult<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> SchedResult<CommandOutput> {
        tracing::info!("Running: {}", invocation.command_line());

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(ref dir) = invocation.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }
        cmd.stdout(redirect_target(invocation.stdout_file.as_ref()).await?);
        cmd.stderr(redirect_target(invocation.stderr_file.as_ref()).await?);

        let output = cmd.output().await.map_err(|e| SchedError::CommandError {
            command: invocation.program.clone(),
            message: e.to_string(),
        })?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

async fn redirect_target(file: Option<&PathBuf>) -> SchedResult<Stdio> {
    Ok(match file {
        Some(path) => Stdio::from(File::create(path).await?.into_std().await),
        None => Stdio::piped(),
    })
}

/// Scripted runner for tests.
///
/// `sbatch` answers with `Submitted batch job <n>` where `n` counts up from
/// 1000; every other command succeeds silently. Calls are recorded in order.
#[derive(Debug)]
pub struct MockRunner {
    calls: Mutex<Vec<Invocation>>,
    call_count: AtomicUsize,
    job_counter: AtomicU64,
    fail_on: Option<usize>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    /// Runner where every command succeeds.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            job_counter: AtomicU64::new(1000),
            fail_on: None,
        }
    }

    /// Make the `index`-th call (0-based) exit with status 1.
    pub fn failing_on(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }

    /// Invocations received so far.
    pub async fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, invocation: &Invocation) -> SchedResult<CommandOutput> {
        tracing::debug!("Mock run: {}", invocation.command_line());
        self.calls.lock().await.push(invocation.clone());

        let index = self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(index) {
            return Ok(CommandOutput {
                success: false,
                code: Some(1),
                stdout: String::new(),
                stderr: format!("{}: mock failure", invocation.program),
            });
        }

        let stdout = if invocation.program == "sbatch" {
            let id = self.job_counter.fetch_add(1, Ordering::SeqCst);
            format!("Submitted batch job {id}\n")
        } else {
            String::new()
        };

        Ok(CommandOutput {
            success: true,
            code: Some(0),
            stdout,
            stderr: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let inv = Invocation::new("sbatch")
            .arg("run_test_0.sh")
            .current_dir("/scratch");
        assert_eq!(inv.command_line(), "sbatch run_test_0.sh");
        assert_eq!(inv.current_dir, Some(PathBuf::from("/scratch")));
    }

    #[tokio::test]
    async fn test_mock_runner_sbatch_ids() {
        let runner = MockRunner::new();
        let first = runner.run(&Invocation::new("sbatch")).await.unwrap();
        let second = runner.run(&Invocation::new("sbatch")).await.unwrap();
        assert_eq!(first.stdout.trim(), "Submitted batch job 1000");
        assert_eq!(second.stdout.trim(), "Submitted batch job 1001");
        assert_eq!(runner.calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_runner_failure() {
        let runner = MockRunner::new().failing_on(1);
        assert!(runner.run(&Invocation::new("qsub")).await.unwrap().success);
        let failed = runner.run(&Invocation::new("qsub")).await.unwrap();
        assert!(!failed.success);
        assert_eq!(failed.status_string(), "exit status 1");
        assert!(runner.run(&Invocation::new("qsub")).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let output = SystemRunner
            .run(&Invocation::new("sh").args(["-c", "echo hello; exit 3"]))
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_system_runner_redirects_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let err = dir.path().join("err");
        let output = SystemRunner
            .run(
                &Invocation::new("sh")
                    .args(["-c", "echo to-out; echo to-err >&2"])
                    .redirect(&out, &err),
            )
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(std::fs::read_to_string(out).unwrap(), "to-out\n");
        assert_eq!(std::fs::read_to_string(err).unwrap(), "to-err\n");
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let err = SystemRunner
            .run(&Invocation::new("simlaunch-no-such-program"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedError::CommandError { .. }));
    }
}
