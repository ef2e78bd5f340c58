//! Backend script generators.
//!
//! Each backend turns the same [`Layout`] into its own directive dialect.
//! The arithmetic lives in [`crate::partition`]; the renderers only format.

pub mod loadleveler;
pub mod local;
pub mod sge;
pub mod slurm;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SchedResult;
use crate::host::HostDescriptor;
use crate::partition::{Layout, ResourceRequest};

pub use loadleveler::LoadLevelerRenderer;
pub use local::LocalRenderer;
pub use sge::GridEngineRenderer;
pub use slurm::SlurmRenderer;

/// Wall-clock limit of one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallTime {
    pub hours: u32,
    pub minutes: u32,
}

impl WallTime {
    /// Create a limit; minutes beyond 59 carry into hours.
    pub fn new(hours: u32, minutes: u32) -> Self {
        Self {
            hours: hours.saturating_add(minutes / 60),
            minutes: minutes % 60,
        }
    }
}

impl fmt::Display for WallTime {
    /// `H:MM:00`, accepted by every supported scheduler.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:00", self.hours, self.minutes)
    }
}

/// Per-job run metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    /// Job name, also the name suffix of the entry.
    pub name: String,

    /// Executable name, relative to the working directory.
    pub program: String,

    /// Program arguments.
    pub args: Vec<String>,

    /// Standard output file.
    pub out_file: PathBuf,

    /// Standard error file.
    pub err_file: PathBuf,

    /// Wall-clock limit.
    pub wall_time: WallTime,
}

impl JobSpec {
    /// `./<program> <args...>`
    pub fn command_line(&self) -> String {
        self.command_line_from(Path::new("."))
    }

    /// The command with the program resolved against `dir`.
    pub fn command_line_from(&self, dir: &Path) -> String {
        std::iter::once(dir.join(&self.program).display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a submission returns, used as the next job's dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobHandle {
    /// Grid Engine job name.
    Name(String),
    /// Slurm numeric job id.
    Id(u64),
    /// LoadLeveler step name.
    Step(String),
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobHandle::Name(name) | JobHandle::Step(name) => f.write_str(name),
            JobHandle::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Everything a renderer needs for one script.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub host: &'a HostDescriptor,
    pub request: ResourceRequest,
    pub layout: Layout,
    pub job: &'a JobSpec,
    pub work_dir: &'a Path,
    /// Runtime library search path (`lib_dir` first).
    pub library_path: &'a str,
    /// Handle of the previous job in the chain.
    pub dependency: Option<&'a JobHandle>,
}

/// Renders a backend-specific submission script.
pub trait ScriptRenderer: Send + Sync {
    /// Produce the script text. Missing host fields are reported here,
    /// before anything is written.
    fn render(&self, ctx: &RenderContext<'_>) -> SchedResult<String>;
}

/// Script file name of the entry with the given suffix.
pub fn script_file_name(suffix: &str) -> String {
    format!("run_{suffix}.sh")
}

/// Sanitize a job name for scheduler directives.
pub(crate) fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect()
}

/// Trailer shared by every script.
pub(crate) fn push_footer(script: &mut String) {
    script.push_str("echo \"End time is `date`\"\n");
    script.push_str("exit 0\n");
}
