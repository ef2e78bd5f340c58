//! Submitting a chain of dependent jobs.
//!
//! Job `j` of a chain of `N` continues the simulation from iteration
//! `iter0 + j * niter_todo`, where `iter0` is read once from the state file.
//! Submissions happen strictly in order and the first failure stops the
//! chain; nothing is retried.

use std::path::{Path, PathBuf};

use serde::Serialize;
use simlaunch_codegen::{StateFile, ToolchainConfig};
use tokio::fs;

use crate::backend::{
    GridEngineRenderer, JobHandle, JobSpec, LoadLevelerRenderer, LocalRenderer, RenderContext,
    ScriptRenderer, SlurmRenderer, WallTime, local, script_file_name, slurm,
};
use crate::error::{SchedError, SchedResult};
use crate::host::{HostDescriptor, HostType};
use crate::partition::{Layout, LayoutWarning, Partition, ResourceRequest, partition};
use crate::runner::{CommandRunner, Invocation};

/// What the caller wants launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRequest {
    /// Simulation name; selects `<simname>.json` and names the jobs.
    pub simname: String,

    /// Compiled program, relative to the working directory.
    pub program: String,

    /// Processes and threads per job.
    pub request: ResourceRequest,

    /// Number of chained jobs.
    pub njobs: u32,

    /// Wall-clock limit per job.
    pub wall_time: WallTime,

    /// Standard output file prefix; `_<suffix>` is appended per job.
    pub out_prefix: String,

    /// Standard error file prefix; `_<suffix>` is appended per job.
    pub err_prefix: String,

    /// Write scripts without submitting or running anything.
    pub dry_run: bool,
}

impl ChainRequest {
    /// One ten-minute job with the default output file prefixes.
    pub fn new(
        simname: impl Into<String>,
        program: impl Into<String>,
        request: ResourceRequest,
    ) -> Self {
        Self {
            simname: simname.into(),
            program: program.into(),
            request,
            njobs: 1,
            wall_time: WallTime::new(0, 10),
            out_prefix: "out_file".to_string(),
            err_prefix: "err_file".to_string(),
            dry_run: false,
        }
    }

    /// Set the number of jobs.
    pub fn with_njobs(mut self, njobs: u32) -> Self {
        self.njobs = njobs;
        self
    }

    /// Set the wall-clock limit.
    pub fn with_wall_time(mut self, wall_time: WallTime) -> Self {
        self.wall_time = wall_time;
        self
    }

    /// Set the output/error file prefixes.
    pub fn with_output_prefixes(
        mut self,
        out_prefix: impl Into<String>,
        err_prefix: impl Into<String>,
    ) -> Self {
        self.out_prefix = out_prefix.into();
        self.err_prefix = err_prefix.into();
        self
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn job_spec(&self, suffix: &str) -> JobSpec {
        JobSpec {
            name: suffix.to_string(),
            program: self.program.clone(),
            args: vec![self.simname.clone()],
            out_file: PathBuf::from(format!("{}_{suffix}", self.out_prefix)),
            err_file: PathBuf::from(format!("{}_{suffix}", self.err_prefix)),
            wall_time: self.wall_time,
        }
    }
}

/// One job of a chain, as written or submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainEntry {
    /// Position in the chain, from 0.
    pub index: u32,

    /// First iteration this job simulates.
    pub iteration_offset: i64,

    /// `<simname>_<iteration_offset>`
    pub suffix: String,

    /// Script written for the job; `None` for live direct runs.
    pub script_path: Option<PathBuf>,

    pub out_file: PathBuf,
    pub err_file: PathBuf,

    /// Handle returned by the scheduler; `None` when nothing was submitted
    /// or the backend returns nothing usable.
    pub handle: Option<JobHandle>,
}

/// Outcome of a successful chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub host_type: HostType,
    pub layout: Layout,
    #[serde(skip)]
    pub warning: Option<LayoutWarning>,
    pub iter0: i64,
    pub niter_todo: i64,
    pub dry_run: bool,
    pub entries: Vec<ChainEntry>,
}

/// Checkpoint offsets of `njobs` consecutive jobs.
pub fn iteration_offsets(iter0: i64, niter_todo: i64, njobs: u32) -> Vec<i64> {
    (0..i64::from(njobs)).map(|j| iter0 + j * niter_todo).collect()
}

/// Deterministic job name for the job starting at `offset`.
pub fn name_suffix(simname: &str, offset: i64) -> String {
    format!("{simname}_{offset}")
}

/// Plans and submits job chains on one host.
pub struct JobChain<'a> {
    host: &'a HostDescriptor,
    toolchain: &'a ToolchainConfig,
    work_dir: PathBuf,
    runner: &'a dyn CommandRunner,
}

/// Values shared by every entry of one chain.
struct ChainPlan<'a> {
    request: &'a ChainRequest,
    layout: Layout,
    library_path: String,
    offsets: Vec<i64>,
}

impl<'a> JobChain<'a> {
    /// Create a chain runner for `host`, working in `work_dir`.
    pub fn new(
        host: &'a HostDescriptor,
        toolchain: &'a ToolchainConfig,
        work_dir: impl Into<PathBuf>,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            host,
            toolchain,
            work_dir: work_dir.into(),
            runner,
        }
    }

    /// Working directory holding the program, state file and scripts.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Validate `request` against the host without touching the filesystem.
    ///
    /// Lets callers reject bad requests before spending time on a build.
    pub fn check(&self, request: &ChainRequest) -> SchedResult<Partition> {
        if request.njobs == 0 {
            return Err(SchedError::ConfigError(
                "njobs must be at least 1".to_string(),
            ));
        }
        self.host.validate()?;
        let partitioned = partition(&request.request, self.host.cores_per_node)?;
        if self.host.host_type != HostType::Pc {
            self.host.require_environment()?;
        }
        Ok(partitioned)
    }

    /// Run the whole chain.
    ///
    /// Configuration problems are reported before any script is written or
    /// any command runs. A failing submission aborts the remaining entries;
    /// entries already submitted are left to the scheduler.
    pub async fn run(&self, request: &ChainRequest) -> SchedResult<ChainReport> {
        let partitioned = self.check(request)?;
        if let Some(warning) = partitioned.warning {
            tracing::warn!("{warning}");
        }
        tracing::debug!("Layout: {:?}", partitioned.layout);

        let state = StateFile::new(&self.work_dir, &request.simname);
        let iter0 = state.read_iteration().await?;
        let mut parameters = state.read_parameters().await?;
        let niter_todo = parameters.prepare_for_chain()?;

        let plan = ChainPlan {
            request,
            layout: partitioned.layout,
            library_path: self.toolchain.runtime_library_path_string(),
            offsets: iteration_offsets(iter0, niter_todo, request.njobs),
        };

        let entries = match self.host.host_type {
            HostType::Pc => self.run_direct(&plan).await?,
            HostType::GridEngine => self.submit_each(&plan, &GridEngineRenderer).await?,
            HostType::Slurm => self.submit_each(&plan, &SlurmRenderer).await?,
            HostType::LoadLeveler => self.submit_load_leveler(&plan).await?,
        };

        Ok(ChainReport {
            host_type: self.host.host_type,
            layout: partitioned.layout,
            warning: partitioned.warning,
            iter0,
            niter_todo,
            dry_run: request.dry_run,
            entries,
        })
    }

    fn context<'c>(
        &'c self,
        plan: &'c ChainPlan<'_>,
        job: &'c JobSpec,
        dependency: Option<&'c JobHandle>,
    ) -> RenderContext<'c> {
        RenderContext {
            host: self.host,
            request: plan.request.request,
            layout: plan.layout,
            job,
            work_dir: &self.work_dir,
            library_path: &plan.library_path,
            dependency,
        }
    }

    async fn write_script(&self, suffix: &str, script: &str) -> SchedResult<PathBuf> {
        let path = self.work_dir.join(script_file_name(suffix));
        fs::write(&path, script).await?;
        tracing::debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Run a submission command in the working directory, failing on a
    /// non-zero exit.
    async fn submit(&self, invocation: Invocation) -> SchedResult<String> {
        let invocation = invocation.current_dir(&self.work_dir);
        let output = self.runner.run(&invocation).await?;
        if !output.success {
            let message = match output.stderr.trim() {
                "" => output.status_string(),
                stderr => stderr.to_string(),
            };
            return Err(SchedError::SubmitError {
                command: invocation.program,
                message,
            });
        }
        Ok(output.stdout)
    }

    /// `pc` hosts: run each entry to completion, in order.
    async fn run_direct(&self, plan: &ChainPlan<'_>) -> SchedResult<Vec<ChainEntry>> {
        let request = plan.request;
        let mut entries = Vec::with_capacity(plan.offsets.len());

        for (index, &offset) in (0_u32..).zip(&plan.offsets) {
            let suffix = name_suffix(&request.simname, offset);
            let job = request.job_spec(&suffix);
            let ctx = self.context(plan, &job, None);

            let script_path = if request.dry_run {
                let script = LocalRenderer.render(&ctx)?;
                Some(self.write_script(&suffix, &script).await?)
            } else {
                let invocation = local::invocation(&ctx);
                let output = self.runner.run(&invocation).await?;
                if !output.success {
                    return Err(SchedError::ExecutionFailed {
                        command: invocation.command_line(),
                        status: output.status_string(),
                    });
                }
                None
            };

            entries.push(ChainEntry {
                index,
                iteration_offset: offset,
                suffix,
                script_path,
                out_file: self.work_dir.join(&job.out_file),
                err_file: self.work_dir.join(&job.err_file),
                handle: None,
            });
        }
        Ok(entries)
    }

    /// Grid Engine and Slurm: one script and one submission per entry, each
    /// depending on the previous entry's handle.
    async fn submit_each(
        &self,
        plan: &ChainPlan<'_>,
        renderer: &dyn ScriptRenderer,
    ) -> SchedResult<Vec<ChainEntry>> {
        let request = plan.request;
        let mut entries: Vec<ChainEntry> = Vec::with_capacity(plan.offsets.len());
        let mut dependency: Option<JobHandle> = None;

        for (index, &offset) in (0_u32..).zip(&plan.offsets) {
            let suffix = name_suffix(&request.simname, offset);
            let job = request.job_spec(&suffix);
            let script = renderer.render(&self.context(plan, &job, dependency.as_ref()))?;
            let script_path = self.write_script(&suffix, &script).await?;
            let script_name = script_file_name(&suffix);

            let handle = match self.host.host_type {
                // Job names are known up front, so dry-run scripts chain too.
                HostType::GridEngine => {
                    if !request.dry_run {
                        self.submit(Invocation::new("qsub").arg(&script_name)).await?;
                    }
                    dependency = Some(JobHandle::Name(suffix.clone()));
                    (!request.dry_run).then(|| JobHandle::Name(suffix.clone()))
                }
                _ if request.dry_run => None,
                _ => {
                    let stdout = self.submit(Invocation::new("sbatch").arg(&script_name)).await?;
                    let id = slurm::parse_sbatch_output(&stdout)?;
                    tracing::info!("Submitted {suffix} as job {id}");
                    dependency = Some(JobHandle::Id(id));
                    dependency.clone()
                }
            };

            entries.push(ChainEntry {
                index,
                iteration_offset: offset,
                suffix,
                script_path: Some(script_path),
                out_file: self.work_dir.join(&job.out_file),
                err_file: self.work_dir.join(&job.err_file),
                handle,
            });
        }
        Ok(entries)
    }

    /// LoadLeveler: the whole chain is one job file named after the first
    /// entry, submitted once.
    async fn submit_load_leveler(&self, plan: &ChainPlan<'_>) -> SchedResult<Vec<ChainEntry>> {
        let request = plan.request;
        let iter0 = plan.offsets.first().copied().unwrap_or_default();
        let suffix = name_suffix(&request.simname, iter0);
        let job = request.job_spec(&suffix);

        let renderer = if request.njobs > 1 {
            LoadLevelerRenderer::multi_step(&request.simname, request.njobs)
        } else {
            LoadLevelerRenderer::single()
        };
        let script = renderer.render(&self.context(plan, &job, None))?;
        let script_path = self.write_script(&suffix, &script).await?;

        if !request.dry_run {
            self.submit(Invocation::new("llsubmit").arg(script_path.display().to_string()))
                .await?;
        }

        let entries = (0_u32..)
            .zip(&plan.offsets)
            .map(|(index, &offset)| {
                let handle = (!request.dry_run && request.njobs > 1).then(|| {
                    JobHandle::Step(LoadLevelerRenderer::step_name(&request.simname, index))
                });
                // Steps write `<file>.<step number>`.
                let step_file = |file: &Path| {
                    if request.njobs > 1 {
                        self.work_dir.join(format!("{}.{index}", file.display()))
                    } else {
                        self.work_dir.join(file)
                    }
                };
                ChainEntry {
                    index,
                    iteration_offset: offset,
                    suffix: name_suffix(&request.simname, offset),
                    script_path: Some(script_path.clone()),
                    out_file: step_file(&job.out_file),
                    err_file: step_file(&job.err_file),
                    handle,
                }
            })
            .collect();
        Ok(entries)
    }
}
