//! Deciding whether a compiled program can be reused, and rebuilding it.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::process::Command;

use crate::assembler::{ProgramSource, SourceAssembler};
use crate::error::{CodegenError, CodegenResult};
use crate::parameters::Parameters;
use crate::toolchain::ToolchainConfig;

/// Header whose presence marks a usable support library install.
const SENTINEL_HEADER: &str = "base.hpp";

/// What [`Builder::ensure_built`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The existing artifact is newer than the install date.
    Reused(PathBuf),
    /// The program was assembled and compiled.
    Rebuilt(PathBuf),
}

impl BuildOutcome {
    /// Path of the usable artifact.
    pub fn artifact(&self) -> &Path {
        match self {
            BuildOutcome::Reused(p) | BuildOutcome::Rebuilt(p) => p,
        }
    }
}

/// Whether `artifact` must be (re)built.
///
/// True when the artifact is missing or was created strictly before
/// `install_date`. Filesystems without birth time fall back to mtime.
pub async fn should_rebuild(artifact: &Path, install_date: DateTime<Utc>) -> CodegenResult<bool> {
    let metadata = match fs::metadata(artifact).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e.into()),
    };
    let created: SystemTime = metadata.created().or_else(|_| metadata.modified())?;
    Ok(DateTime::<Utc>::from(created) < install_date)
}

/// Compiles generated programs with a fixed toolchain.
pub struct Builder<'a> {
    toolchain: &'a ToolchainConfig,
    build_dir: PathBuf,
}

impl<'a> Builder<'a> {
    /// Builder compiling in `build_dir`.
    pub fn new(toolchain: &'a ToolchainConfig, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            toolchain,
            build_dir: build_dir.into(),
        }
    }

    /// Write the source and compile it. Returns the artifact path inside the
    /// build directory.
    pub async fn compile(
        &self,
        source: &ProgramSource,
        parameters: &Parameters,
    ) -> CodegenResult<PathBuf> {
        let header = self.toolchain.header_dir.join(SENTINEL_HEADER);
        if !fs::try_exists(&header).await? {
            return Err(CodegenError::MissingHeader(header.display().to_string()));
        }

        SourceAssembler::new(parameters)
            .write_src(source, &self.build_dir)
            .await?;

        let atoms = self.toolchain.compile_command(&source.name);
        let command_line = atoms.join(" ");
        tracing::info!("Compiling code with command: {}", command_line);

        let status = Command::new(&atoms[0])
            .args(&atoms[1..])
            .current_dir(&self.build_dir)
            .status()
            .await
            .map_err(|e| CodegenError::CommandError {
                command: self.toolchain.compiler.clone(),
                message: e.to_string(),
            })?;

        if !status.success() {
            return Err(CodegenError::CompilerFailed {
                command: command_line,
                status: status.to_string(),
            });
        }

        Ok(self.build_dir.join(&source.name))
    }

    /// Reuse the artifact in `work_dir` if it is fresh, otherwise compile and
    /// copy the result into `work_dir`.
    pub async fn ensure_built(
        &self,
        source: &ProgramSource,
        parameters: &Parameters,
        work_dir: &Path,
    ) -> CodegenResult<BuildOutcome> {
        fs::create_dir_all(work_dir).await?;
        let target = work_dir.join(&source.name);

        if !should_rebuild(&target, self.toolchain.install_date).await? {
            tracing::debug!("Reusing {}", target.display());
            return Ok(BuildOutcome::Reused(target));
        }

        // An overwritten file keeps its old creation time.
        remove_if_exists(&target).await?;

        let built = self.compile(source, parameters).await?;
        if !same_dir(&self.build_dir, work_dir).await? {
            fs::copy(&built, &target).await?;
            tracing::debug!("Copied {} to {}", built.display(), target.display());
        }
        Ok(BuildOutcome::Rebuilt(target))
    }
}

async fn remove_if_exists(path: &Path) -> CodegenResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn same_dir(a: &Path, b: &Path) -> CodegenResult<bool> {
    Ok(fs::canonicalize(a).await? == fs::canonicalize(b).await?)
}
