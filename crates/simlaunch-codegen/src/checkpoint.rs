//! The simulation state file.
//!
//! One JSON document per simulation, `<work_dir>/<simname>.json`, holding the
//! parameters and the `iteration` counter. The generated program reads the
//! counter at start-up and rank 0 writes the final value back on exit; the
//! launcher only ever reads it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{CodegenError, CodegenResult};
use crate::parameters::Parameters;

/// Contents of a state file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Iteration the next job resumes from.
    pub iteration: i64,

    /// Parameters the simulation was initialized with.
    #[serde(default)]
    pub parameters: Parameters,
}

/// Handle on a simulation's state file.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// State file for `simname` inside `work_dir`.
    pub fn new(work_dir: impl AsRef<Path>, simname: &str) -> Self {
        Self {
            path: work_dir.as_ref().join(format!("{simname}.json")),
        }
    }

    /// Location on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file exists.
    pub async fn exists(&self) -> CodegenResult<bool> {
        Ok(fs::try_exists(&self.path).await?)
    }

    /// Create the file for a fresh simulation at iteration 0.
    ///
    /// Refuses to touch an existing file so a running simulation's
    /// checkpoint is never reset.
    pub async fn initialize(&self, parameters: &Parameters) -> CodegenResult<()> {
        if self.exists().await? {
            return Err(CodegenError::StateFileExists(
                self.path.display().to_string(),
            ));
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let state = CheckpointState {
            iteration: 0,
            parameters: parameters.clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&state)?).await?;
        tracing::info!("Initialized state file {}", self.path.display());
        Ok(())
    }

    /// Read the whole document.
    pub async fn load(&self) -> CodegenResult<CheckpointState> {
        let content = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read the checkpoint counter.
    pub async fn read_iteration(&self) -> CodegenResult<i64> {
        let state = self.load().await?;
        tracing::debug!(
            "State file {} is at iteration {}",
            self.path.display(),
            state.iteration
        );
        Ok(state.iteration)
    }

    /// Read the stored parameters.
    pub async fn read_parameters(&self) -> CodegenResult<Parameters> {
        Ok(self.load().await?.parameters)
    }
}
