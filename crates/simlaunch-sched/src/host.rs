//! Description of the machine jobs are launched on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SchedError, SchedResult};

/// The kind of host, which selects the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostType {
    /// Workstation: runs are executed directly with `mpirun`.
    #[serde(rename = "pc")]
    Pc,
    /// Grid Engine cluster (`qsub`).
    #[default]
    #[serde(rename = "cluster", alias = "SGE")]
    GridEngine,
    /// Slurm cluster (`sbatch`).
    #[serde(rename = "SLURM", alias = "slurm")]
    Slurm,
    /// IBM LoadLeveler (`llsubmit`).
    #[serde(rename = "IBMLoadLeveler", alias = "loadleveler")]
    LoadLeveler,
}

impl HostType {
    /// Configuration-file name of the host type.
    pub fn as_str(&self) -> &'static str {
        match self {
            HostType::Pc => "pc",
            HostType::GridEngine => "cluster",
            HostType::Slurm => "SLURM",
            HostType::LoadLeveler => "IBMLoadLeveler",
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostType {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pc" | "local" => Ok(HostType::Pc),
            "cluster" | "sge" => Ok(HostType::GridEngine),
            "slurm" => Ok(HostType::Slurm),
            "ibmloadleveler" | "loadleveler" => Ok(HostType::LoadLeveler),
            other => Err(SchedError::ConfigError(format!(
                "Unknown host type: '{other}'. Available: pc, cluster, SLURM, IBMLoadLeveler"
            ))),
        }
    }
}

/// E-mail notification settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// Recipient address.
    pub address: Option<String>,

    /// Scheduler-specific event selection (e.g. `END,FAIL` for Slurm).
    pub events: Option<String>,
}

/// The host jobs are launched on. Set once at start-up and never changed
/// while a chain is being submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostDescriptor {
    /// Backend selection.
    #[serde(rename = "type")]
    pub host_type: HostType,

    /// Queue, partition, parallel environment or class name.
    pub environment: Option<String>,

    /// Cores available on one node.
    #[serde(alias = "deltanprocs")]
    pub cores_per_node: u32,

    /// Notification settings.
    pub mail: MailSettings,
}

impl Default for HostDescriptor {
    fn default() -> Self {
        Self {
            host_type: HostType::default(),
            environment: None,
            cores_per_node: 1,
            mail: MailSettings::default(),
        }
    }
}

impl HostDescriptor {
    /// Host of the given type with one core per node.
    pub fn new(host_type: HostType) -> Self {
        Self {
            host_type,
            ..Default::default()
        }
    }

    /// Workstation host.
    pub fn pc(cores: u32) -> Self {
        Self::new(HostType::Pc).with_cores_per_node(cores)
    }

    /// Slurm host submitting to `partition`.
    pub fn slurm(partition: impl Into<String>, cores_per_node: u32) -> Self {
        Self::new(HostType::Slurm)
            .with_environment(partition)
            .with_cores_per_node(cores_per_node)
    }

    /// Grid Engine host using parallel environment `pe`.
    pub fn grid_engine(pe: impl Into<String>, cores_per_node: u32) -> Self {
        Self::new(HostType::GridEngine)
            .with_environment(pe)
            .with_cores_per_node(cores_per_node)
    }

    /// LoadLeveler host submitting to `class`.
    pub fn load_leveler(class: impl Into<String>, cores_per_node: u32) -> Self {
        Self::new(HostType::LoadLeveler)
            .with_environment(class)
            .with_cores_per_node(cores_per_node)
    }

    /// Set the queue/partition/class.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Set the cores per node.
    pub fn with_cores_per_node(mut self, cores: u32) -> Self {
        self.cores_per_node = cores;
        self
    }

    /// Set the notification settings.
    pub fn with_mail(mut self, mail: MailSettings) -> Self {
        self.mail = mail;
        self
    }

    /// Load from a YAML document.
    pub fn from_yaml(yaml: &str) -> SchedResult<Self> {
        let host: Self = serde_yaml_ng::from_str(yaml)?;
        host.validate()?;
        Ok(host)
    }

    /// Check the descriptor is usable at all.
    pub fn validate(&self) -> SchedResult<()> {
        if self.cores_per_node == 0 {
            return Err(SchedError::ConfigError(
                "cores_per_node must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The environment, or a configuration error naming the host type.
    pub fn require_environment(&self) -> SchedResult<&str> {
        self.environment
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| SchedError::MissingHostField {
                host_type: self.host_type.to_string(),
                field: "environment",
            })
    }
}
