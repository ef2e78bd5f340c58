//! Host and toolchain configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use simlaunch_codegen::ToolchainConfig;
use simlaunch_sched::HostDescriptor;

/// Contents of `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimlaunchConfig {
    /// Machine jobs are launched on.
    pub host: HostDescriptor,

    /// Compiler and support library locations.
    pub toolchain: ToolchainConfig,
}

impl SimlaunchConfig {
    /// `<config_dir>/simlaunch/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("simlaunch").join("config.yaml"))
    }

    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml).context("Invalid configuration")?;
        config.host.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given (it must exist), otherwise the default
    /// location if present, otherwise built-in defaults.
    pub async fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => path,
                _ => {
                    tracing::debug!("No configuration file, using defaults");
                    return Ok((Self::default(), None));
                }
            },
        };

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read configuration: {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("In configuration file {}", path.display()))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok((config, Some(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simlaunch_sched::HostType;

    #[test]
    fn test_from_yaml() {
        let yaml = r"
host:
  type: SLURM
  environment: general
  cores_per_node: 40
toolchain:
  compiler: g++
  lib_dir: /opt/simlaunch/lib
  install_date: 2024-01-01T00:00:00Z
";
        let config = SimlaunchConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.host.host_type, HostType::Slurm);
        assert_eq!(config.host.cores_per_node, 40);
        assert_eq!(config.toolchain.compiler, "g++");
        assert_eq!(config.toolchain.lib_dir, PathBuf::from("/opt/simlaunch/lib"));
        // Unset fields keep their defaults
        assert_eq!(config.toolchain.libraries, vec!["hdf5".to_string()]);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = SimlaunchConfig::from_yaml("{}").unwrap();
        assert_eq!(config, SimlaunchConfig::default());
    }

    #[test]
    fn test_invalid_host_rejected() {
        assert!(SimlaunchConfig::from_yaml("host:\n  cores_per_node: 0\n").is_err());
    }

    #[tokio::test]
    async fn test_load_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(SimlaunchConfig::load(Some(&missing)).await.is_err());
    }
}
