//! Host command implementation.

use std::path::Path;

use anyhow::Result;
use console::style;

use super::common::{HostOverrides, load_config};
use crate::config::SimlaunchConfig;

/// Print the effective configuration as YAML.
pub async fn execute(config_path: Option<&Path>, overrides: &HostOverrides) -> Result<()> {
    let source = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => SimlaunchConfig::default_path().filter(|p| p.exists()),
    };
    let config = load_config(config_path, overrides).await?;

    match source {
        Some(path) => println!("# {}", style(path.display()).dim()),
        None => println!("# {}", style("built-in defaults").dim()),
    }
    print!("{}", serde_yaml_ng::to_string(&config)?);
    Ok(())
}
