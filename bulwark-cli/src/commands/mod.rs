//! Command handlers -- one module per subcommand

pub mod config;
pub mod run;

use std::path::Path;

use tracing::info;

use bulwark_core::config::{BulwarkConfig, DEFAULT_CONFIG_PATH};

use crate::error::CliError;

/// Effective configuration and where it came from.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: BulwarkConfig,
    pub source: String,
}

/// Load the configuration for a command.
///
/// An explicit `--config` path must exist. Without one, the default path is
/// used when present and the built-in defaults otherwise; env overrides and
/// validation apply in every case.
pub async fn load_config(path: Option<&Path>) -> Result<LoadedConfig, CliError> {
    let path = match path {
        Some(path) => path,
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if !tokio::fs::try_exists(default).await.unwrap_or(false) {
                info!(path = DEFAULT_CONFIG_PATH, "no configuration file, using defaults");
                return Ok(LoadedConfig {
                    config: BulwarkConfig::load_defaults().await?,
                    source: "(built-in defaults)".to_owned(),
                });
            }
            default
        }
    };
    Ok(LoadedConfig {
        config: BulwarkConfig::load(path).await?,
        source: path.display().to_string(),
    })
}
