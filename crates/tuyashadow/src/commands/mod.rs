//! Command handlers and the config-to-poller plumbing they share.

pub mod config_cmd;
pub mod read;
pub mod sensors;
pub mod watch;

use std::path::PathBuf;

use tuyashadow_config::Config;
use tuyashadow_core::PollerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file selected by `--config`, or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(tuyashadow_config::config_path)
}

/// Load and validate the config file (no secret resolution).
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_file(global);
    tracing::debug!(path = %path.display(), "loading config");
    let config = tuyashadow_config::load_config_from(&path)?;
    config.validate()?;
    Ok(config)
}

/// Load the config and turn it into a ready-to-use `PollerConfig`.
pub fn poller_config(global: &GlobalOpts) -> Result<PollerConfig, CliError> {
    let config = load(global)?;
    Ok(tuyashadow_config::to_poller_config(&config)?)
}
