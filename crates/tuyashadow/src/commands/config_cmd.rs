//! Config subcommand handlers.

use owo_colors::OwoColorize;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = super::config_file(global);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Check => {
            let config = super::load(global)?;
            // Resolving the secret proves at least one credential source works.
            let poller = tuyashadow_config::to_poller_config(&config)?;

            let data_points: usize = poller.devices.iter().map(|d| d.data_points.len()).sum();
            let endpoint = match poller.base_url {
                Some(ref url) => url.to_string(),
                None => poller
                    .credentials
                    .base_url()
                    .map_or_else(|_| format!("region {}", config.region), |u| u.to_string()),
            };
            let summary = format!(
                "{} devices, {data_points} data points, every {}s via {endpoint}",
                poller.devices.len(),
                poller.poll_interval.as_secs(),
            );

            let line = if output::should_color(&global.color) {
                format!("{} config OK: {summary}", "✓".green())
            } else {
                format!("✓ config OK: {summary}")
            };
            output::print_output(&line, global.quiet);
            Ok(())
        }
    }
}
