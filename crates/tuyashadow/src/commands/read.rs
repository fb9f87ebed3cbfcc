//! `tuyashadow read`: one poll cycle, printed.

use std::time::Duration;

use tuyashadow_core::Poller;

use crate::cli::{GlobalOpts, ReadArgs};
use crate::error::CliError;
use crate::output::{self, SensorReading};

pub async fn handle(args: ReadArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = super::poller_config(global)?;
    if let Some(ref device_id) = args.device {
        config.devices.retain(|d| &d.id == device_id);
        if config.devices.is_empty() {
            return Err(CliError::DeviceNotFound {
                device_id: device_id.clone(),
            });
        }
    }
    config.poll_interval = Duration::ZERO;

    let poller = Poller::new(config)?;
    let snapshot = poller.refresh_now().await;

    let readings: Vec<SensorReading> = poller
        .sensors()
        .into_iter()
        .map(|sensor| SensorReading::new(sensor, &snapshot))
        .collect();

    output::print_output(
        &output::render_readings(&global.output, &readings),
        global.quiet,
    );
    output::print_failures(&snapshot, output::should_color(&global.color));

    if snapshot.is_empty() {
        if let Some(first) = snapshot.failures.values().next() {
            return Err(CliError::NoData {
                failed: snapshot.failures.len(),
                first: first.clone(),
            });
        }
    }
    Ok(())
}
