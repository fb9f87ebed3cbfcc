//! `tuyashadow sensors`: list configured data points without polling.

use tuyashadow_core::sensors_for;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, SensorRow};

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let config = super::load(global)?;
    let rows: Vec<SensorRow> = sensors_for(&config.device_configs())
        .into_iter()
        .map(SensorRow::from)
        .collect();

    let out = output::render_list(
        &global.output,
        &rows,
        SensorRow::clone,
        |r| r.unique_id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
