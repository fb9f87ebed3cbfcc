//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one `key=value` line per item.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use tuyashadow_core::{Reading, Sensor, Snapshot};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Sensor readings ──────────────────────────────────────────────────

/// One configured data point and its value in a snapshot.
#[derive(Debug, Serialize)]
pub struct SensorReading {
    pub unique_id: String,
    pub device_id: String,
    pub device: String,
    pub code: String,
    pub name: String,
    /// `None` when the device or property was not reported this cycle.
    pub value: Option<Reading>,
    pub unit: Option<String>,
}

impl SensorReading {
    pub fn new(sensor: Sensor, snapshot: &Snapshot) -> Self {
        let value = sensor.read(snapshot);
        Self {
            unique_id: sensor.unique_id,
            device_id: sensor.device_id,
            device: sensor.device_name,
            code: sensor.code,
            name: sensor.name,
            value,
            unit: sensor.unit,
        }
    }
}

/// Everything a cycle produced, for structured output.
#[derive(Debug, Serialize)]
pub struct CycleReport<'a> {
    pub cycle: u64,
    pub completed_at: Option<DateTime<Utc>>,
    pub readings: &'a [SensorReading],
    pub failures: &'a std::collections::BTreeMap<String, String>,
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Sensor")]
    name: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn reading_row(r: &SensorReading) -> ReadingRow {
    ReadingRow {
        device: r.device.clone(),
        name: r.name.clone(),
        code: r.code.clone(),
        value: format_value(r),
    }
}

fn format_value(r: &SensorReading) -> String {
    match (&r.value, &r.unit) {
        (Some(value), Some(unit)) => format!("{value} {unit}"),
        (Some(value), None) => value.to_string(),
        (None, _) => "-".into(),
    }
}

fn reading_line(r: &SensorReading) -> String {
    let value = r.value.as_ref().map_or_else(String::new, ToString::to_string);
    format!("{}={value}", r.unique_id)
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct SensorRow {
    #[tabled(rename = "ID")]
    pub unique_id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Unit")]
    pub unit: String,
    #[tabled(rename = "Factor")]
    pub factor: f64,
}

impl From<Sensor> for SensorRow {
    fn from(sensor: Sensor) -> Self {
        Self {
            unique_id: sensor.unique_id,
            name: sensor.name,
            unit: sensor.unit.unwrap_or_default(),
            factor: sensor.factor,
        }
    }
}

/// Render readings in the chosen format.
pub fn render_readings(format: &OutputFormat, readings: &[SensorReading]) -> String {
    render_list(format, readings, reading_row, reading_line)
}

/// Render a whole cycle: readings plus failures for structured formats,
/// a headed table otherwise.
pub fn render_cycle(format: &OutputFormat, report: &CycleReport<'_>) -> String {
    match format {
        OutputFormat::Table => {
            let at = report
                .completed_at
                .map_or_else(|| "-".into(), |t| t.format("%H:%M:%S").to_string());
            format!(
                "cycle {} at {at}\n{}",
                report.cycle,
                render_readings(format, report.readings)
            )
        }
        OutputFormat::Plain => render_readings(format, report.readings),
        OutputFormat::Json => render_json(report, false),
        OutputFormat::JsonCompact => render_json(report, true),
        OutputFormat::Yaml => render_yaml(report),
    }
}

/// Write per-device failures to stderr.
pub fn print_failures(snapshot: &Snapshot, color: bool) {
    let mut stderr = io::stderr().lock();
    for (device_id, reason) in &snapshot.failures {
        if color {
            let _ = writeln!(stderr, "{} {device_id}: {reason}", "✗".red());
        } else {
            let _ = writeln!(stderr, "✗ {device_id}: {reason}");
        }
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> String
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&line_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.expect("serialization should not fail")
}

fn render_yaml<T: Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tuyashadow_core::{DataPointConfig, DeviceConfig, RawValue};

    use super::*;

    fn readings() -> Vec<SensorReading> {
        let device = DeviceConfig::new("dev1", "Boiler")
            .with_data_point(
                DataPointConfig::new("temp")
                    .with_name("Temperature")
                    .with_unit("°C")
                    .with_factor(0.5),
            )
            .with_data_point(DataPointConfig::new("mode"));

        let mut snapshot = Snapshot::default();
        snapshot
            .devices
            .entry("dev1".into())
            .or_default()
            .insert("temp".into(), RawValue::from(serde_json::json!(43)));

        tuyashadow_core::sensors_for(&[device])
            .into_iter()
            .map(|s| SensorReading::new(s, &snapshot))
            .collect()
    }

    #[test]
    fn plain_lines_use_unique_ids() {
        let out = render_readings(&OutputFormat::Plain, &readings());
        assert_eq!(out, "tuya_shadow_dev1_temp=21.5\ntuya_shadow_dev1_mode=");
    }

    #[test]
    fn table_shows_units_and_missing_values() {
        let out = render_readings(&OutputFormat::Table, &readings());
        assert!(out.contains("Boiler Temperature"));
        assert!(out.contains("21.5 °C"));
        assert!(out.contains('-'));
    }

    #[test]
    fn json_reports_null_for_missing() {
        let out = render_readings(&OutputFormat::JsonCompact, &readings());
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["value"], serde_json::json!(21.5));
        assert!(parsed[1]["value"].is_null());
    }
}
