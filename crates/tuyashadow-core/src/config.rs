// ── Runtime poller configuration ──
//
// These types describe *what* to poll and *how often*. They carry
// credential data but never touch disk; `tuyashadow-config` builds a
// `PollerConfig` from TOML/env and hands it in.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use tuyashadow_api::{Credentials, TlsMode};

/// Poll period used when the configuration does not set one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// One tracked property of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPointConfig {
    /// Property code as reported in the shadow (e.g. `va_temperature`).
    pub code: String,
    /// Display name.
    pub name: String,
    pub unit: Option<String>,
    /// Multiplier applied to numeric raw values.
    pub factor: f64,
}

impl DataPointConfig {
    /// A data point named after its code, with no unit and factor 1.0.
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            name: code.clone(),
            code,
            unit: None,
            factor: 1.0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }
}

/// A device whose shadow is polled, and the data points read from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    pub name: String,
    pub data_points: Vec<DataPointConfig>,
}

impl DeviceConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_points: Vec::new(),
        }
    }

    pub fn with_data_point(mut self, dp: DataPointConfig) -> Self {
        self.data_points.push(dp);
        self
    }

    /// The configured data point for `code`, if tracked.
    pub fn data_point(&self, code: &str) -> Option<&DataPointConfig> {
        self.data_points.iter().find(|dp| dp.code == code)
    }
}

/// Everything needed to build a [`Poller`](crate::Poller) against the cloud.
///
/// Built by the CLI (or any host) -- core never reads config files.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub credentials: Credentials,
    /// Endpoint override; `None` derives it from the region.
    pub base_url: Option<Url>,
    pub tls: TlsMode,
    /// Bound on each HTTP request.
    pub timeout: Duration,
    /// Time between poll cycles. Zero disables the periodic task, leaving
    /// only the eager first cycle.
    pub poll_interval: Duration,
    pub devices: Vec<DeviceConfig>,
}

impl PollerConfig {
    pub fn new(credentials: Credentials, devices: Vec<DeviceConfig>) -> Self {
        Self {
            credentials,
            base_url: None,
            tls: TlsMode::default(),
            timeout: tuyashadow_api::transport::DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            devices,
        }
    }
}
