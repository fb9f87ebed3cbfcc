use serde::Serialize;

use crate::config::{DataPointConfig, DeviceConfig};
use crate::snapshot::Snapshot;
use crate::value::Reading;

/// A read-only view of one configured data point, for hosts that model
/// each property as its own entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sensor {
    /// Stable identifier: `tuya_shadow_{device_id}_{code}`.
    pub unique_id: String,
    /// `"{device name} {data point name}"`.
    pub name: String,
    pub device_id: String,
    pub device_name: String,
    pub code: String,
    pub unit: Option<String>,
    pub factor: f64,
}

impl Sensor {
    pub fn new(device: &DeviceConfig, dp: &DataPointConfig) -> Self {
        Self {
            unique_id: format!("tuya_shadow_{}_{}", device.id, dp.code),
            name: format!("{} {}", device.name, dp.name),
            device_id: device.id.clone(),
            device_name: device.name.clone(),
            code: dp.code.clone(),
            unit: dp.unit.clone(),
            factor: dp.factor,
        }
    }

    /// The scaled reading in `snapshot`, or `None` if the device or
    /// property was not reported.
    pub fn read(&self, snapshot: &Snapshot) -> Option<Reading> {
        snapshot
            .value(&self.device_id, &self.code)
            .map(|raw| raw.scaled(self.factor))
    }
}

/// One sensor per data point, in configuration order.
pub fn sensors_for(devices: &[DeviceConfig]) -> Vec<Sensor> {
    devices
        .iter()
        .flat_map(|device| device.data_points.iter().map(move |dp| Sensor::new(device, dp)))
        .collect()
}
