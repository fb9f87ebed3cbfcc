// ── Published poll results ──
//
// A `Snapshot` is built from scratch by every poll cycle and swapped in
// whole. Readers get an `Arc` to an immutable value; they never observe a
// cycle half-applied.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::value::RawValue;

/// Property code -> last reported value for one device.
pub type DeviceProperties = BTreeMap<String, RawValue>;

/// The outcome of one poll cycle.
///
/// Devices whose fetch failed are absent from `devices`, not carried over
/// from the previous cycle; their error text is in `failures`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Monotonic cycle number; 0 before the first cycle completes.
    pub cycle: u64,
    pub completed_at: Option<DateTime<Utc>>,
    pub devices: BTreeMap<String, DeviceProperties>,
    pub failures: BTreeMap<String, String>,
}

impl Snapshot {
    pub(crate) fn begin(cycle: u64) -> Self {
        Self {
            cycle,
            ..Self::default()
        }
    }

    pub fn device(&self, device_id: &str) -> Option<&DeviceProperties> {
        self.devices.get(device_id)
    }

    /// `snapshot[device_id][code]`, or `None` if never observed this cycle.
    pub fn value(&self, device_id: &str, code: &str) -> Option<&RawValue> {
        self.devices.get(device_id)?.get(code)
    }

    pub fn failure(&self, device_id: &str) -> Option<&str> {
        self.failures.get(device_id).map(String::as_str)
    }

    /// No device reported anything this cycle.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Holds the current snapshot and notifies subscribers on publish.
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
    published: watch::Sender<u64>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (published, _) = watch::channel(0);
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
            published,
        }
    }

    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Replace the current snapshot and bump the published cycle number.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let cycle = snapshot.cycle;
        let snapshot = Arc::new(snapshot);
        self.current.store(Arc::clone(&snapshot));
        self.published.send_replace(cycle);
        snapshot
    }

    /// Watch the number of the most recently published cycle.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.published.subscribe()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
