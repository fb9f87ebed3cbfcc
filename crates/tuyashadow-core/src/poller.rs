// ── Poll coordinator ──
//
// Drives the periodic shadow refresh across every tracked device,
// isolates per-device failures, and publishes one snapshot per cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tuyashadow_api::{ShadowProperty, TransportConfig, TuyaClient};

use crate::config::{DeviceConfig, PollerConfig};
use crate::error::CoreError;
use crate::sensor::{Sensor, sensors_for};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::source::ShadowSource;
use crate::value::{RawValue, Reading};

// ── PollState ────────────────────────────────────────────────────

/// Where the poller is in its cycle, observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Constructed, no cycle run yet.
    Idle,
    /// A cycle is fetching device shadows.
    Fetching { cycle: u64 },
    /// The snapshot of `cycle` is the current one.
    Published { cycle: u64 },
    /// Periodic polling has been shut down.
    Stopped,
}

// ── Poller ───────────────────────────────────────────────────────

/// Periodically fetches every tracked device's shadow and publishes the
/// consolidated result.
///
/// Cheaply cloneable via `Arc<PollerInner>`. The device set is fixed at
/// construction. Cycles never overlap: the periodic task awaits each cycle
/// before waiting for the next tick, and [`refresh_now`](Self::refresh_now)
/// serializes with it.
#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    devices: Vec<DeviceConfig>,
    interval: Duration,
    fetch_timeout: Duration,
    source: Arc<dyn ShadowSource>,
    store: SnapshotStore,
    state: watch::Sender<PollState>,
    /// Held for the duration of a cycle; the value is the last cycle number.
    cycle: Mutex<u64>,
    cancel: CancellationToken,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    /// Build a poller backed by a [`TuyaClient`] for `config.credentials`.
    ///
    /// Does not fetch anything -- call [`start()`](Self::start).
    pub fn new(config: PollerConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: config.tls.clone(),
            timeout: config.timeout,
        };
        let client = match config.base_url {
            Some(base_url) => TuyaClient::with_base_url(config.credentials, base_url, &transport)?,
            None => TuyaClient::new(config.credentials, &transport)?,
        };
        // A fetch may need a token request and a shadow request.
        let fetch_timeout = config.timeout.saturating_mul(2);

        Ok(Self::with_source(
            config.devices,
            config.poll_interval,
            fetch_timeout,
            Arc::new(client),
        ))
    }

    /// Build a poller over any [`ShadowSource`].
    ///
    /// `interval` of zero means no periodic task: only the eager first
    /// cycle of [`start()`](Self::start) and explicit
    /// [`refresh_now()`](Self::refresh_now) calls fetch. Each device fetch
    /// is abandoned after `fetch_timeout`.
    pub fn with_source(
        devices: Vec<DeviceConfig>,
        interval: Duration,
        fetch_timeout: Duration,
        source: Arc<dyn ShadowSource>,
    ) -> Self {
        let (state, _) = watch::channel(PollState::Idle);

        Self {
            inner: Arc::new(PollerInner {
                devices,
                interval,
                fetch_timeout,
                source,
                store: SnapshotStore::new(),
                state,
                cycle: Mutex::new(0),
                cancel: CancellationToken::new(),
                task_handle: Mutex::new(None),
            }),
        }
    }

    /// The tracked devices, in configuration order.
    pub fn devices(&self) -> &[DeviceConfig] {
        &self.inner.devices
    }

    pub fn device(&self, device_id: &str) -> Result<&DeviceConfig, CoreError> {
        self.inner
            .devices
            .iter()
            .find(|d| d.id == device_id)
            .ok_or_else(|| CoreError::DeviceNotFound {
                device_id: device_id.to_owned(),
            })
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Run one cycle immediately, then spawn the periodic task.
    ///
    /// Consumers reading right after `start()` returns see real data (or
    /// per-device failures), never the empty initial snapshot. Calling
    /// `start()` on a running poller is a no-op. A stopped poller stays
    /// stopped.
    pub async fn start(&self) {
        let mut handle = self.inner.task_handle.lock().await;
        if handle.is_some() || self.inner.cancel.is_cancelled() {
            return;
        }

        self.refresh_now().await;

        let period = self.inner.interval;
        if period.is_zero() {
            debug!("poll interval is zero -- periodic refresh disabled");
            return;
        }

        let poller = self.clone();
        let cancel = self.inner.cancel.clone();
        *handle = Some(tokio::spawn(poll_task(poller, period, cancel)));
        info!(
            devices = self.inner.devices.len(),
            interval_secs = period.as_secs(),
            "polling started"
        );
    }

    /// Stop scheduling cycles and wait for the periodic task to exit.
    ///
    /// A cycle already in flight runs to completion; every fetch in it is
    /// bounded by the fetch timeout.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();

        let handle = self.inner.task_handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "poll task ended abnormally");
            }
        }

        self.inner.state.send_replace(PollState::Stopped);
        debug!("polling stopped");
    }

    /// Run one poll cycle now and return the snapshot it published.
    ///
    /// Never fails: devices that could not be fetched are logged and left
    /// out of the snapshot. Waits for any cycle already in progress.
    pub async fn refresh_now(&self) -> Arc<Snapshot> {
        let mut last_cycle = self.inner.cycle.lock().await;
        let cycle = *last_cycle + 1;
        *last_cycle = cycle;

        self.inner.state.send_replace(PollState::Fetching { cycle });

        let results = join_all(
            self.inner
                .devices
                .iter()
                .map(|device| self.fetch_device(&device.id)),
        )
        .await;

        let mut snapshot = Snapshot::begin(cycle);
        for (device, result) in self.inner.devices.iter().zip(results) {
            match result {
                Ok(properties) => {
                    snapshot
                        .devices
                        .insert(device.id.clone(), collect_properties(properties));
                }
                Err(e) => {
                    warn!(
                        device_id = %device.id,
                        device = %device.name,
                        error = %e,
                        "shadow fetch failed, device omitted from this cycle"
                    );
                    snapshot.failures.insert(device.id.clone(), e.to_string());
                }
            }
        }
        snapshot.completed_at = Some(Utc::now());

        let (ok, failed) = (snapshot.devices.len(), snapshot.failures.len());
        let published = self.inner.store.publish(snapshot);
        self.inner.state.send_replace(PollState::Published { cycle });

        debug!(cycle, ok, failed, "poll cycle complete");
        published
    }

    async fn fetch_device(&self, device_id: &str) -> Result<Vec<ShadowProperty>, CoreError> {
        let timeout = self.inner.fetch_timeout;
        match tokio::time::timeout(timeout, self.inner.source.fetch_shadow(device_id)).await {
            Ok(Ok(properties)) => Ok(properties),
            Ok(Err(e)) => Err(CoreError::for_device(device_id, e)),
            Err(_) => Err(CoreError::Fetch {
                device_id: device_id.to_owned(),
                reason: format!("timed out after {}ms", timeout.as_millis()),
            }),
        }
    }

    // ── Reads ────────────────────────────────────────────────────

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.load()
    }

    /// Latest raw value of `code` on `device_id`; `None` means unknown.
    pub fn value(&self, device_id: &str, code: &str) -> Option<RawValue> {
        self.snapshot().value(device_id, code).cloned()
    }

    /// Latest value of `code` on `device_id`, multiplied by the configured
    /// factor when numeric. Codes without a data point use factor 1.0.
    pub fn reading(&self, device_id: &str, code: &str) -> Option<Reading> {
        let factor = self
            .inner
            .devices
            .iter()
            .find(|d| d.id == device_id)
            .and_then(|d| d.data_point(code))
            .map_or(1.0, |dp| dp.factor);
        self.value(device_id, code).map(|raw| raw.scaled(factor))
    }

    /// One [`Sensor`] per configured data point.
    pub fn sensors(&self) -> Vec<Sensor> {
        sensors_for(&self.inner.devices)
    }

    // ── State observation ────────────────────────────────────────

    pub fn state(&self) -> PollState {
        *self.inner.state.borrow()
    }

    /// Subscribe to cycle state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<PollState> {
        self.inner.state.subscribe()
    }

    /// Subscribe to the number of the most recently published cycle.
    pub fn subscribe_published(&self) -> watch::Receiver<u64> {
        self.inner.store.subscribe()
    }
}

/// A property reported as `null` has no known value and is left out.
fn collect_properties(properties: Vec<ShadowProperty>) -> crate::snapshot::DeviceProperties {
    properties
        .into_iter()
        .filter(|p| !p.value.is_null())
        .map(|p| (p.code, RawValue::from(p.value)))
        .collect()
}

// ── Background task ──────────────────────────────────────────────

/// Run a cycle on every tick until cancelled.
async fn poll_task(poller: Poller, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // the eager cycle already covered the first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                poller.refresh_now().await;
            }
        }
    }
}
