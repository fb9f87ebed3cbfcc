// Integration tests for the poll coordinator.
#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tuyashadow_api::{Error, ShadowProperty};
use tuyashadow_core::{
    CoreError, Credentials, DataPointConfig, DeviceConfig, PollState, Poller, PollerConfig,
    RawValue, Reading, ShadowSource,
};

// ── Scripted source ─────────────────────────────────────────────────

#[derive(Default)]
struct ScriptedSource {
    properties: Mutex<HashMap<String, Vec<ShadowProperty>>>,
    failing: Mutex<HashSet<String>>,
    stalled: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn report(&self, device_id: &str, props: serde_json::Value) {
        let props: Vec<ShadowProperty> = serde_json::from_value(props).unwrap();
        self.properties
            .lock()
            .unwrap()
            .insert(device_id.to_owned(), props);
    }

    fn fail(&self, device_id: &str) {
        self.failing.lock().unwrap().insert(device_id.to_owned());
    }

    fn stall(&self, device_id: &str) {
        self.stalled.lock().unwrap().insert(device_id.to_owned());
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ShadowSource for ScriptedSource {
    fn fetch_shadow<'a>(
        &'a self,
        device_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ShadowProperty>, Error>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let stalled = self.stalled.lock().unwrap().contains(device_id);
            if stalled {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            let failing = self.failing.lock().unwrap().contains(device_id);
            if failing {
                return Err(Error::Shadow {
                    device_id: device_id.to_owned(),
                    message: "device offline (code 2001)".into(),
                    code: Some(2001),
                    body: String::new(),
                });
            }
            Ok(self
                .properties
                .lock()
                .unwrap()
                .get(device_id)
                .cloned()
                .unwrap_or_default())
        })
    }
}

fn temp(value: serde_json::Value) -> serde_json::Value {
    json!([{ "code": "temp", "value": value, "dp_id": 1, "type": "value" }])
}

fn devices(ids: &[&str]) -> Vec<DeviceConfig> {
    ids.iter()
        .map(|id| {
            DeviceConfig::new(*id, format!("Device {id}"))
                .with_data_point(DataPointConfig::new("temp").with_factor(0.1))
        })
        .collect()
}

fn poller(ids: &[&str], interval: Duration, source: &Arc<ScriptedSource>) -> Poller {
    Poller::with_source(
        devices(ids),
        interval,
        Duration::from_secs(5),
        Arc::clone(source) as Arc<dyn ShadowSource>,
    )
}

// ── Failure isolation ───────────────────────────────────────────────

#[tokio::test]
async fn test_failed_device_is_omitted() {
    let source = Arc::new(ScriptedSource::default());
    source.report("dev1", temp(json!(200)));
    source.report("dev3", temp(json!(215)));
    source.fail("dev2");

    let poller = poller(&["dev1", "dev2", "dev3"], Duration::ZERO, &source);
    poller.start().await;

    let snap = poller.snapshot();
    assert_eq!(snap.cycle, 1);
    let reported: Vec<&str> = snap.devices.keys().map(String::as_str).collect();
    assert_eq!(reported, vec!["dev1", "dev3"]);
    assert!(snap.device("dev2").is_none());
    assert!(snap.failure("dev2").unwrap().contains("2001"));
    assert_eq!(source.calls(), 3);
}

#[tokio::test]
async fn test_failure_drops_previous_values() {
    let source = Arc::new(ScriptedSource::default());
    source.report("dev1", temp(json!(200)));
    source.report("dev2", temp(json!(210)));

    let poller = poller(&["dev1", "dev2"], Duration::ZERO, &source);
    let first = poller.refresh_now().await;
    assert_eq!(first.value("dev1", "temp"), Some(&RawValue::from(json!(200))));

    source.fail("dev1");
    let second = poller.refresh_now().await;
    assert_eq!(second.cycle, 2);
    assert_eq!(poller.value("dev1", "temp"), None);
    assert_eq!(poller.value("dev2", "temp"), Some(RawValue::from(json!(210))));
    // The earlier snapshot is untouched.
    assert!(first.device("dev1").is_some());
}

#[tokio::test]
async fn test_all_devices_failing_publishes_empty_snapshot() {
    let source = Arc::new(ScriptedSource::default());
    source.fail("dev1");
    source.fail("dev2");

    let poller = poller(&["dev1", "dev2"], Duration::ZERO, &source);
    let snap = poller.refresh_now().await;

    assert!(snap.is_empty());
    assert_eq!(snap.failures.len(), 2);
    assert!(snap.completed_at.is_some());
    assert_eq!(poller.state(), PollState::Published { cycle: 1 });
}

#[tokio::test(start_paused = true)]
async fn test_slow_device_times_out() {
    let source = Arc::new(ScriptedSource::default());
    source.report("dev1", temp(json!(180)));
    source.stall("dev2");

    let poller = Poller::with_source(
        devices(&["dev1", "dev2"]),
        Duration::ZERO,
        Duration::from_secs(2),
        Arc::clone(&source) as Arc<dyn ShadowSource>,
    );
    let snap = poller.refresh_now().await;

    assert!(snap.device("dev1").is_some());
    assert!(snap.device("dev2").is_none());
    assert!(snap.failure("dev2").unwrap().contains("timed out"));
}

// ── Scheduling ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_start_runs_eager_cycle_then_ticks() {
    let source = Arc::new(ScriptedSource::default());
    source.report("dev1", temp(json!(215)));

    let poller = poller(&["dev1"], Duration::from_secs(60), &source);
    assert_eq!(poller.state(), PollState::Idle);
    assert_eq!(poller.snapshot().cycle, 0);

    let mut published = poller.subscribe_published();
    poller.start().await;

    // Data is available as soon as start() returns.
    assert_eq!(poller.snapshot().cycle, 1);
    assert_eq!(source.calls(), 1);
    assert_eq!(*published.borrow_and_update(), 1);

    // The next cycle comes from the periodic task one interval later.
    published.changed().await.unwrap();
    assert_eq!(*published.borrow_and_update(), 2);
    assert_eq!(source.calls(), 2);

    poller.stop().await;
    assert_eq!(poller.state(), PollState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_periodic_cycles() {
    let source = Arc::new(ScriptedSource::default());
    source.report("dev1", temp(json!(1)));

    let poller = poller(&["dev1"], Duration::from_secs(10), &source);
    poller.start().await;
    poller.stop().await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), 1);

    // A stopped poller does not restart.
    poller.start().await;
    assert_eq!(source.calls(), 1);
    assert_eq!(poller.state(), PollState::Stopped);
}

#[tokio::test]
async fn test_zero_interval_runs_only_eager_cycle() {
    let source = Arc::new(ScriptedSource::default());
    source.report("dev1", temp(json!(1)));

    let poller = poller(&["dev1"], Duration::ZERO, &source);
    poller.start().await;
    poller.start().await;
    tokio::task::yield_now().await;

    assert_eq!(source.calls(), 1);
    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_state_observed_across_refresh() {
    let source = Arc::new(ScriptedSource::default());
    source.report("dev1", temp(json!(200)));
    source.stall("dev1");

    let poller = poller(&["dev1"], Duration::ZERO, &source);
    let mut states = poller.subscribe_state();
    assert_eq!(*states.borrow_and_update(), PollState::Idle);

    let refresh = {
        let poller = poller.clone();
        tokio::spawn(async move { poller.refresh_now().await })
    };

    states.changed().await.unwrap();
    assert_eq!(*states.borrow_and_update(), PollState::Fetching { cycle: 1 });

    // The stalled fetch gives up after the 5s per-device timeout.
    tokio::time::advance(Duration::from_secs(6)).await;
    refresh.await.unwrap();

    states.changed().await.unwrap();
    assert_eq!(*states.borrow_and_update(), PollState::Published { cycle: 1 });
    assert_eq!(poller.state(), PollState::Published { cycle: 1 });
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_reading_applies_factor() {
    let source = Arc::new(ScriptedSource::default());
    source.report(
        "dev1",
        json!([
            { "code": "temp", "value": 215 },
            { "code": "mode", "value": "auto" },
        ]),
    );

    let poller = poller(&["dev1"], Duration::ZERO, &source);
    poller.refresh_now().await;

    let reading = poller.reading("dev1", "temp").unwrap().as_f64().unwrap();
    assert!((reading - 21.5).abs() < 1e-9);
    // Untracked codes are readable with factor 1.0; text passes through.
    assert_eq!(
        poller.reading("dev1", "mode"),
        Some(Reading::Raw(RawValue::Text("auto".into())))
    );
    assert_eq!(poller.reading("dev1", "humidity"), None);
    assert_eq!(poller.reading("dev9", "temp"), None);
}

#[tokio::test]
async fn test_null_value_reads_as_unknown() {
    let source = Arc::new(ScriptedSource::default());
    source.report(
        "dev1",
        json!([
            { "code": "temp", "value": null },
            { "code": "mode", "value": "auto" },
        ]),
    );

    let poller = poller(&["dev1"], Duration::ZERO, &source);
    poller.refresh_now().await;

    assert_eq!(poller.reading("dev1", "temp"), None);
    assert_eq!(poller.value("dev1", "temp"), None);
    let sensor = poller.sensors().into_iter().next().unwrap();
    assert_eq!(sensor.read(&poller.snapshot()), None);
    // The device itself still reported.
    assert!(poller.snapshot().devices.contains_key("dev1"));
}

#[tokio::test]
async fn test_device_lookup_and_sensors() {
    let source = Arc::new(ScriptedSource::default());
    let poller = poller(&["dev1", "dev2"], Duration::ZERO, &source);

    assert_eq!(poller.device("dev2").unwrap().name, "Device dev2");
    assert!(matches!(
        poller.device("nope"),
        Err(CoreError::DeviceNotFound { .. })
    ));

    let ids: Vec<String> = poller.sensors().into_iter().map(|s| s.unique_id).collect();
    assert_eq!(ids, vec!["tuya_shadow_dev1_temp", "tuya_shadow_dev2_temp"]);
}

// ── End to end against a mock cloud ─────────────────────────────────

async fn cloud_poller(server: &MockServer, ids: &[&str]) -> Poller {
    let mut config = PollerConfig::new(Credentials::new("cid", "secret", "eu"), devices(ids));
    config.base_url = Some(server.uri().parse().unwrap());
    config.poll_interval = Duration::ZERO;
    Poller::new(config).unwrap()
}

#[tokio::test]
async fn test_cloud_cycle_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "access_token": "T1", "expire_time": 7200 }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2.0/cloud/thing/dev1/shadow/properties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "properties": [{ "code": "temp", "value": 215, "dp_id": 1 }] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2.0/cloud/thing/dev2/shadow/properties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false, "code": 2001, "msg": "device is offline"
        })))
        .mount(&server)
        .await;

    let poller = cloud_poller(&server, &["dev1", "dev2"]).await;
    poller.start().await;

    let reading = poller.reading("dev1", "temp").unwrap().as_f64().unwrap();
    assert!((reading - 21.5).abs() < 1e-9);

    let snap = poller.snapshot();
    assert!(snap.device("dev2").is_none());
    assert!(snap.failure("dev2").unwrap().contains("device is offline"));
}

#[tokio::test]
async fn test_cloud_auth_failure_omits_every_device() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false, "code": 1004, "msg": "sign invalid"
        })))
        .mount(&server)
        .await;

    let poller = cloud_poller(&server, &["dev1", "dev2"]).await;
    let snap = poller.refresh_now().await;

    assert!(snap.is_empty());
    for id in ["dev1", "dev2"] {
        let failure = snap.failure(id).unwrap();
        assert!(failure.contains("Authentication failed"), "{failure}");
    }
}
