//! Poller lifecycle tests against a scripted station API.
//!
//! Timer tests run on paused tokio time and advance the clock by hand.

use chrono::{DateTime, Utc};
use dash_core::{Credentials, Reading, RefreshInterval, Timestamp, WeatherField};
use dash_daemon::{PollOutcome, PollStatus, Poller};
use dash_history::{HistoricalCache, MIN_INTERVAL_MS};
use dash_ingest::{
    Device, ErrorKind, FetchError, FetchResult, Observation, SimulatedStation, StationApi,
};
use dash_obs::MemoryTelemetry;
use dash_store::{CredentialStore, FileStore, KvStore, MemoryStore, HISTORY_KEY};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// 2024-01-15T15:05:00Z
const BASE: Timestamp = 1_705_331_100_000;

#[derive(Clone)]
enum Reply {
    Devices(Vec<Device>),
    Http(u16, &'static str),
    Network(&'static str),
}

/// Station API that replays scripted replies, then repeats the default
struct ScriptedApi {
    calls: AtomicUsize,
    script: Mutex<VecDeque<(Duration, Reply)>>,
    default: Reply,
    history: Vec<Observation>,
}

impl ScriptedApi {
    fn new(default: Reply) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
            default,
            history: Vec::new(),
        }
    }

    fn then(self, delay: Duration, reply: Reply) -> Self {
        self.script.lock().push_back((delay, reply));
        self
    }

    fn with_history(mut self, history: Vec<Observation>) -> Self {
        self.history = history;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StationApi for ScriptedApi {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn list_devices(&self, _credentials: &Credentials) -> FetchResult<Vec<Device>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, reply) = self
            .script
            .lock()
            .pop_front()
            .unwrap_or((Duration::ZERO, self.default.clone()));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match reply {
            Reply::Devices(devices) => Ok(devices),
            Reply::Http(status, text) => Err(FetchError::Http {
                status,
                status_text: text.to_string(),
            }),
            Reply::Network(message) => Err(FetchError::network(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                message,
            ))),
        }
    }

    async fn fetch_history(
        &self,
        _credentials: &Credentials,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> FetchResult<Vec<Observation>> {
        Ok(self.history.clone())
    }
}

fn observation(value: Value) -> Observation {
    serde_json::from_value(value).unwrap()
}

fn device(temp: f64, dateutc: Timestamp) -> Device {
    serde_json::from_value(json!({
        "macAddress": "00:11:22:33:44:55",
        "info": { "name": "Backyard", "coords": { "lat": 45.5, "lon": -122.6 } },
        "lastData": { "dateutc": dateutc, "tempf": temp, "humidity": 40, "soilhum1": 30 }
    }))
    .unwrap()
}

fn ok_reply(temp: f64) -> Reply {
    Reply::Devices(vec![device(temp, BASE)])
}

struct Harness {
    api: Arc<ScriptedApi>,
    store: Arc<MemoryStore>,
    cache: Arc<HistoricalCache>,
    telemetry: Arc<MemoryTelemetry>,
    poller: Arc<Poller>,
}

fn harness(api: ScriptedApi, credential: Option<&str>) -> Harness {
    let api = Arc::new(api);
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(HistoricalCache::new(store.clone()));
    let credentials = CredentialStore::new(store.clone());
    if let Some(c) = credential {
        credentials.set(c);
    }
    let telemetry = Arc::new(MemoryTelemetry::new());
    let poller = Arc::new(Poller::new(
        api.clone(),
        cache.clone(),
        credentials,
        telemetry.clone(),
    ));
    Harness {
        api,
        store,
        cache,
        telemetry,
        poller,
    }
}

/// Let spawned tasks run to their next await point
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_no_credential_is_a_noop() {
    let h = harness(ScriptedApi::new(ok_reply(70.0)), None);

    assert_eq!(h.poller.refresh().await, PollOutcome::Skipped);
    assert_eq!(h.api.calls(), 0);
    assert!(h.telemetry.actions().is_empty());
    assert_eq!(h.poller.snapshot().status, PollStatus::Idle);
}

#[tokio::test]
async fn test_invalid_credential_fails_without_network_call() {
    let h = harness(ScriptedApi::new(ok_reply(70.0)), Some("only-one-part"));

    let outcome = h.poller.refresh().await;

    assert_eq!(outcome, PollOutcome::Failed(ErrorKind::Configuration));
    assert_eq!(h.api.calls(), 0);
    let state = h.poller.snapshot();
    assert_eq!(
        state.error.as_deref(),
        Some("Invalid API key format. Please provide both API key and application key.")
    );
    assert_eq!(state.last_error_kind, Some(ErrorKind::Configuration));
    assert!(h.cache.is_empty());

    let update = &h.telemetry.actions_named("weather_data_update")[0];
    assert_eq!(update.attr("success"), Some(&Value::from(false)));
}

#[tokio::test]
async fn test_success_updates_state_history_and_telemetry() {
    let h = harness(ScriptedApi::new(ok_reply(72.5)), Some("key:app"));

    let outcome = h.poller.refresh().await;

    let PollOutcome::Updated(reading) = outcome else {
        panic!("unexpected outcome {:?}", outcome);
    };
    assert_eq!(reading.timestamp, BASE);
    assert_eq!(reading.temperature, Some(72.5));
    assert_eq!(reading.soil_moisture, Some(30.0));

    let state = h.poller.snapshot();
    assert_eq!(state.status, PollStatus::Idle);
    assert!(state.error.is_none());
    let current = state.current.unwrap();
    assert_eq!(current.reading, reading);
    assert_eq!(current.station.name.as_deref(), Some("Backyard"));

    assert_eq!(h.cache.read_all(), vec![reading]);

    let update = &h.telemetry.actions_named("weather_data_update")[0];
    assert_eq!(update.attr("success"), Some(&Value::from(true)));
    assert_eq!(update.attr("data_source"), Some(&Value::from("api")));

    let published = &h.telemetry.actions_named("weather_reading")[0];
    assert_eq!(published.attr("location"), Some(&Value::from("Backyard")));
    assert_eq!(published.attr("lat"), Some(&Value::from(45.5)));
    assert_eq!(published.attr("temperature"), Some(&Value::from(72.5)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_refresh_persists_to_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    let cache = Arc::new(HistoricalCache::new(store.clone()));
    let credentials = CredentialStore::new(store.clone());
    credentials.set("key:app");
    let poller = Poller::new(
        Arc::new(ScriptedApi::new(ok_reply(68.0))),
        cache.clone(),
        credentials,
        Arc::new(MemoryTelemetry::new()),
    );

    assert!(matches!(poller.refresh().await, PollOutcome::Updated(_)));

    // A fresh cache over the same directory sees the appended reading
    let reopened = HistoricalCache::new(Arc::new(FileStore::new(dir.path()).unwrap()));
    assert_eq!(reopened.latest().and_then(|r| r.temperature), Some(68.0));
}

#[tokio::test]
async fn test_http_error_leaves_history_untouched() {
    let h = harness(
        ScriptedApi::new(Reply::Http(500, "Internal Server Error")),
        Some("key:app"),
    );

    assert_eq!(h.poller.refresh().await, PollOutcome::Failed(ErrorKind::Transport));

    let state = h.poller.snapshot();
    assert_eq!(
        state.error.as_deref(),
        Some("API request failed with status 500: Internal Server Error")
    );
    assert!(state.current.is_none());
    assert!(h.cache.is_empty());
    assert_eq!(h.telemetry.errors().len(), 1);
}

#[tokio::test]
async fn test_network_error_reports_original_error() {
    let h = harness(ScriptedApi::new(Reply::Network("connection reset by peer")), Some("key:app"));

    assert_eq!(h.poller.refresh().await, PollOutcome::Failed(ErrorKind::Transport));
    assert_eq!(h.poller.snapshot().error.as_deref(), Some("connection reset by peer"));
    assert_eq!(h.telemetry.errors()[0].name, "connection reset by peer");
}

#[tokio::test]
async fn test_empty_device_list_is_a_data_error() {
    let h = harness(ScriptedApi::new(Reply::Devices(vec![])), Some("key:app"));

    assert_eq!(h.poller.refresh().await, PollOutcome::Failed(ErrorKind::Data));
    assert_eq!(
        h.poller.snapshot().error.as_deref(),
        Some("No devices found for this account")
    );
}

#[tokio::test]
async fn test_device_without_data_is_a_data_error() {
    let bare: Device = serde_json::from_value(json!({ "macAddress": "AA" })).unwrap();
    let h = harness(ScriptedApi::new(Reply::Devices(vec![bare])), Some("key:app"));

    assert_eq!(h.poller.refresh().await, PollOutcome::Failed(ErrorKind::Data));
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_error_cleared_by_next_success() {
    let api = ScriptedApi::new(ok_reply(70.0)).then(Duration::ZERO, Reply::Http(503, "Service Unavailable"));
    let h = harness(api, Some("key:app"));

    h.poller.refresh().await;
    assert!(h.poller.snapshot().error.is_some());

    h.poller.refresh().await;
    let state = h.poller.snapshot();
    assert!(state.error.is_none());
    assert!(state.last_error_kind.is_none());
    assert!(state.current.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_start_polls_immediately_and_on_every_tick() {
    let h = harness(ScriptedApi::new(ok_reply(70.0)), Some("key:app"));

    h.poller.start();
    settle().await;
    assert!(h.poller.is_running());
    assert_eq!(h.api.calls(), 1);

    tokio::time::advance(Duration::from_secs(5 * 60)).await;
    settle().await;
    assert_eq!(h.api.calls(), 2);

    tokio::time::advance(Duration::from_secs(5 * 60)).await;
    settle().await;
    assert_eq!(h.api.calls(), 3);

    h.poller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_timer() {
    let h = harness(ScriptedApi::new(ok_reply(70.0)), Some("key:app"));

    h.poller.start();
    settle().await;
    h.poller.stop();
    assert!(!h.poller.is_running());

    tokio::time::advance(Duration::from_secs(30 * 60)).await;
    settle().await;
    assert_eq!(h.api.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_completion_after_stop_is_discarded() {
    let api = ScriptedApi::new(ok_reply(70.0)).then(Duration::from_secs(8), ok_reply(71.0));
    let h = harness(api, Some("key:app"));

    h.poller.start();
    settle().await;
    assert_eq!(h.api.calls(), 1);
    assert_eq!(h.poller.snapshot().status, PollStatus::Fetching);

    h.poller.stop();
    tokio::time::advance(Duration::from_secs(10)).await;
    settle().await;

    let state = h.poller.snapshot();
    assert!(state.current.is_none());
    assert_eq!(state.status, PollStatus::Idle);
    assert!(h.cache.is_empty());
    assert!(h.telemetry.actions_named("weather_data_update").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_credential_change_invalidates_in_flight_refresh() {
    let api = ScriptedApi::new(ok_reply(70.0)).then(Duration::from_secs(8), ok_reply(71.0));
    let h = harness(api, Some("key:app"));

    let poller = h.poller.clone();
    let pending = tokio::spawn(async move { poller.refresh().await });
    settle().await;

    h.poller.set_credential("other:app");
    tokio::time::advance(Duration::from_secs(10)).await;

    assert_eq!(pending.await.unwrap(), PollOutcome::Stale);
    assert!(h.poller.snapshot().current.is_none());

    // The new credential works for the next cycle
    assert!(matches!(h.poller.refresh().await, PollOutcome::Updated(_)));
}

#[tokio::test(start_paused = true)]
async fn test_credential_change_restarts_running_timer() {
    let h = harness(ScriptedApi::new(ok_reply(70.0)), Some("key:app"));

    h.poller.start();
    settle().await;
    assert_eq!(h.api.calls(), 1);

    h.poller.set_credential("other:app");
    settle().await;
    assert_eq!(h.api.calls(), 2);

    h.poller.clear_credential();
    tokio::time::advance(Duration::from_secs(5 * 60)).await;
    settle().await;
    assert_eq!(h.api.calls(), 2);

    h.poller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_set_interval_restarts_timer() {
    let h = harness(ScriptedApi::new(ok_reply(70.0)), Some("key:app"));

    h.poller.start();
    settle().await;
    assert_eq!(h.api.calls(), 1);

    h.poller.set_interval(RefreshInterval::OneMinute);
    settle().await;
    assert_eq!(h.poller.interval(), RefreshInterval::OneMinute);
    assert_eq!(h.api.calls(), 2);

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(h.api.calls(), 3);

    h.poller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_set_interval_while_stopped_does_not_start() {
    let h = harness(ScriptedApi::new(ok_reply(70.0)), Some("key:app"));

    h.poller.set_interval(RefreshInterval::TenMinutes);
    tokio::time::advance(Duration::from_secs(60 * 60)).await;
    settle().await;

    assert!(!h.poller.is_running());
    assert_eq!(h.api.calls(), 0);
}

// Overlapping fetches are allowed; the last one to complete wins,
// regardless of issue order.
#[tokio::test(start_paused = true)]
async fn test_overlapping_refreshes_last_completion_wins() {
    let api = ScriptedApi::new(ok_reply(0.0))
        .then(Duration::from_secs(20), ok_reply(60.0))
        .then(Duration::from_secs(5), ok_reply(70.0));
    let h = harness(api, Some("key:app"));

    let first = {
        let poller = h.poller.clone();
        tokio::spawn(async move { poller.refresh().await })
    };
    settle().await;
    let second = {
        let poller = h.poller.clone();
        tokio::spawn(async move { poller.refresh().await })
    };
    settle().await;
    assert_eq!(h.poller.snapshot().status, PollStatus::Fetching);

    // The later request finishes first
    tokio::time::advance(Duration::from_secs(10)).await;
    assert!(matches!(second.await.unwrap(), PollOutcome::Updated(_)));
    assert_eq!(h.poller.snapshot().status, PollStatus::Fetching);

    tokio::time::advance(Duration::from_secs(15)).await;
    assert!(matches!(first.await.unwrap(), PollOutcome::Updated(_)));

    let state = h.poller.snapshot();
    assert_eq!(state.status, PollStatus::Idle);
    assert_eq!(
        state.current.map(|c| c.reading.temperature),
        Some(Some(60.0))
    );
    // Same observation time, so the second append is dropped by spacing
    assert_eq!(h.cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_deduplicates_history() {
    let h = harness(ScriptedApi::new(Reply::Devices(vec![])), Some("key:app"));
    let minute = 60 * 1000;
    let seeded: Vec<Reading> = [0, minute, 6 * minute, 7 * minute]
        .iter()
        .map(|ts| Reading::at(BASE - 60 * minute + ts).with(WeatherField::Temperature, 70.0))
        .collect();
    h.store
        .set(HISTORY_KEY, &serde_json::to_string(&seeded).unwrap())
        .unwrap();

    h.poller.start();
    h.poller.stop();

    let stamps: Vec<Timestamp> = h.cache.read_all().iter().map(|r| r.timestamp).collect();
    assert_eq!(stamps, vec![BASE - 60 * minute, BASE - 54 * minute]);
}

#[tokio::test]
async fn test_backfill_appends_oldest_first() {
    let history = vec![
        observation(json!({ "dateutc": BASE, "tempf": 72.0 })),
        observation(json!({ "dateutc": BASE - MIN_INTERVAL_MS, "tempf": 71.0 })),
        observation(json!({ "dateutc": BASE - 2 * MIN_INTERVAL_MS, "tempf": 70.0 })),
        observation(json!({ "dateutc": BASE - MIN_INTERVAL_MS - 1000, "tempf": 70.5 })),
    ];
    let h = harness(ScriptedApi::new(ok_reply(70.0)).with_history(history), Some("key:app"));

    assert_eq!(h.poller.backfill(24).await.unwrap(), 4);

    let temps: Vec<Option<f64>> = h.cache.read_all().iter().map(|r| r.temperature).collect();
    // The reading 299s after the first one is inside the spacing interval
    assert_eq!(temps, vec![Some(70.0), Some(71.0), Some(72.0)]);
}

#[tokio::test]
async fn test_backfill_rejects_out_of_range_hours() {
    let h = harness(ScriptedApi::new(ok_reply(70.0)), Some("key:app"));
    let err = h.poller.backfill(u32::MAX).await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidRange(u32::MAX)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_backfill_rejects_invalid_credential() {
    let h = harness(ScriptedApi::new(ok_reply(70.0)), Some("broken"));
    let err = h.poller.backfill(24).await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidCredential(_)));
}

#[tokio::test]
async fn test_simulated_station_reports_mock_source() {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(HistoricalCache::new(store.clone()));
    let credentials = CredentialStore::new(store);
    credentials.set("demo:demo");
    let telemetry = Arc::new(MemoryTelemetry::new());
    let poller = Poller::new(
        Arc::new(SimulatedStation::new(11)),
        cache.clone(),
        credentials,
        telemetry.clone(),
    );

    assert!(matches!(poller.refresh().await, PollOutcome::Updated(_)));
    assert_eq!(cache.len(), 1);
    let update = &telemetry.actions_named("weather_data_update")[0];
    assert_eq!(update.attr("data_source"), Some(&Value::from("mock")));
}
