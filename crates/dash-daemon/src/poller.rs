//! Periodic station polling
//!
//! One fetch cycle lists the account's devices, normalizes the first
//! device's latest observation, publishes it as the current conditions and
//! appends it to the reading history. Cycles run on a recurring timer and
//! on demand.
//!
//! Every start, stop, interval change and credential change bumps a
//! generation counter. A cycle remembers the generation it was issued
//! under and its result is discarded if the counter moved meanwhile, so a
//! slow response never lands after the poller was stopped or reconfigured.

use chrono::{Duration as ChronoDuration, Utc};
use dash_core::{now_millis, CurrentConditions, Credentials, Reading, RefreshInterval};
use dash_history::HistoricalCache;
use dash_ingest::{normalize, ErrorKind, FetchError, FetchResult, StationApi};
use dash_obs::{attributes, Telemetry};
use dash_store::CredentialStore;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollStatus {
    #[default]
    Idle,
    Fetching,
}

/// Snapshot published to subscribers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub status: PollStatus,
    /// Latest successful poll
    pub current: Option<CurrentConditions>,
    /// Message of the last failed poll, cleared when the next one starts
    pub error: Option<String>,
    pub last_error_kind: Option<ErrorKind>,
}

/// Result of one fetch cycle
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// No credential configured
    Skipped,
    Updated(Reading),
    Failed(ErrorKind),
    /// Finished after the poller was stopped or reconfigured; ignored
    Stale,
}

struct Inner {
    api: Arc<dyn StationApi>,
    cache: Arc<HistoricalCache>,
    credentials: CredentialStore,
    telemetry: Arc<dyn Telemetry>,
    generation: AtomicU64,
    in_flight: AtomicUsize,
    interval: Mutex<RefreshInterval>,
    timer: Mutex<Option<JoinHandle<()>>>,
    state: watch::Sender<DashboardState>,
}

pub struct Poller {
    inner: Arc<Inner>,
}

impl Poller {
    pub fn new(
        api: Arc<dyn StationApi>,
        cache: Arc<HistoricalCache>,
        credentials: CredentialStore,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        let (state, _) = watch::channel(DashboardState::default());
        Self {
            inner: Arc::new(Inner {
                api,
                cache,
                credentials,
                telemetry,
                generation: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                interval: Mutex::new(RefreshInterval::default()),
                timer: Mutex::new(None),
                state,
            }),
        }
    }

    pub fn with_interval(self, interval: RefreshInterval) -> Self {
        *self.inner.interval.lock() = interval;
        self
    }

    pub fn interval(&self) -> RefreshInterval {
        *self.inner.interval.lock()
    }

    pub fn is_running(&self) -> bool {
        self.inner.timer.lock().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> DashboardState {
        self.inner.state.borrow().clone()
    }

    /// Clean up the stored history, then poll now and on every interval tick
    pub fn start(&self) {
        let removed = self.inner.cache.deduplicate();
        if removed > 0 {
            info!(removed, "Cleaned up reading history");
        }
        self.restart_timer();
        info!(interval = %self.interval(), source = self.inner.api.name(), "Poller started");
    }

    /// Cancel the timer. In-flight fetches finish but their results are dropped.
    pub fn stop(&self) {
        self.inner.invalidate();
        if let Some(timer) = self.inner.timer.lock().take() {
            timer.abort();
            info!("Poller stopped");
        }
    }

    /// Change the refresh cadence, restarting the timer when running
    pub fn set_interval(&self, interval: RefreshInterval) {
        *self.inner.interval.lock() = interval;
        info!(%interval, "Refresh interval changed");
        if self.is_running() {
            self.restart_timer();
        }
    }

    /// Store a new combined credential and poll with it right away when running
    pub fn set_credential(&self, combined: &str) {
        self.inner.credentials.set(combined);
        self.credential_changed();
    }

    pub fn clear_credential(&self) {
        self.inner.credentials.clear();
        self.credential_changed();
    }

    fn credential_changed(&self) {
        if self.is_running() {
            self.restart_timer();
        } else {
            self.inner.invalidate();
        }
    }

    /// Run one fetch cycle now
    pub async fn refresh(&self) -> PollOutcome {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.inner.run_cycle(generation).await
    }

    /// Load `hours` of past observations into the history.
    ///
    /// Observations are appended oldest first through the cache, so the
    /// spacing and capacity rules apply. Returns the number fetched.
    pub async fn backfill(&self, hours: u32) -> FetchResult<usize> {
        let combined = self.inner.credentials.get();
        if combined.is_empty() {
            debug!("No credential configured, skipping backfill");
            return Ok(0);
        }
        let credentials = Credentials::parse(&combined)?;

        let end = Utc::now();
        let start = ChronoDuration::try_hours(i64::from(hours))
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or(FetchError::InvalidRange(hours))?;
        let observations = self
            .inner
            .api
            .fetch_history(&credentials, start, end)
            .await?;

        if observations.is_empty() {
            info!(hours, "No historical data found for the requested range");
            return Ok(0);
        }

        let now = now_millis();
        let mut readings: Vec<Reading> = observations.iter().map(|o| normalize(o, now)).collect();
        readings.sort_by_key(|r| r.timestamp);

        let fetched = readings.len();
        let cache = Arc::clone(&self.inner.cache);
        let appended = tokio::task::spawn_blocking(move || {
            let before = cache.len();
            for reading in readings {
                cache.append(reading);
            }
            (before, cache.len())
        })
        .await;
        match appended {
            Ok((before, after)) => info!(fetched, before, after, "Backfilled reading history"),
            Err(e) => warn!(error = %e, "Backfill append task failed"),
        }
        Ok(fetched)
    }

    fn restart_timer(&self) {
        let generation = self.inner.invalidate();
        let period = self.interval().as_duration();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if inner.is_stale(generation) {
                    break;
                }
                // Separate task so cancelling the timer never cuts a fetch short
                tokio::spawn(async move {
                    inner.run_cycle(generation).await;
                });
            }
        });

        if let Some(old) = self.inner.timer.lock().replace(handle) {
            old.abort();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.timer.lock().take() {
            timer.abort();
        }
    }
}

impl Inner {
    /// Bump the generation, orphaning every in-flight cycle
    fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    async fn run_cycle(&self, generation: u64) -> PollOutcome {
        let combined = self.credentials.get();
        if combined.is_empty() {
            debug!("No credential configured, skipping poll");
            return PollOutcome::Skipped;
        }
        if self.is_stale(generation) {
            return PollOutcome::Stale;
        }

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            s.status = PollStatus::Fetching;
            s.error = None;
            s.last_error_kind = None;
        });

        let result = self.fetch(&combined).await;

        let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        let status = if remaining == 0 {
            PollStatus::Idle
        } else {
            PollStatus::Fetching
        };

        if self.is_stale(generation) {
            debug!(generation, "Discarding result of cancelled poll");
            self.state.send_modify(|s| s.status = status);
            return PollOutcome::Stale;
        }

        let source = self.api.data_source();
        match result {
            Ok(current) => {
                let reading = current.reading;
                info!(
                    timestamp = reading.timestamp,
                    fields = reading.reported_fields(),
                    station = %current.station.display_name(),
                    "Weather data updated"
                );
                self.telemetry.track_reading(&current);
                self.append_history(reading).await;
                self.state.send_modify(|s| {
                    s.status = status;
                    s.current = Some(current);
                });
                self.telemetry.track_weather_update(source, true, None);
                PollOutcome::Updated(reading)
            }
            Err(e) => {
                let kind = e.kind();
                let message = e.to_string();
                warn!(error = %message, ?kind, "Weather API error");

                let attrs = attributes([
                    ("context", Value::from("weather_data_fetch")),
                    ("data_source", Value::from(source.as_str())),
                ]);
                match &e {
                    FetchError::Network(cause) => self.telemetry.add_error(&**cause, attrs),
                    other => self.telemetry.add_error(other, attrs),
                }
                self.telemetry
                    .track_weather_update(source, false, Some(&message));

                self.state.send_modify(|s| {
                    s.status = status;
                    s.error = Some(message);
                    s.last_error_kind = Some(kind);
                });
                PollOutcome::Failed(kind)
            }
        }
    }

    /// Store writes block, so they run off the async workers
    async fn append_history(&self, reading: Reading) {
        let cache = Arc::clone(&self.cache);
        if let Err(e) = tokio::task::spawn_blocking(move || cache.append(reading)).await {
            warn!(error = %e, "History append task failed");
        }
    }

    async fn fetch(&self, combined: &str) -> FetchResult<CurrentConditions> {
        let credentials = Credentials::parse(combined)?;
        let devices = self.api.list_devices(&credentials).await?;

        let device = devices.into_iter().next().ok_or(FetchError::NoDevices)?;
        let observation = device.last_data.as_ref().ok_or_else(|| {
            FetchError::NoData(
                device
                    .mac_address
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            )
        })?;

        let now = now_millis();
        Ok(CurrentConditions {
            reading: normalize(observation, now),
            station: device.station_info(),
            last_updated: now,
        })
    }
}
