//! Simulated weather station for running without an account

use crate::{Device, DeviceInfo, FetchResult, Observation, StationApi};
use chrono::{DateTime, Utc};
use dash_core::{now_millis, Credentials, Timestamp};
use dash_obs::DataSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Spacing of simulated history samples (5 minutes)
const SAMPLE_INTERVAL_MS: Timestamp = 5 * 60 * 1000;

/// Station that generates synthetic observations.
///
/// Values vary pseudo-randomly around realistic baselines. The same seed
/// and sample time always produce the same observation.
pub struct SimulatedStation {
    seed: u64,
    name: String,
}

impl SimulatedStation {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            name: "Simulated Station".to_string(),
        }
    }

    /// Observation at a given time
    pub fn observation_at(&self, timestamp: Timestamp) -> Observation {
        let slot = (timestamp / SAMPLE_INTERVAL_MS) as u64;
        let mut rng = StdRng::seed_from_u64(self.seed ^ slot);
        let mut jitter = || rng.gen_range(-0.5_f64..0.5);

        let mut obs = Observation::default();
        obs.insert("dateutc", timestamp);
        obs.insert("tempf", round2(72.0 + jitter() * 10.0));
        obs.insert("feelsLike", round2(75.0 + jitter() * 8.0));
        obs.insert("humidity", round2(60.0 + jitter() * 30.0));
        obs.insert("windspeedmph", round2(12.5 + jitter() * 15.0));
        obs.insert("winddir", round2(180.0 + jitter() * 360.0));
        obs.insert("baromin", round2(30.15 + jitter() * 0.5));
        obs.insert("dewPoint", round2(55.0 + jitter() * 10.0));
        obs.insert("uv", round2(5.5 + jitter() * 11.0));
        obs.insert("solarradiation", round2(500.0 + jitter() * 600.0));
        obs.insert("dailyrainin", round2(1.0 + jitter() * 2.0));
        obs.insert("soilhum1", round2(35.0 + jitter() * 20.0));
        obs.insert("soiltemp1f", round2(60.0 + jitter() * 8.0));
        obs
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[async_trait::async_trait]
impl StationApi for SimulatedStation {
    fn name(&self) -> &str {
        "simulator"
    }

    fn data_source(&self) -> DataSource {
        DataSource::Mock
    }

    async fn list_devices(&self, _credentials: &Credentials) -> FetchResult<Vec<Device>> {
        Ok(vec![Device {
            mac_address: Some("00:00:00:00:00:00".to_string()),
            info: DeviceInfo {
                name: Some(self.name.clone()),
                coords: None,
            },
            last_data: Some(self.observation_at(now_millis())),
        }])
    }

    async fn fetch_history(
        &self,
        _credentials: &Credentials,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> FetchResult<Vec<Observation>> {
        let end = end.timestamp_millis();
        // Align to the sample grid; newest first, as the hosted API returns
        let mut t = end - end.rem_euclid(SAMPLE_INTERVAL_MS);
        let start = start.timestamp_millis();

        let mut samples = Vec::new();
        while t >= start {
            samples.push(self.observation_at(t));
            t -= SAMPLE_INTERVAL_MS;
        }
        tracing::debug!(samples = samples.len(), "Generated simulated history");
        Ok(samples)
    }
}
