//! Station data sources
//!
//! This crate provides the interface for fetching readings from a weather
//! station account: the hosted Ambient Weather REST API, and a simulated
//! station for running without hardware.

pub mod ambient;
pub mod normalize;
pub mod simulator;

pub use ambient::*;
pub use normalize::*;
pub use simulator::*;

use chrono::{DateTime, Utc};
use dash_core::{CredentialError, Credentials, StationInfo, Timestamp};
use dash_obs::DataSource;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error as StdError;
use thiserror::Error;

/// Broad class of a fetch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Missing or malformed setup (credential, base URL)
    Configuration,
    /// The request did not complete successfully
    Transport,
    /// The response was not usable
    Data,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    InvalidCredential(#[from] CredentialError),

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("History range of {0} hours is out of bounds")]
    InvalidRange(u32),

    #[error("API request failed with status {status}: {status_text}")]
    Http { status: u16, status_text: String },

    #[error("{0}")]
    Network(#[source] Box<dyn StdError + Send + Sync>),

    #[error("No devices found for this account")]
    NoDevices,

    #[error("Invalid API response: {0}")]
    Parse(String),

    #[error("Device {0} reported no current data")]
    NoData(String),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::InvalidCredential(_)
            | FetchError::InvalidBaseUrl(_)
            | FetchError::InvalidRange(_) => ErrorKind::Configuration,
            FetchError::Http { .. } | FetchError::Network(_) => ErrorKind::Transport,
            FetchError::NoDevices | FetchError::Parse(_) | FetchError::NoData(_) => {
                ErrorKind::Data
            }
        }
    }

    pub fn network<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        FetchError::Network(Box::new(error))
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Raw measurement object as returned by the station API.
///
/// Values are kept as JSON; the typed accessors accept numbers and numeric
/// strings and treat anything else as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Observation(pub Map<String, Value>);

impl Observation {
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Observation time from `dateutc` (epoch ms), falling back to the ISO
    /// `date` attribute. A `dateutc` outside the representable calendar
    /// range counts as missing.
    pub fn timestamp(&self) -> Option<Timestamp> {
        let dateutc = self
            .number("dateutc")
            .filter(|ms| ms.is_finite())
            .map(|ms| ms as Timestamp)
            .filter(|ms| DateTime::<Utc>::from_timestamp_millis(*ms).is_some());
        if let Some(ms) = dateutc {
            return Some(ms);
        }
        self.0
            .get("date")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp_millis())
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Station coordinates, either flat or nested one level under `coords`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<LatLon>,
}

impl Coords {
    pub fn lat_lon(&self) -> (Option<f64>, Option<f64>) {
        match (self.lat, self.lon, self.coords) {
            (Some(lat), Some(lon), _) => (Some(lat), Some(lon)),
            (_, _, Some(nested)) => (nested.lat, nested.lon),
            (lat, lon, None) => (lat, lon),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub coords: Option<Coords>,
}

/// One station registered to an account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub info: DeviceInfo,
    #[serde(default)]
    pub last_data: Option<Observation>,
}

impl Device {
    pub fn station_info(&self) -> StationInfo {
        let (latitude, longitude) = self
            .info
            .coords
            .as_ref()
            .map(Coords::lat_lon)
            .unwrap_or((None, None));
        StationInfo {
            name: self.info.name.clone(),
            latitude,
            longitude,
            mac_address: self.mac_address.clone(),
        }
    }
}

/// Source of station data
#[async_trait::async_trait]
pub trait StationApi: Send + Sync {
    /// Source name/identifier
    fn name(&self) -> &str;

    /// Origin reported with weather update telemetry
    fn data_source(&self) -> DataSource {
        DataSource::Api
    }

    /// Every device on the account, each with its latest observation
    async fn list_devices(&self, credentials: &Credentials) -> FetchResult<Vec<Device>>;

    /// Observations recorded between `start` and `end`
    async fn fetch_history(
        &self,
        credentials: &Credentials,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> FetchResult<Vec<Observation>>;
}
