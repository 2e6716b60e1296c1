//! Core data types for station readings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp type (Unix epoch milliseconds)
pub type Timestamp = i64;

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// One normalized snapshot of station measurements.
///
/// Every measurement is optional: `None` means the station did not report
/// the field, while a reported zero stays `Some(0.0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Observation time (epoch milliseconds)
    pub timestamp: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feels_like: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dew_point: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_index: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solar_radiation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_rain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_temperature: Option<f64>,
}

impl Reading {
    /// Empty reading at the given time
    pub fn at(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    /// Value of a field, `None` if the station did not report it
    pub fn get(&self, field: WeatherField) -> Option<f64> {
        match field {
            WeatherField::Temperature => self.temperature,
            WeatherField::FeelsLike => self.feels_like,
            WeatherField::Humidity => self.humidity,
            WeatherField::WindSpeed => self.wind_speed,
            WeatherField::WindDirection => self.wind_direction,
            WeatherField::Pressure => self.pressure,
            WeatherField::DewPoint => self.dew_point,
            WeatherField::UvIndex => self.uv_index,
            WeatherField::SolarRadiation => self.solar_radiation,
            WeatherField::DailyRain => self.daily_rain,
            WeatherField::SoilMoisture => self.soil_moisture,
            WeatherField::SoilTemperature => self.soil_temperature,
        }
    }

    /// Set (or clear) a field
    pub fn set(&mut self, field: WeatherField, value: Option<f64>) {
        let slot = match field {
            WeatherField::Temperature => &mut self.temperature,
            WeatherField::FeelsLike => &mut self.feels_like,
            WeatherField::Humidity => &mut self.humidity,
            WeatherField::WindSpeed => &mut self.wind_speed,
            WeatherField::WindDirection => &mut self.wind_direction,
            WeatherField::Pressure => &mut self.pressure,
            WeatherField::DewPoint => &mut self.dew_point,
            WeatherField::UvIndex => &mut self.uv_index,
            WeatherField::SolarRadiation => &mut self.solar_radiation,
            WeatherField::DailyRain => &mut self.daily_rain,
            WeatherField::SoilMoisture => &mut self.soil_moisture,
            WeatherField::SoilTemperature => &mut self.soil_temperature,
        };
        *slot = value;
    }

    /// Builder-style variant of [`Reading::set`]
    pub fn with(mut self, field: WeatherField, value: f64) -> Self {
        self.set(field, Some(value));
        self
    }

    /// Value of a field with absence mapped to 0
    pub fn value_or_zero(&self, field: WeatherField) -> f64 {
        self.get(field).unwrap_or(0.0)
    }

    /// Number of fields the station reported
    pub fn reported_fields(&self) -> usize {
        WeatherField::ALL
            .iter()
            .filter(|f| self.get(**f).is_some())
            .count()
    }
}

/// Named numeric fields of a [`Reading`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeatherField {
    Temperature,
    FeelsLike,
    Humidity,
    WindSpeed,
    WindDirection,
    Pressure,
    DewPoint,
    UvIndex,
    SolarRadiation,
    DailyRain,
    SoilMoisture,
    SoilTemperature,
}

impl WeatherField {
    pub const ALL: [WeatherField; 12] = [
        WeatherField::Temperature,
        WeatherField::FeelsLike,
        WeatherField::Humidity,
        WeatherField::WindSpeed,
        WeatherField::WindDirection,
        WeatherField::Pressure,
        WeatherField::DewPoint,
        WeatherField::UvIndex,
        WeatherField::SolarRadiation,
        WeatherField::DailyRain,
        WeatherField::SoilMoisture,
        WeatherField::SoilTemperature,
    ];

    /// Storage key (matches the serialized `Reading` attribute)
    pub fn key(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::FeelsLike => "feelsLike",
            Self::Humidity => "humidity",
            Self::WindSpeed => "windSpeed",
            Self::WindDirection => "windDirection",
            Self::Pressure => "pressure",
            Self::DewPoint => "dewPoint",
            Self::UvIndex => "uvIndex",
            Self::SolarRadiation => "solarRadiation",
            Self::DailyRain => "dailyRain",
            Self::SoilMoisture => "soilMoisture",
            Self::SoilTemperature => "soilTemperature",
        }
    }
}

impl fmt::Display for WeatherField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown weather field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for WeatherField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WeatherField::ALL
            .iter()
            .copied()
            .find(|f| f.key() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Station metadata from the device listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

impl StationInfo {
    /// Display name, falling back to coordinates, then "unknown"
    pub fn display_name(&self) -> String {
        match (&self.name, self.latitude, self.longitude) {
            (Some(name), _, _) if !name.is_empty() => name.clone(),
            (_, Some(lat), Some(lon)) => format!("{:.2}, {:.2}", lat, lon),
            _ => "unknown".to_string(),
        }
    }
}

/// Latest successful poll: reading plus the station it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub reading: Reading,
    pub station: StationInfo,
    /// When the poll completed (epoch milliseconds)
    pub last_updated: Timestamp,
}
