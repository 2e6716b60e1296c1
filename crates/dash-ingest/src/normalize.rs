//! Mapping of raw station observations onto [`Reading`]

use crate::Observation;
use dash_core::{Reading, Timestamp, WeatherField};

/// Source keys for each reading field, in priority order.
///
/// Stations differ in how they name auxiliary sensors, so some fields
/// have several candidates; the first key present wins.
pub fn source_keys(field: WeatherField) -> &'static [&'static str] {
    match field {
        WeatherField::Temperature => &["tempf"],
        WeatherField::FeelsLike => &["feelsLike"],
        WeatherField::Humidity => &["humidity"],
        WeatherField::WindSpeed => &["windspeedmph"],
        WeatherField::WindDirection => &["winddir"],
        WeatherField::Pressure => &["baromin", "baromrelin", "baromabsin"],
        WeatherField::DewPoint => &["dewPoint"],
        WeatherField::UvIndex => &["uv"],
        WeatherField::SolarRadiation => &["solarradiation"],
        WeatherField::DailyRain => &["dailyrainin"],
        WeatherField::SoilMoisture => &["soilhum1", "soilmoisture1", "soilhum", "Soil 1"],
        WeatherField::SoilTemperature => &["soiltemp1f", "soiltemp1", "soiltempf", "Soil Temp 1"],
    }
}

/// First candidate key carrying a usable value
pub fn resolve(observation: &Observation, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| observation.number(key))
}

/// Build a reading from a raw observation.
///
/// The timestamp comes from the observation when it carries one, else
/// `now_ms`. Fields none of whose keys are present stay `None`.
pub fn normalize(observation: &Observation, now_ms: Timestamp) -> Reading {
    let mut reading = Reading::at(observation.timestamp().unwrap_or(now_ms));
    for field in WeatherField::ALL {
        reading.set(field, resolve(observation, source_keys(field)));
    }
    reading
}
