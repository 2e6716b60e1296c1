//! Plain-text and JSON reports

use crate::projector::{project, SeriesRequest, COMPACT_POINTS};
use chrono::{DateTime, TimeZone, Utc};
use dash_core::{CardConfig, CurrentConditions, Reading, Timestamp, WeatherField};
use serde_json::{json, Value};
use std::fmt::Display;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NOT_AVAILABLE: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }

    /// Export file name, e.g. `weather-data-2024-01-15.txt`
    pub fn file_name<Tz: TimeZone>(&self, generated_at: Timestamp, tz: &Tz) -> String
    where
        Tz::Offset: Display,
    {
        let date = to_local(generated_at, tz)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!("weather-data-{}.{}", date, self.extension())
    }
}

fn to_local<Tz: TimeZone>(timestamp: Timestamp, tz: &Tz) -> Option<DateTime<Tz>> {
    Utc.timestamp_millis_opt(timestamp)
        .single()
        .map(|utc| utc.with_timezone(tz))
}

fn format_time<Tz: TimeZone>(timestamp: Timestamp, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    to_local(timestamp, tz)
        .map(|dt| dt.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Field value with its display unit; rainfall is spelled out in reports
fn field_value(reading: &Reading, field: WeatherField) -> String {
    match (field, reading.get(field)) {
        (WeatherField::DailyRain, Some(v)) => format!("{:.2} inches", v),
        (field, v) => field.format_value(v),
    }
}

/// Human-readable report of the current conditions and stored history
pub fn text_report<Tz: TimeZone>(
    current: Option<&CurrentConditions>,
    history: &[Reading],
    generated_at: Timestamp,
    tz: &Tz,
) -> String
where
    Tz::Offset: Display,
{
    use WeatherField::*;

    let reading = current.map(|c| c.reading).unwrap_or_default();
    let field = |f: WeatherField| field_value(&reading, f);

    let last_updated = current
        .map(|c| format_time(c.last_updated, tz))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let station = current
        .map(|c| c.station.display_name())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let mut lines = vec![
        "=== WEATHER DATA REPORT ===".to_string(),
        format!("Generated: {}", format_time(generated_at, tz)),
        format!("Last Updated: {}", last_updated),
        format!("Station: {}", station),
        String::new(),
        "=== TEMPERATURE ===".to_string(),
        format!("Current Temperature: {}", field(Temperature)),
        format!("Feels Like: {}", field(FeelsLike)),
        format!("Dew Point: {}", field(DewPoint)),
        String::new(),
        "=== MOISTURE ===".to_string(),
        format!("Humidity: {}", field(Humidity)),
        format!("Daily Rainfall: {}", field(DailyRain)),
        String::new(),
        "=== SOIL CONDITIONS ===".to_string(),
        format!("Soil Moisture: {}", field(SoilMoisture)),
        format!("Soil Temperature: {}", field(SoilTemperature)),
        String::new(),
        "=== WIND ===".to_string(),
        format!("Wind Speed: {}", field(WindSpeed)),
        format!("Wind Direction: {}", field(WindDirection)),
        String::new(),
        "=== ATMOSPHERIC ===".to_string(),
        format!("Barometric Pressure: {}", field(Pressure)),
        format!("UV Index: {}", field(UvIndex)),
        format!("Solar Radiation: {}", field(SolarRadiation)),
        String::new(),
        "=== HISTORY ===".to_string(),
        format!("Points: {}", history.len()),
    ];

    match (history.first(), history.last()) {
        (Some(first), Some(last)) => lines.push(format!(
            "Range: {} to {}",
            format_time(first.timestamp, tz),
            format_time(last.timestamp, tz)
        )),
        _ => lines.push(format!("Range: {}", NOT_AVAILABLE)),
    }

    for r in history {
        lines.push(format!(
            "{} | temp {} | humidity {} | pressure {} | wind {}",
            format_time(r.timestamp, tz),
            field_value(r, Temperature),
            field_value(r, Humidity),
            field_value(r, Pressure),
            field_value(r, WindSpeed),
        ));
    }

    lines.push(String::new());
    lines.push("=== END REPORT ===".to_string());
    lines.join("\n")
}

/// Machine-readable report: current conditions, history, and one compact
/// chart series per card in card order
pub fn json_report<Tz: TimeZone>(
    current: Option<&CurrentConditions>,
    history: &[Reading],
    cards: &[CardConfig],
    generated_at: Timestamp,
    tz: &Tz,
) -> Value
where
    Tz::Offset: Display,
{
    let current_reading = current.map(|c| &c.reading);
    let series: Vec<Value> = cards
        .iter()
        .filter_map(|card| SeriesRequest::for_card(card, COMPACT_POINTS))
        .map(|request| project(history, current_reading, &request, tz))
        .map(|s| serde_json::to_value(s).unwrap_or(Value::Null))
        .collect();

    json!({
        "generatedAt": to_local(generated_at, tz).map(|dt| dt.to_rfc3339()),
        "lastUpdated": current.and_then(|c| to_local(c.last_updated, tz)).map(|dt| dt.to_rfc3339()),
        "station": current.map(|c| &c.station),
        "current": current_reading,
        "history": history,
        "cards": series,
    })
}
