//! Chart series projection
//!
//! Turns the reading history into a `(label, value)` series for one field.
//! Pure data; rendering is left to the consumer.

use chrono::{TimeZone, Utc};
use dash_core::{CardConfig, Reading, Timestamp, WeatherField};
use serde::Serialize;

/// Points shown in a compact card chart
pub const COMPACT_POINTS: usize = 12;
/// Points shown in a detail chart
pub const DETAIL_POINTS: usize = 24;
/// Points shown in an extended detail chart
pub const EXTENDED_POINTS: usize = 48;

const LABEL_FORMAT: &str = "%I:%M %p";
const FILL_ALPHA: &str = "20";

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub field: WeatherField,
    pub points: usize,
    pub color: String,
}

impl SeriesRequest {
    pub fn new(field: WeatherField, points: usize, color: impl Into<String>) -> Self {
        Self {
            field,
            points,
            color: color.into(),
        }
    }

    /// Compact request for a card, `None` if the card names an unknown field
    pub fn for_card(card: &CardConfig, points: usize) -> Option<Self> {
        card.weather_field()
            .map(|field| Self::new(field, points, card.color.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: Timestamp,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub field: WeatherField,
    pub title: String,
    pub color: String,
    pub fill_color: String,
    pub points: Vec<SeriesPoint>,
}

impl ChartSeries {
    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Format a timestamp as a chart label in the given zone
pub fn time_label<Tz: TimeZone>(timestamp: Timestamp, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match Utc.timestamp_millis_opt(timestamp).single() {
        Some(utc) => utc.with_timezone(tz).format(LABEL_FORMAT).to_string(),
        None => String::new(),
    }
}

/// Project the last `request.points` history readings that carry the field.
///
/// With fewer than two usable history points, the series falls back to a
/// single point taken from `current`; it is empty when `current` is absent
/// or lacks the field.
pub fn project<Tz: TimeZone>(
    history: &[Reading],
    current: Option<&Reading>,
    request: &SeriesRequest,
    tz: &Tz,
) -> ChartSeries
where
    Tz::Offset: std::fmt::Display,
{
    let field = request.field;
    let point = |reading: &Reading, value: f64| SeriesPoint {
        timestamp: reading.timestamp,
        label: time_label(reading.timestamp, tz),
        value,
    };

    let mut points: Vec<SeriesPoint> = history
        .iter()
        .filter_map(|r| r.get(field).map(|v| point(r, v)))
        .collect();

    if points.len() > request.points {
        points.drain(0..points.len() - request.points);
    }

    if points.len() < 2 {
        points = current
            .and_then(|r| r.get(field).map(|v| point(r, v)))
            .into_iter()
            .collect();
    }

    ChartSeries {
        field,
        title: field.title().to_string(),
        color: request.color.clone(),
        fill_color: format!("{}{}", request.color, FILL_ALPHA),
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    const MINUTE: Timestamp = 60 * 1000;
    // 2024-01-15T15:05:00Z
    const BASE: Timestamp = 1_705_331_100_000;

    fn history(values: &[Option<f64>]) -> Vec<Reading> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut r = Reading::at(BASE + i as Timestamp * 5 * MINUTE);
                r.set(WeatherField::Temperature, *v);
                r
            })
            .collect()
    }

    fn request(points: usize) -> SeriesRequest {
        SeriesRequest::new(WeatherField::Temperature, points, "#f97316")
    }

    #[test]
    fn test_keeps_last_points_in_order() {
        let values: Vec<Option<f64>> = (0..30).map(|i| Some(i as f64)).collect();
        let series = project(&history(&values), None, &request(COMPACT_POINTS), &Utc);

        assert_eq!(series.points.len(), COMPACT_POINTS);
        assert_eq!(series.values().first(), Some(&18.0));
        assert_eq!(series.values().last(), Some(&29.0));
        assert!(series.points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_absent_values_are_skipped() {
        let series = project(
            &history(&[Some(1.0), None, Some(0.0), None]),
            None,
            &request(DETAIL_POINTS),
            &Utc,
        );
        assert_eq!(series.values(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_fallback_to_current_reading() {
        let current = Reading::at(BASE).with(WeatherField::Temperature, 72.5);
        let series = project(&history(&[Some(70.0)]), Some(&current), &request(COMPACT_POINTS), &Utc);

        assert_eq!(series.values(), vec![72.5]);
        assert_eq!(series.labels(), vec!["03:05 PM"]);
    }

    #[test]
    fn test_empty_history_yields_single_current_point() {
        let current = Reading::at(BASE).with(WeatherField::Temperature, 72.5);
        let series = project(&[], Some(&current), &request(COMPACT_POINTS), &Utc);

        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].value, 72.5);
        assert_eq!(series.points[0].timestamp, BASE);
        assert_eq!(series.labels(), vec!["03:05 PM"]);
    }

    #[test]
    fn test_fallback_without_current_is_empty() {
        let series = project(&[], None, &request(COMPACT_POINTS), &Utc);
        assert!(series.is_empty());

        let current = Reading::at(BASE).with(WeatherField::Humidity, 40.0);
        let series = project(&[], Some(&current), &request(COMPACT_POINTS), &Utc);
        assert!(series.is_empty());
    }

    #[test]
    fn test_labels_follow_time_zone() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(time_label(BASE, &tz), "10:05 AM");
        assert_eq!(time_label(BASE, &Utc), "03:05 PM");
    }

    #[test]
    fn test_series_metadata() {
        let series = project(&history(&[Some(1.0), Some(2.0)]), None, &request(EXTENDED_POINTS), &Utc);
        assert_eq!(series.title, "Temperature");
        assert_eq!(series.color, "#f97316");
        assert_eq!(series.fill_color, "#f9731620");
    }

    #[test]
    fn test_request_for_card() {
        let card = dash_core::default_card_order().remove(0);
        let request = SeriesRequest::for_card(&card, COMPACT_POINTS).unwrap();
        assert_eq!(request.field, WeatherField::SoilMoisture);
        assert_eq!(request.color, "#10b981");

        let mut unknown = card;
        unknown.field = "rainbow".to_string();
        assert!(SeriesRequest::for_card(&unknown, COMPACT_POINTS).is_none());
    }
}
