//! Card layout: which reading field each card shows, and in what order

use crate::types::WeatherField;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Display configuration of one summary card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardConfig {
    pub id: String,
    pub title: String,
    /// Reading field key (see [`WeatherField::key`])
    pub field: String,
    pub color: String,
    pub gradient: String,
}

impl CardConfig {
    fn new(field: WeatherField, color: &str, gradient: &str) -> Self {
        Self {
            id: field.key().to_string(),
            title: field.title().to_string(),
            field: field.key().to_string(),
            color: color.to_string(),
            gradient: gradient.to_string(),
        }
    }

    /// The reading field this card visualizes, if it is a known one
    pub fn weather_field(&self) -> Option<WeatherField> {
        self.field.parse().ok()
    }
}

/// Default card order
pub fn default_card_order() -> Vec<CardConfig> {
    use WeatherField::*;
    vec![
        CardConfig::new(SoilMoisture, "#10b981", "from-green-600 to-emerald-600"),
        CardConfig::new(SoilTemperature, "#059669", "from-emerald-600 to-green-700"),
        CardConfig::new(FeelsLike, "#ef4444", "from-red-500 to-pink-500"),
        CardConfig::new(Temperature, "#f97316", "from-orange-500 to-red-500"),
        CardConfig::new(Humidity, "#06b6d4", "from-blue-500 to-cyan-500"),
        CardConfig::new(WindSpeed, "#6b7280", "from-gray-500 to-slate-600"),
        CardConfig::new(WindDirection, "#374151", "from-slate-600 to-gray-700"),
        CardConfig::new(Pressure, "#8b5cf6", "from-purple-500 to-indigo-500"),
        CardConfig::new(DewPoint, "#14b8a6", "from-teal-500 to-green-500"),
        CardConfig::new(UvIndex, "#eab308", "from-yellow-500 to-orange-500"),
        CardConfig::new(SolarRadiation, "#f59e0b", "from-amber-500 to-yellow-500"),
        CardConfig::new(DailyRain, "#2563eb", "from-blue-600 to-blue-800"),
    ]
}

/// Complete a stored card order with any default card it lacks.
///
/// The stored order is kept as-is; default cards whose id is missing are
/// appended at the end, in default order.
pub fn repair_card_order(stored: Vec<CardConfig>) -> Vec<CardConfig> {
    let present: HashSet<String> = stored.iter().map(|c| c.id.clone()).collect();
    let missing = default_card_order()
        .into_iter()
        .filter(|card| !present.contains(&card.id));

    let mut order = stored;
    order.extend(missing);
    order
}
