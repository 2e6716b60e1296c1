//! Display units and titles for weather fields
//!
//! Station values arrive in US units (°F, mph, inHg, inches) and are
//! displayed without conversion.

use crate::types::WeatherField;

/// Unit group for a weather field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitGroup {
    Temperature,
    Humidity,
    Speed,
    Direction,
    Pressure,
    Index,
    Radiation,
    Rain,
    Moisture,
}

impl UnitGroup {
    /// Suffix appended to a formatted value
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Temperature => "°F",
            Self::Humidity | Self::Moisture => "%",
            Self::Speed => " mph",
            Self::Direction => "°",
            Self::Pressure => " inHg",
            Self::Index => "",
            Self::Radiation => " W/m²",
            Self::Rain => " in",
        }
    }
}

impl WeatherField {
    /// Unit group of this field
    pub fn unit_group(&self) -> UnitGroup {
        match self {
            Self::Temperature | Self::FeelsLike | Self::DewPoint | Self::SoilTemperature => {
                UnitGroup::Temperature
            }
            Self::Humidity => UnitGroup::Humidity,
            Self::SoilMoisture => UnitGroup::Moisture,
            Self::WindSpeed => UnitGroup::Speed,
            Self::WindDirection => UnitGroup::Direction,
            Self::Pressure => UnitGroup::Pressure,
            Self::UvIndex => UnitGroup::Index,
            Self::SolarRadiation => UnitGroup::Radiation,
            Self::DailyRain => UnitGroup::Rain,
        }
    }

    /// Display suffix, e.g. `°F` or ` mph`
    pub fn unit(&self) -> &'static str {
        self.unit_group().suffix()
    }

    /// Human-readable title
    pub fn title(&self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::FeelsLike => "Feels Like",
            Self::Humidity => "Humidity",
            Self::WindSpeed => "Wind Speed",
            Self::WindDirection => "Wind Direction",
            Self::Pressure => "Pressure",
            Self::DewPoint => "Dew Point",
            Self::UvIndex => "UV Index",
            Self::SolarRadiation => "Solar Radiation",
            Self::DailyRain => "Daily Rain",
            Self::SoilMoisture => "Soil Moisture",
            Self::SoilTemperature => "Soil Temperature",
        }
    }

    /// Format a value with two decimals and its unit, `n/a` when absent
    pub fn format_value(&self, value: Option<f64>) -> String {
        match value {
            Some(v) => format!("{:.2}{}", v, self.unit()),
            None => "n/a".to_string(),
        }
    }
}
