//! Telemetry exported as Prometheus metrics via OpenTelemetry
//!
//! Event counters go through an OpenTelemetry meter. The latest value of
//! every weather field is a plain Prometheus gauge in the same registry,
//! labelled with the station location and coordinates.

use crate::telemetry::{Attributes, Telemetry};
use anyhow::Result;
use dash_core::{CurrentConditions, WeatherField};
use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
use opentelemetry::KeyValue;
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use serde_json::Value;
use std::error::Error as StdError;

pub struct MetricsTelemetry {
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    actions_total: Counter<u64>,
    weather_updates_total: Counter<u64>,
    api_calls_total: Counter<u64>,
    api_call_duration: Histogram<f64>,
    errors_total: Counter<u64>,
    weather: Vec<(WeatherField, GaugeVec)>,
}

const STATION_LABELS: [&str; 3] = ["location", "lat", "lon"];

/// Gauge name for a field, e.g. `weather_temperature_fahrenheit`
pub fn gauge_name(field: WeatherField) -> &'static str {
    match field {
        WeatherField::Temperature => "weather_temperature_fahrenheit",
        WeatherField::FeelsLike => "weather_feels_like_fahrenheit",
        WeatherField::Humidity => "weather_humidity_percent",
        WeatherField::WindSpeed => "weather_wind_speed_mph",
        WeatherField::WindDirection => "weather_wind_direction_degrees",
        WeatherField::Pressure => "weather_pressure_inhg",
        WeatherField::DewPoint => "weather_dew_point_fahrenheit",
        WeatherField::UvIndex => "weather_uv_index",
        WeatherField::SolarRadiation => "weather_solar_radiation_wm2",
        WeatherField::DailyRain => "weather_daily_rain_inches",
        WeatherField::SoilMoisture => "weather_soil_moisture_percent",
        WeatherField::SoilTemperature => "weather_soil_temperature_fahrenheit",
    }
}

impl MetricsTelemetry {
    pub fn new(service_name: &str) -> Result<Self> {
        let registry = Registry::new();
        let reader = exporter().with_registry(registry.clone()).build()?;
        let provider = SdkMeterProvider::builder().with_reader(reader).build();
        let meter = provider.meter(service_name.to_string());

        let actions_total = meter
            .u64_counter("dash_actions")
            .with_description("Telemetry actions by name")
            .init();
        let weather_updates_total = meter
            .u64_counter("dash_weather_updates")
            .with_description("Weather data updates by outcome")
            .init();
        let api_calls_total = meter
            .u64_counter("dash_api_calls")
            .with_description("Station API calls by HTTP status")
            .init();
        let api_call_duration = meter
            .f64_histogram("dash_api_call_duration_ms")
            .with_description("Station API call latency in milliseconds")
            .init();
        let errors_total = meter
            .u64_counter("dash_errors")
            .with_description("Errors reported through telemetry")
            .init();

        let mut weather = Vec::with_capacity(WeatherField::ALL.len());
        for field in WeatherField::ALL {
            let opts = Opts::new(gauge_name(field), format!("Latest {} reading", field.title()));
            let gauge = GaugeVec::new(opts, &STATION_LABELS)?;
            registry.register(Box::new(gauge.clone()))?;
            weather.push((field, gauge));
        }

        Ok(Self {
            registry,
            provider,
            actions_total,
            weather_updates_total,
            api_calls_total,
            api_call_duration,
            errors_total,
            weather,
        })
    }

    /// Prometheus text exposition of every metric recorded so far
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buf) {
            tracing::warn!(error = ?e, "failed to encode metrics");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Telemetry for MetricsTelemetry {
    fn add_action(&self, name: &str, attributes: Attributes) {
        self.actions_total
            .add(1, &[KeyValue::new("action", name.to_string())]);

        match name {
            "weather_data_update" => {
                let success = attributes
                    .get("success")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let source = attributes
                    .get("data_source")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                self.weather_updates_total.add(
                    1,
                    &[
                        KeyValue::new("success", success),
                        KeyValue::new("data_source", source),
                    ],
                );
            }
            "api_call" => {
                let status = attributes
                    .get("status")
                    .and_then(Value::as_i64)
                    .unwrap_or_default();
                self.api_calls_total
                    .add(1, &[KeyValue::new("status", status)]);
                if let Some(ms) = attributes.get("duration").and_then(Value::as_f64) {
                    self.api_call_duration.record(ms, &[]);
                }
            }
            _ => {}
        }
    }

    fn add_error(&self, _error: &(dyn StdError + 'static), _attributes: Attributes) {
        self.errors_total.add(1, &[]);
    }

    fn track_reading(&self, conditions: &CurrentConditions) {
        let station = &conditions.station;
        let location = station.display_name();
        let (lat, lon) = match (station.latitude, station.longitude) {
            (Some(lat), Some(lon)) => (lat.to_string(), lon.to_string()),
            _ => (String::new(), String::new()),
        };
        let labels = [location.as_str(), lat.as_str(), lon.as_str()];

        for (field, gauge) in &self.weather {
            // Only the latest station and reported fields stay exported
            gauge.reset();
            if let Some(value) = conditions.reading.get(*field) {
                gauge.with_label_values(&labels).set(value);
            }
        }
    }
}
