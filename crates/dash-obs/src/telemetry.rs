//! Fire-and-forget telemetry events
//!
//! Telemetry is explicitly constructed and handed to the components that
//! report through it. Implementations must never fail the caller: every
//! method returns `()` and swallows its own errors.

use dash_core::{CurrentConditions, WeatherField};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

/// Flat attribute mapping attached to an event
pub type Attributes = Map<String, Value>;

/// Origin of a weather update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Api,
    Mock,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Api => "api",
            DataSource::Mock => "mock",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalAction {
    Open,
    Close,
}

impl ModalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModalAction::Open => "open",
            ModalAction::Close => "close",
        }
    }
}

/// Build an attribute map from key/value pairs
pub fn attributes<I, K>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

pub trait Telemetry: Send + Sync {
    /// Record a named action
    fn add_action(&self, name: &str, attributes: Attributes);

    /// Record an error with its original value
    fn add_error(&self, error: &(dyn StdError + 'static), attributes: Attributes);

    fn track_page_view(&self, page: &str) {
        self.add_action("page_view", attributes([("page", Value::from(page))]));
    }

    fn track_api_call(&self, url: &str, method: &str, status: u16, duration: Duration) {
        self.add_action(
            "api_call",
            attributes([
                ("url", Value::from(url)),
                ("method", Value::from(method)),
                ("status", Value::from(status)),
                ("duration", Value::from(duration.as_millis() as u64)),
            ]),
        );
    }

    fn track_weather_update(&self, source: DataSource, success: bool, error: Option<&str>) {
        self.add_action(
            "weather_data_update",
            attributes([
                ("data_source", Value::from(source.as_str())),
                ("success", Value::from(success)),
                ("error", error.map(Value::from).unwrap_or(Value::Null)),
            ]),
        );
    }

    fn track_user_interaction(&self, action: &str, target: &str, value: Option<Value>) {
        self.add_action(
            "user_interaction",
            attributes([
                ("action", Value::from(action)),
                ("target", Value::from(target)),
                ("value", value.unwrap_or(Value::Null)),
            ]),
        );
    }

    fn track_chart_interaction(&self, chart_type: &str, metric: &str) {
        self.add_action(
            "chart_interaction",
            attributes([
                ("chart_type", Value::from(chart_type)),
                ("metric", Value::from(metric)),
            ]),
        );
    }

    fn track_modal_interaction(&self, action: ModalAction, modal_type: &str) {
        self.add_action(
            "modal_interaction",
            attributes([
                ("action", Value::from(action.as_str())),
                ("modal_type", Value::from(modal_type)),
            ]),
        );
    }

    /// Publish the measurements of a successful poll
    fn track_reading(&self, conditions: &CurrentConditions) {
        self.add_action("weather_reading", reading_attributes(conditions));
    }
}

/// Station tags plus every reported field keyed by its storage name
pub fn reading_attributes(conditions: &CurrentConditions) -> Attributes {
    let station = &conditions.station;
    let mut attrs = attributes([("location", Value::from(station.display_name()))]);
    if let (Some(lat), Some(lon)) = (station.latitude, station.longitude) {
        attrs.insert("lat".to_string(), Value::from(lat));
        attrs.insert("lon".to_string(), Value::from(lon));
    }
    for field in WeatherField::ALL {
        if let Some(value) = conditions.reading.get(field) {
            attrs.insert(field.key().to_string(), Value::from(value));
        }
    }
    attrs
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn add_action(&self, _name: &str, _attributes: Attributes) {}

    fn add_error(&self, _error: &(dyn StdError + 'static), _attributes: Attributes) {}
}

/// Emits every event as a structured log line
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn add_action(&self, name: &str, attributes: Attributes) {
        let attributes = Value::Object(attributes);
        tracing::info!(target: "telemetry", action = %name, %attributes);
    }

    fn add_error(&self, error: &(dyn StdError + 'static), attributes: Attributes) {
        let attributes = Value::Object(attributes);
        tracing::warn!(target: "telemetry", error = %error, %attributes, "error reported");
    }
}

/// A recorded event
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub name: String,
    pub attributes: Attributes,
}

impl RecordedEvent {
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    actions: Mutex<Vec<RecordedEvent>>,
    errors: Mutex<Vec<RecordedEvent>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<RecordedEvent> {
        self.actions.lock().clone()
    }

    /// Actions with the given name
    pub fn actions_named(&self, name: &str) -> Vec<RecordedEvent> {
        self.actions
            .lock()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Reported errors; `name` holds the error message
    pub fn errors(&self) -> Vec<RecordedEvent> {
        self.errors.lock().clone()
    }
}

impl Telemetry for MemoryTelemetry {
    fn add_action(&self, name: &str, attributes: Attributes) {
        self.actions.lock().push(RecordedEvent {
            name: name.to_string(),
            attributes,
        });
    }

    fn add_error(&self, error: &(dyn StdError + 'static), attributes: Attributes) {
        self.errors.lock().push(RecordedEvent {
            name: error.to_string(),
            attributes,
        });
    }
}

/// Forwards every event to each inner sink
#[derive(Default, Clone)]
pub struct FanoutTelemetry {
    sinks: Vec<Arc<dyn Telemetry>>,
}

impl FanoutTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn Telemetry>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Telemetry for FanoutTelemetry {
    fn add_action(&self, name: &str, attributes: Attributes) {
        for sink in &self.sinks {
            sink.add_action(name, attributes.clone());
        }
    }

    fn add_error(&self, error: &(dyn StdError + 'static), attributes: Attributes) {
        for sink in &self.sinks {
            sink.add_error(error, attributes.clone());
        }
    }

    fn track_reading(&self, conditions: &CurrentConditions) {
        for sink in &self.sinks {
            sink.track_reading(conditions);
        }
    }
}
