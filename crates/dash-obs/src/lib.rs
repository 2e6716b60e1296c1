//! Observability: log initialization and the telemetry collaborator

pub mod metrics;
pub mod telemetry;

pub use metrics::MetricsTelemetry;
pub use telemetry::*;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when RUST_LOG is unset
pub const DEFAULT_FILTER: &str = "info,dash_daemon=debug,dash_ingest=debug";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable multi-line output
    Pretty,
}

/// Initialize logging.
/// - RUST_LOG respected; default to [`DEFAULT_FILTER`]
/// - JSON lines by default, pretty output for interactive runs
pub fn init(service_name: &str, format: LogFormat) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let registry = tracing_subscriber::registry().with(EnvFilter::new(env_filter));

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
    }

    tracing::info!(service = %service_name, ?format, "Observability initialized");
}
