//! Station dashboard daemon
//!
//! This binary coordinates:
//! - Polling the station account on the configured interval
//! - Keeping the local reading history
//! - Writing reports and the metrics textfile after each update

use anyhow::{Context, Result};
use chrono::Local;
use dash_config::{credential_from_env, AppConfig, StationSource, StorageBackend};
use dash_core::{now_millis, Timestamp};
use dash_daemon::{write_atomic, Poller, ReportWriter};
use dash_history::HistoricalCache;
use dash_ingest::{AmbientClient, SimulatedStation, StationApi};
use dash_obs::{FanoutTelemetry, LogTelemetry, MetricsTelemetry, Telemetry};
use dash_store::{CardOrderStore, CredentialStore, FileStore, KvStore, MemoryStore, SqliteStore};
use std::sync::Arc;
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "stationdash";

/// Placeholder credential so the simulator polls without an account
const SIMULATOR_CREDENTIAL: &str = "simulator:simulator";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    dash_obs::init(SERVICE_NAME, config.log_format()?);

    info!("Starting station dashboard daemon");

    let store = open_store(&config)?;
    let cache = Arc::new(HistoricalCache::new(store.clone()));
    let credentials = CredentialStore::new(store.clone());
    let cards = CardOrderStore::new(store);

    if let Some(credential) = credential_from_env() {
        info!("Using credential from environment");
        credentials.set(&credential);
    }

    let metrics = Arc::new(MetricsTelemetry::new(SERVICE_NAME)?);
    let telemetry: Arc<dyn Telemetry> = Arc::new(
        FanoutTelemetry::new()
            .with(Arc::new(LogTelemetry))
            .with(metrics.clone()),
    );

    let api: Arc<dyn StationApi> = match config.station_source()? {
        StationSource::Ambient => Arc::new(
            AmbientClient::with_base_url(&config.api_base(), telemetry.clone())
                .context("Failed to create station API client")?,
        ),
        StationSource::Simulator => {
            if !credentials.has_credential() {
                credentials.set(SIMULATOR_CREDENTIAL);
            }
            Arc::new(SimulatedStation::new(config.simulator_seed()))
        }
    };
    info!(source = api.name(), "Station source ready");

    if !credentials.has_credential() {
        warn!("No API credential configured; set DASH_CREDENTIAL to apiKey:applicationKey");
    }

    let poller = Poller::new(api, cache.clone(), credentials, telemetry.clone())
        .with_interval(config.refresh_interval()?);

    let backfill_hours = config.backfill_hours();
    if backfill_hours > 0 {
        match poller.backfill(backfill_hours).await {
            Ok(count) => info!(count, hours = backfill_hours, "Historical data loaded"),
            Err(e) => warn!(error = %e, "Historical backfill failed"),
        }
    }

    let writer = ReportWriter::new(config.export_dir())?;
    let metrics_file = config.metrics_file();

    let mut updates = poller.subscribe();
    poller.start();
    telemetry.track_page_view("dashboard");

    info!("Daemon running - press Ctrl+C to stop");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut last_exported: Option<Timestamp> = None;
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if let Some(error) = &state.error {
                    warn!(error = %error, kind = ?state.last_error_kind, "Poll failed");
                }
                let Some(current) = state.current else { continue };
                if last_exported == Some(current.last_updated) {
                    continue;
                }
                last_exported = Some(current.last_updated);

                let history = cache.read_all();
                match writer.write(Some(&current), &history, &cards.get_card_order(), now_millis(), &Local) {
                    Ok(paths) => info!(?paths, "Reports written"),
                    Err(e) => error!(error = %e, "Failed to write reports"),
                }
                if let Some(path) = &metrics_file {
                    if let Err(e) = write_atomic(path, &metrics.render()) {
                        error!(error = %e, "Failed to write metrics file");
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    poller.stop();
    info!("Station dashboard daemon stopped");
    Ok(())
}

fn open_store(config: &AppConfig) -> Result<Arc<dyn KvStore>> {
    let path = config.storage_path();
    let store: Arc<dyn KvStore> = match config.storage_backend()? {
        StorageBackend::File => Arc::new(
            FileStore::new(&path)
                .with_context(|| format!("Failed to open file store at {}", path.display()))?,
        ),
        StorageBackend::Sqlite => {
            std::fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let db = path.join("stationdash.db");
            Arc::new(
                SqliteStore::new(&db)
                    .with_context(|| format!("Failed to open SQLite store at {}", db.display()))?,
            )
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    info!(path = %path.display(), "Storage opened");
    Ok(store)
}

/// Resolves on Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
