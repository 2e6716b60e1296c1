use dash_core::RefreshInterval;
use dash_obs::LogFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "DASH_CONFIG";
/// Environment variable carrying an `apiKey:applicationKey` credential
pub const CREDENTIAL_ENV: &str = "DASH_CREDENTIAL";

pub const DEFAULT_CONFIG_PATH: &str = "stationdash.toml";
pub const DEFAULT_API_BASE: &str = "https://api.ambientweather.net";
/// Longest history backfill accepted at startup (one week)
pub const MAX_BACKFILL_HOURS: u32 = 7 * 24;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationConfig {
    pub source: Option<String>,
    pub api_base: Option<String>,
    pub refresh_minutes: Option<u64>,
    pub backfill_hours: Option<u32>,
    /// Seed for the simulated station
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: Option<String>,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    pub dir: Option<PathBuf>,
    pub metrics_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub station: Option<StationConfig>,
    pub storage: Option<StorageConfig>,
    pub export: Option<ExportConfig>,
    pub log: Option<LogConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationSource {
    Ambient,
    Simulator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Sqlite,
    Memory,
}

impl AppConfig {
    /// Load configuration from the DASH_CONFIG path (TOML) if present, with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load and validate a config file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let cfg = if path.exists() {
            let s = fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&s)?
        } else {
            AppConfig::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every enumerated setting
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.station_source()?;
        self.refresh_interval()?;
        if self.backfill_hours() > MAX_BACKFILL_HOURS {
            return Err(ConfigError::Invalid(format!(
                "backfill_hours must be at most {}",
                MAX_BACKFILL_HOURS
            )));
        }
        self.storage_backend()?;
        self.log_format()?;
        Ok(())
    }

    fn station(&self) -> StationConfig {
        self.station.clone().unwrap_or_default()
    }

    /// Station data source (default `ambient`)
    pub fn station_source(&self) -> Result<StationSource, ConfigError> {
        match self.station().source.as_deref().unwrap_or("ambient") {
            "ambient" => Ok(StationSource::Ambient),
            "simulator" => Ok(StationSource::Simulator),
            other => Err(ConfigError::Invalid(format!("unknown station source '{}'", other))),
        }
    }

    /// Station API base URL
    pub fn api_base(&self) -> String {
        self.station()
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }

    /// Poll interval; must be one of the presets (default 5 minutes)
    pub fn refresh_interval(&self) -> Result<RefreshInterval, ConfigError> {
        match self.station().refresh_minutes {
            None => Ok(RefreshInterval::default()),
            Some(m) => RefreshInterval::from_minutes(m).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "refresh_minutes must be one of 1, 5, 10, 30 or 60, got {}",
                    m
                ))
            }),
        }
    }

    /// Hours of history to fetch at startup (0 disables)
    pub fn backfill_hours(&self) -> u32 {
        self.station().backfill_hours.unwrap_or(0)
    }

    pub fn simulator_seed(&self) -> u64 {
        self.station().seed.unwrap_or(42)
    }

    /// Persistence backend (default `file`)
    pub fn storage_backend(&self) -> Result<StorageBackend, ConfigError> {
        let backend = self.storage.as_ref().and_then(|s| s.backend.as_deref());
        match backend.unwrap_or("file") {
            "file" => Ok(StorageBackend::File),
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid(format!("unknown storage backend '{}'", other))),
        }
    }

    /// Storage location (default: platform data dir)
    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .as_ref()
            .and_then(|s| s.path.clone())
            .unwrap_or_else(default_data_dir)
    }

    /// Directory for exported reports (default: `reports` under the storage path)
    pub fn export_dir(&self) -> PathBuf {
        self.export
            .as_ref()
            .and_then(|e| e.dir.clone())
            .unwrap_or_else(|| self.storage_path().join("reports"))
    }

    /// Prometheus textfile path, if metrics export is enabled
    pub fn metrics_file(&self) -> Option<PathBuf> {
        self.export.as_ref().and_then(|e| e.metrics_file.clone())
    }

    /// Log output format (default JSON)
    pub fn log_format(&self) -> Result<LogFormat, ConfigError> {
        let format = self.log.as_ref().and_then(|l| l.format.as_deref());
        match format.unwrap_or("json") {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(ConfigError::Invalid(format!("unknown log format '{}'", other))),
        }
    }
}

/// Platform data directory for stationdash, `./data` when unknown
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("stationdash"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Credential supplied through the environment, if any
pub fn credential_from_env() -> Option<String> {
    std::env::var(CREDENTIAL_ENV)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
