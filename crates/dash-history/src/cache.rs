//! Bounded, deduplicated reading history

use dash_core::{Reading, Timestamp};
use dash_store::{KvStore, StoreError, HISTORY_KEY};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum stored readings (24h at 5-minute spacing)
pub const MAX_POINTS: usize = 288;

/// Minimum spacing between stored readings (5 minutes)
pub const MIN_INTERVAL_MS: Timestamp = 5 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub max_points: usize,
    pub min_interval_ms: Timestamp,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_points: MAX_POINTS,
            min_interval_ms: MIN_INTERVAL_MS,
        }
    }
}

/// Append-only reading history persisted in one store slot.
///
/// The whole sequence is read and written on every access. Failures to
/// persist are logged and otherwise ignored: losing history is
/// recoverable, interrupting the poll cycle is not.
pub struct HistoricalCache {
    store: Arc<dyn KvStore>,
    key: String,
    settings: CacheSettings,
    // Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl HistoricalCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_settings(store, CacheSettings::default())
    }

    pub fn with_settings(store: Arc<dyn KvStore>, settings: CacheSettings) -> Self {
        Self {
            store,
            key: HISTORY_KEY.to_string(),
            settings,
            write_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    /// Add a reading.
    ///
    /// The reading is dropped if it is less than the minimum interval
    /// after the last stored one. Otherwise it is appended and the oldest
    /// readings are evicted beyond capacity.
    pub fn append(&self, reading: Reading) {
        let _guard = self.write_lock.lock();
        let mut readings = self.read_all();

        if let Some(last) = readings.last() {
            if reading.timestamp < self.next_allowed(last) {
                debug!(
                    timestamp = reading.timestamp,
                    last = last.timestamp,
                    "Dropping reading inside minimum interval"
                );
                return;
            }
        }

        readings.push(reading);
        if readings.len() > self.settings.max_points {
            let overflow = readings.len() - self.settings.max_points;
            readings.drain(0..overflow);
        }

        if let Err(e) = self.write(&readings) {
            warn!(error = %e, "Failed to persist reading history");
        }
    }

    /// Every stored reading, oldest first. Empty when nothing is stored or
    /// the stored data cannot be decoded.
    pub fn read_all(&self) -> Vec<Reading> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read reading history");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(readings) => readings,
            Err(e) => {
                warn!(error = %e, "Stored reading history is unreadable");
                Vec::new()
            }
        }
    }

    /// Most recent stored reading
    pub fn latest(&self) -> Option<Reading> {
        self.read_all().last().copied()
    }

    pub fn len(&self) -> usize {
        self.read_all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every stored reading
    pub fn clear(&self) {
        let _guard = self.write_lock.lock();
        if let Err(e) = self.store.remove(&self.key) {
            warn!(error = %e, "Failed to clear reading history");
        }
    }

    /// Re-apply the spacing rule to the stored sequence.
    ///
    /// Keeps the first reading, then each reading at least the minimum
    /// interval after the last *kept* one. Storage is rewritten only when
    /// something was removed. Returns the number of removed readings.
    pub fn deduplicate(&self) -> usize {
        let _guard = self.write_lock.lock();
        let readings = self.read_all();
        let before = readings.len();

        let mut kept: Vec<Reading> = Vec::with_capacity(before);
        for reading in readings {
            match kept.last() {
                Some(last) if reading.timestamp < self.next_allowed(last) => {}
                _ => kept.push(reading),
            }
        }

        let removed = before - kept.len();
        if removed > 0 {
            info!(before, after = kept.len(), "Removed duplicate readings from history");
            if let Err(e) = self.write(&kept) {
                warn!(error = %e, "Failed to persist deduplicated history");
            }
        }
        removed
    }

    /// Earliest timestamp accepted after `last`
    fn next_allowed(&self, last: &Reading) -> Timestamp {
        last.timestamp.saturating_add(self.settings.min_interval_ms)
    }

    fn write(&self, readings: &[Reading]) -> Result<(), StoreError> {
        let json = serde_json::to_string(readings)?;
        self.store.set(&self.key, &json)
    }
}
