//! Durable key-value slots for dashboard state
//!
//! Every persisted piece of state (reading history, credential, card
//! order) lives in one named slot holding a string. Backends only need
//! whole-value get/set/remove; callers serialize.

pub mod card_order;
pub mod credentials;
pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use card_order::CardOrderStore;
pub use credentials::CredentialStore;
pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use thiserror::Error;

/// Slot holding the JSON array of readings
pub const HISTORY_KEY: &str = "ambient_weather_historical_data";
/// Slot holding the combined credential string
pub const CREDENTIAL_KEY: &str = "ambient_weather_api_key";
/// Slot holding the JSON array of card configurations
pub const CARD_ORDER_KEY: &str = "ambient_weather_card_order";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A set of named string slots. Last write wins.
pub trait KvStore: Send + Sync {
    /// Read a slot, `None` if it was never written or has been removed
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Replace a slot's value
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove a slot; removing an absent slot is not an error
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Keys become file names, so keep them to a safe alphabet
pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
