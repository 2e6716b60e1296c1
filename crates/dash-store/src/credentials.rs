//! Persisted combined credential

use crate::{KvStore, CREDENTIAL_KEY};
use std::sync::Arc;

/// Holds the combined `apiKey:applicationKey` string.
///
/// Storage failures are logged and swallowed; a failed read behaves like
/// an absent credential.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KvStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Stored credential, or an empty string when none is set
    pub fn get(&self) -> String {
        match self.store.get(CREDENTIAL_KEY) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to retrieve API key");
                String::new()
            }
        }
    }

    pub fn set(&self, combined: &str) {
        if let Err(e) = self.store.set(CREDENTIAL_KEY, combined) {
            tracing::error!(error = %e, "Failed to store API key");
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(CREDENTIAL_KEY) {
            tracing::error!(error = %e, "Failed to remove API key");
        }
    }

    pub fn has_credential(&self) -> bool {
        !self.get().is_empty()
    }
}
