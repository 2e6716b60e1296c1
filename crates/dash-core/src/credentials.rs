//! Combined station API credential (`apiKey:applicationKey`)

use std::fmt;

/// Separator between the two credential parts
pub const CREDENTIAL_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("Invalid API key format. Please provide both API key and application key.")]
    InvalidFormat,
}

/// Parsed credential pair, used transiently for each request
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    application_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, application_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            application_key: application_key.into(),
        }
    }

    /// Split a combined credential on the separator.
    ///
    /// The first segment is the API key and the second the application
    /// key; anything after a second separator is ignored.
    pub fn parse(combined: &str) -> Result<Self, CredentialError> {
        let mut parts = combined.split(CREDENTIAL_SEPARATOR);
        let api_key = parts.next().unwrap_or_default();
        let application_key = parts.next().unwrap_or_default();

        if api_key.is_empty() || application_key.is_empty() {
            return Err(CredentialError::InvalidFormat);
        }
        Ok(Self::new(api_key, application_key))
    }

    /// Join back into the stored form
    pub fn combined(&self) -> String {
        format!(
            "{}{}{}",
            self.api_key, CREDENTIAL_SEPARATOR, self.application_key
        )
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn application_key(&self) -> &str {
        &self.application_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("application_key", &"<redacted>")
            .finish()
    }
}
