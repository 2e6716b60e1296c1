//! Ambient Weather REST API client

use crate::{Device, FetchError, FetchResult, Observation, StationApi};
use chrono::{DateTime, SecondsFormat, Utc};
use dash_core::Credentials;
use dash_obs::Telemetry;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.ambientweather.net";

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const CREDENTIAL_PARAMS: [&str; 2] = ["apiKey", "applicationKey"];

pub struct AmbientClient {
    client: Client,
    base_url: Url,
    telemetry: Arc<dyn Telemetry>,
}

impl AmbientClient {
    pub fn new(telemetry: Arc<dyn Telemetry>) -> FetchResult<Self> {
        Self::with_base_url(DEFAULT_API_BASE, telemetry)
    }

    pub fn with_base_url(base_url: &str, telemetry: Arc<dyn Telemetry>) -> FetchResult<Self> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| FetchError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidBaseUrl(base_url.to_string()));
        }
        // Relative joins would otherwise drop the last path segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(FetchError::network)?;

        Ok(Self {
            client,
            base_url,
            telemetry,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, credentials: &Credentials) -> FetchResult<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| FetchError::InvalidBaseUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("apiKey", credentials.api_key())
            .append_pair("applicationKey", credentials.application_key());
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> FetchResult<T> {
        let public_url = redact(&url);
        debug!(url = %public_url, "GET");

        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(e.without_url()))?;

        let status = response.status();
        self.telemetry
            .track_api_call(&public_url, "GET", status.as_u16(), started.elapsed());

        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::network(e.without_url()))?;
        serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

/// URL with the credential parameters removed
pub fn redact(url: &Url) -> String {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !CREDENTIAL_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut public = url.clone();
    if kept.is_empty() {
        public.set_query(None);
    } else {
        public.query_pairs_mut().clear().extend_pairs(kept);
    }
    public.to_string()
}

#[async_trait::async_trait]
impl StationApi for AmbientClient {
    fn name(&self) -> &str {
        "ambient"
    }

    async fn list_devices(&self, credentials: &Credentials) -> FetchResult<Vec<Device>> {
        let url = self.endpoint("v1/devices", credentials)?;
        self.get_json(url).await
    }

    async fn fetch_history(
        &self,
        credentials: &Credentials,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> FetchResult<Vec<Observation>> {
        let mut url = self.endpoint("v1/data", credentials)?;
        url.query_pairs_mut()
            .append_pair("startDate", &start.to_rfc3339_opts(SecondsFormat::Millis, true))
            .append_pair("endDate", &end.to_rfc3339_opts(SecondsFormat::Millis, true));
        self.get_json(url).await
    }
}
