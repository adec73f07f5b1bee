//! Payload retrieval for `http`, `https`, `file` and `data` locators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::domain::entities::Locator;
use crate::domain::errors::{SetupError, TransportError};
use crate::domain::ports::ImageFetcher;

/// Configuration for the network fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Maximum concurrent HTTP downloads.
    pub max_concurrent_downloads: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// User agent sent with HTTP requests.
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 4,
            timeout_secs: 30,
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
        }
    }
}

/// Default fetcher: HTTP(S) through `reqwest`, local files through
/// `tokio::fs`, and inline base64 `data:` URLs.
#[derive(Clone)]
pub struct NetworkFetcher {
    http_client: reqwest::Client,
    semaphore: Arc<Semaphore>,
    config: FetcherConfig,
}

impl std::fmt::Debug for NetworkFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkFetcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NetworkFetcher {
    /// Creates a fetcher with the given configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: FetcherConfig) -> Result<Self, SetupError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SetupError::HttpClient(e.to_string()))?;

        Ok(Self {
            http_client,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_downloads.max(1))),
            config,
        })
    }

    /// Creates a fetcher with default configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, SetupError> {
        Self::new(FetcherConfig::default())
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Downloads image bytes from an HTTP(S) URL.
    async fn download(&self, locator: &Locator) -> Result<Bytes, TransportError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| TransportError::new("download queue closed"))?;

        debug!(url = %locator.url(), "Downloading image from network");

        let response = self
            .http_client
            .get(locator.url().clone())
            .send()
            .await
            .map_err(|e| TransportError::new(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(
                status.as_u16(),
                status.canonical_reason(),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(format!("Failed to read body: {e}")))?;

        trace!(url = %locator.url(), size = bytes.len(), "Download complete");
        Ok(bytes)
    }

    async fn read_file(locator: &Locator) -> Result<Bytes, TransportError> {
        let path = locator
            .url()
            .to_file_path()
            .map_err(|()| TransportError::new(format!("not a local path: {}", locator.url())))?;

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            TransportError::new(format!("Failed to read {}: {e}", path.display()))
        })?;

        trace!(path = %path.display(), size = bytes.len(), "Read image from file");
        Ok(Bytes::from(bytes))
    }
}

/// Extracts the payload of a `data:` URL.
///
/// Base64 payloads are decoded; anything else is taken verbatim.
///
/// # Errors
/// Returns error if the URL is malformed or its base64 payload is invalid.
pub fn decode_data_url(locator: &str) -> Result<Bytes, TransportError> {
    let rest = locator
        .strip_prefix("data:")
        .ok_or_else(|| TransportError::new("not a data URL"))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| TransportError::new("data URL has no payload separator"))?;

    if !header.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        return Ok(Bytes::copy_from_slice(payload.as_bytes()));
    }

    STANDARD
        .decode(payload.trim())
        .map(Bytes::from)
        .map_err(|e| TransportError::new(format!("invalid base64 payload: {e}")))
}

#[async_trait]
impl ImageFetcher for NetworkFetcher {
    async fn fetch(&self, locator: &Locator) -> Result<Bytes, TransportError> {
        match locator.scheme() {
            "http" | "https" => self.download(locator).await,
            "file" => Self::read_file(locator).await,
            "data" => decode_data_url(locator.key().as_str()),
            other => Err(TransportError::new(format!("unsupported scheme: {other}"))),
        }
    }
}
