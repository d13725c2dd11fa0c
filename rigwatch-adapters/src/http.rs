//! HTTP fetcher for self-describing metrics endpoints.
//!
//! Each source exposes a JSON document (usually at `/api/system`) with
//! `hardware`, `system` and `timestamp` sections. The fetcher issues one GET
//! per call, enforces a timeout, and normalizes whatever comes back.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rigwatch_adapters::{Fetcher, HttpFetcher};
//! use rigwatch_types::Source;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = HttpFetcher::builder()
//!         .timeout(Duration::from_secs(2))
//!         .credential("s3cret")
//!         .build()?;
//!
//!     let source = Source::new(1, "db-01", "http://10.0.0.5:5002/api/system");
//!     let snapshot = fetcher.fetch(&source).await;
//!
//!     println!("{}: {:?}", snapshot.source_name, snapshot.health);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use rigwatch_types::{
    format_timestamp_ms, normalize, now_ms, FetchError, MetricsSnapshot, RawPayload, Source,
};

use crate::{AdapterError, Fetcher};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Fetches metrics over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    credential: Option<String>,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a new builder for configuring the fetcher.
    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::default()
    }

    /// The timeout applied to every request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch and normalize, surfacing the failure as an error.
    pub async fn collect(&self, source: &Source) -> Result<MetricsSnapshot, AdapterError> {
        let mut request = self.client.get(&source.endpoint_url);
        if let Some(token) = &self.credential {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let raw: RawPayload =
            serde_json::from_slice(&body).map_err(|e| AdapterError::Parse(e.to_string()))?;

        Ok(normalize(&raw, source, now_ms())?)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, source: &Source) -> MetricsSnapshot {
        debug!(source_id = source.id, url = %source.endpoint_url, "fetching metrics");
        match self.collect(source).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                let error = FetchError::from(err);
                warn!(
                    source_id = source.id,
                    source = %source.name,
                    kind = error.kind(),
                    "fetch failed: {}",
                    error
                );
                MetricsSnapshot::failed(source, error, format_timestamp_ms(now_ms()))
            }
        }
    }
}

/// Builder for HttpFetcher.
#[derive(Debug, Default)]
pub struct HttpFetcherBuilder {
    credential: Option<String>,
    timeout: Option<Duration>,
}

impl HttpFetcherBuilder {
    /// Set the opaque token forwarded as `Authorization: Bearer`.
    ///
    /// An empty token sends no header.
    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        let credential = credential.into();
        self.credential = (!credential.is_empty()).then_some(credential);
        self
    }

    /// Set the request timeout (default: 2 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the fetcher.
    pub fn build(self) -> Result<HttpFetcher, AdapterError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Client(e.to_string()))?;

        Ok(HttpFetcher {
            client,
            credential: self.credential,
            timeout,
        })
    }
}
