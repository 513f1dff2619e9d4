use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::errors::{AppError, AppResult, FetchError};
use crate::utils::url::UrlUtils;

/// A single GET request with its own timeout
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new<S: Into<String>>(url: S, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout,
        }
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// URL with credentials masked, for logs and error messages
    pub fn display_url(&self) -> String {
        UrlUtils::obfuscate_credentials(&self.url)
    }
}

/// Retrieval seam used by both batch jobs
///
/// Failures are never retried here; callers decide whether a failure is fatal.
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// Fetch the raw response body
    async fn fetch_bytes(&self, request: &FetchRequest) -> AppResult<Bytes>;

    /// Fetch the response body as UTF-8 text
    async fn fetch_text(&self, request: &FetchRequest) -> AppResult<String> {
        let bytes = self.fetch_bytes(request).await?;
        let content = String::from_utf8(bytes.to_vec()).map_err(|e| {
            AppError::parse(
                request.display_url(),
                format!("Failed to decode content as UTF-8: {e}"),
            )
        })?;
        debug!("Fetched {} characters of text content", content.len());
        Ok(content)
    }
}

/// Default implementation of FetchClient using reqwest
pub struct StandardHttpClient {
    client: Client,
}

impl StandardHttpClient {
    /// Create new HTTP client with a connection timeout only; the total
    /// request timeout is set per request.
    pub fn new() -> AppResult<Self> {
        Self::with_connection_timeout(Duration::from_secs(10))
    }

    pub fn with_connection_timeout(connect_timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    fn classify_error(err: reqwest::Error, request: &FetchRequest) -> FetchError {
        let url = request.display_url();
        if err.is_timeout() {
            FetchError::Timeout {
                url,
                timeout_secs: request.timeout.as_secs(),
            }
        } else {
            FetchError::Network {
                url,
                message: UrlUtils::obfuscate_credentials(&err.to_string()),
            }
        }
    }
}

#[async_trait]
impl FetchClient for StandardHttpClient {
    async fn fetch_bytes(&self, request: &FetchRequest) -> AppResult<Bytes> {
        debug!("Fetching {}", request.display_url());

        let mut builder = self.client.get(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::classify_error(e, request))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: request.display_url(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            }
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::classify_error(e, request))?;

        debug!("Fetched {} bytes of raw content", bytes.len());
        Ok(bytes)
    }
}
