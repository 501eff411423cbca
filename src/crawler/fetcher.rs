//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with a per-request timeout
//! - Redirect handling (followed, at most 10 hops)
//! - Capped body reads so oversized resources are never buffered whole
//! - Error classification

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Smallest body cap used by `HttpFetcher`, whatever the PDF limit
pub const MIN_BODY_CAP_BYTES: u64 = 10 * 1024 * 1024;

const MAX_REDIRECTS: usize = 10;

/// A successfully fetched resource
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// URL that was requested
    pub url: Url,
    /// URL after redirects; relative links resolve against it
    pub final_url: Url,
    /// HTTP status code (always 2xx)
    pub status: u16,
    /// Raw Content-Type header value
    pub content_type: Option<String>,
    /// Response body, possibly cut off at the fetcher's cap
    pub body: Vec<u8>,
    /// Content-Length declared by the server
    pub content_length: Option<u64>,
    /// True if the body was not read in full
    pub truncated: bool,
}

impl FetchedResource {
    /// Creates a complete, untruncated resource
    pub fn new(url: Url, content_type: Option<&str>, body: Vec<u8>) -> Self {
        Self {
            final_url: url.clone(),
            url,
            status: 200,
            content_type: content_type.map(str::to_string),
            content_length: Some(body.len() as u64),
            body,
            truncated: false,
        }
    }

    /// Lowercase MIME type without parameters, e.g. `text/html`
    pub fn mime_type(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|essence| essence.trim().to_ascii_lowercase())
            .filter(|essence| !essence.is_empty())
    }

    /// Size of the resource: the larger of the declared and the received length
    pub fn size(&self) -> u64 {
        self.content_length
            .unwrap_or(0)
            .max(self.body.len() as u64)
    }
}

/// Errors from fetching a single URL
///
/// All of these are per-URL failures: the URL is recorded as failed and the
/// crawl continues.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },
}

/// Source of fetched resources
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a URL, failing on network errors, timeouts and non-2xx responses
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedResource, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use site_harvester::config::UserAgentConfig;
/// use site_harvester::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SiteHarvester".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Fetcher` backed by a reqwest client
pub struct HttpFetcher {
    client: Client,
    max_body_bytes: u64,
}

impl HttpFetcher {
    /// Creates a fetcher identifying itself with the configured user agent
    ///
    /// # Arguments
    ///
    /// * `config` - The user agent configuration
    /// * `max_pdf_bytes` - PDF size limit; bodies are capped at this or 10 MB, whichever is larger
    pub fn new(config: &UserAgentConfig, max_pdf_bytes: u64) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?, max_pdf_bytes))
    }

    pub fn with_client(client: Client, max_pdf_bytes: u64) -> Self {
        Self {
            client,
            max_body_bytes: max_pdf_bytes.max(MIN_BODY_CAP_BYTES),
        }
    }

    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_bytes
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedResource, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();

        // A declared length over the cap is enough to refuse the body
        if content_length.map_or(false, |len| len > self.max_body_bytes) {
            debug!(
                "Skipping body of {} ({} bytes declared, cap {})",
                url,
                content_length.unwrap_or(0),
                self.max_body_bytes
            );
            return Ok(FetchedResource {
                url: url.clone(),
                final_url,
                status: status.as_u16(),
                content_type,
                body: Vec::new(),
                content_length,
                truncated: true,
            });
        }

        let mut body = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = response.chunk().await.map_err(|e| classify_error(url, e))? {
            let room = self.max_body_bytes.saturating_sub(body.len() as u64) as usize;
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedResource {
            url: url.clone(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
            content_length,
            truncated,
        })
    }
}

/// Maps a reqwest error to a fetch failure
fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
