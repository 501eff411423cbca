//! Site-Harvester: an incremental, resumable site text harvester
//!
//! This crate crawls a website breadth-first from a seed URL, extracts readable
//! text from HTML pages and PDF documents, and persists both the per-URL
//! processing status and the extracted text so that repeated runs never redo
//! work that already succeeded.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Errors that end a crawl call
///
/// Per-URL fetch and extraction failures never surface here; they are
/// recorded in the ledger and the crawl goes on.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Crawl of {seed} aborted after {processed} processed pages: {source}")]
    Aborted {
        seed: String,
        processed: u64,
        summary: Box<crawler::CrawlSummary>,
        #[source]
        source: storage::StorageError,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

// Re-export commonly used types
pub use config::{Config, CrawlBudget, SameDomainPolicy};
pub use crawler::{CrawlSummary, Crawler, TerminationReason};
pub use state::{ContentKind, UrlStatus};
pub use url::{normalize_url, Classification, Classifier, ExtensionClass};
