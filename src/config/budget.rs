//! Run-scoped crawl limits
//!
//! A `CrawlBudget` is built once from the configuration and handed to the
//! crawler by value. Nothing in it changes while a run is in progress.

use crate::config::types::{Config, SameDomainPolicy, DEFAULT_IGNORED_EXTENSIONS};
use std::time::Duration;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Immutable limits and policies for a single crawl
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlBudget {
    /// Deepest level that may be fetched (the seed is depth 0)
    pub max_depth: u32,

    /// Maximum number of pages processed in the run
    pub max_pages: u64,

    /// Rule deciding whether a link stays inside the crawled site
    pub same_domain: SameDomainPolicy,

    /// Lowercase extensions, each with a leading dot
    pub ignored_extensions: Vec<String>,

    /// Pause before each fetch
    pub delay: Duration,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// PDF size limit in megabytes
    pub max_pdf_size_mb: u64,

    /// Re-fetch an already harvested seed to collect its links
    pub refresh_seed_links: bool,
}

impl CrawlBudget {
    /// Creates a budget with the given limits and default policies
    pub fn new(max_depth: u32, max_pages: u64) -> Self {
        Self {
            max_depth,
            max_pages,
            same_domain: SameDomainPolicy::default(),
            ignored_extensions: normalize_extensions(DEFAULT_IGNORED_EXTENSIONS.iter().copied()),
            delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            max_pdf_size_mb: 50,
            refresh_seed_links: false,
        }
    }

    /// Builds the budget described by a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        let crawler = &config.crawler;
        Self {
            max_depth: crawler.max_depth,
            max_pages: crawler.max_pages,
            same_domain: config.filter.same_domain,
            ignored_extensions: normalize_extensions(
                config.filter.ignored_extensions.iter().map(String::as_str),
            ),
            delay: Duration::from_secs_f64(crawler.delay_between_requests.max(0.0)),
            request_timeout: Duration::from_secs(crawler.request_timeout),
            max_pdf_size_mb: crawler.max_pdf_size_mb,
            refresh_seed_links: crawler.refresh_seed_links,
        }
    }

    pub fn with_same_domain(mut self, policy: SameDomainPolicy) -> Self {
        self.same_domain = policy;
        self
    }

    pub fn with_ignored_extensions<'a>(mut self, exts: impl IntoIterator<Item = &'a str>) -> Self {
        self.ignored_extensions = normalize_extensions(exts);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_pdf_size_mb(mut self, mb: u64) -> Self {
        self.max_pdf_size_mb = mb;
        self
    }

    pub fn with_refresh_seed_links(mut self, refresh: bool) -> Self {
        self.refresh_seed_links = refresh;
        self
    }

    /// Returns a copy with a different page allowance
    ///
    /// Used when several seeds share one page budget.
    pub fn with_max_pages(&self, max_pages: u64) -> Self {
        Self {
            max_pages,
            ..self.clone()
        }
    }

    /// PDF size limit in bytes
    pub fn max_pdf_bytes(&self) -> u64 {
        self.max_pdf_size_mb.saturating_mul(BYTES_PER_MB)
    }
}

/// Lowercases extensions and makes sure each starts with a dot
fn normalize_extensions<'a>(exts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut normalized: Vec<String> = exts
        .into_iter()
        .map(|ext| ext.trim().to_lowercase())
        .filter(|ext| !ext.is_empty() && ext != ".")
        .map(|ext| {
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{}", ext)
            }
        })
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}
