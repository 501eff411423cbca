use serde::Deserialize;

/// Extensions skipped by default: media, styling, scripts, fonts and archives
pub const DEFAULT_IGNORED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".ico", ".css", ".js", ".woff", ".woff2", ".ttf",
    ".eot", ".mp4", ".avi", ".mov", ".mp3", ".wav", ".zip", ".tar", ".gz", ".rar",
];

/// Main configuration structure for Site-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub seed: Vec<SeedEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum depth to crawl from the seed URL (the seed is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of pages processed per invocation, shared by all seeds
    #[serde(rename = "max-pages")]
    pub max_pages: u64,

    /// Pause before each request, in seconds
    #[serde(rename = "delay-between-requests", default = "default_delay")]
    pub delay_between_requests: f64,

    /// Per-request timeout, in seconds
    #[serde(rename = "request-timeout", default = "default_timeout")]
    pub request_timeout: u64,

    /// PDFs above this size are refused
    #[serde(rename = "max-pdf-size-mb", default = "default_max_pdf_size")]
    pub max_pdf_size_mb: u64,

    /// Re-fetch an already harvested seed to pick up its links again (off by default)
    #[serde(rename = "refresh-seed-links", default)]
    pub refresh_seed_links: bool,
}

/// Link filtering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Rule deciding which hosts count as the seed's domain
    #[serde(rename = "same-domain", default)]
    pub same_domain: SameDomainPolicy,

    /// File extensions that are never fetched
    #[serde(rename = "ignored-extensions", default = "default_ignored_extensions")]
    pub ignored_extensions: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            same_domain: SameDomainPolicy::default(),
            ignored_extensions: default_ignored_extensions(),
        }
    }
}

/// How a discovered link is matched against the seed URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SameDomainPolicy {
    /// Host must equal the seed host
    Exact,
    /// Host must be the seed's domain or one of its subdomains (`www.` ignored)
    #[default]
    Subdomains,
    /// Host must equal the seed host and the path must lie under the seed path
    SeedPrefix,
}

impl SameDomainPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Subdomains => "subdomains",
            Self::SeedPrefix => "seed-prefix",
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding the ledger and the extracted text
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Where the text export is written after each crawl
    #[serde(rename = "export-path", default)]
    pub export_path: Option<String>,

    /// Log lines are also appended to this file when set
    #[serde(rename = "log-path", default)]
    pub log_path: Option<String>,
}

/// A seed URL to start crawling from
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    pub url: String,
}

fn default_delay() -> f64 {
    1.0
}

fn default_timeout() -> u64 {
    10
}

fn default_max_pdf_size() -> u64 {
    50
}

fn default_ignored_extensions() -> Vec<String> {
    DEFAULT_IGNORED_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}
