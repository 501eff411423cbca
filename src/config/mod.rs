//! Configuration module for Site-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and turning them into the immutable [`CrawlBudget`] each crawl run receives.
//!
//! # Example
//!
//! ```no_run
//! use site_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod budget;
mod parser;
mod types;
mod validation;

// Re-export types
pub use budget::CrawlBudget;
pub use types::{
    Config, CrawlerConfig, FilterConfig, OutputConfig, SameDomainPolicy, SeedEntry,
    UserAgentConfig, DEFAULT_IGNORED_EXTENSIONS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

impl Config {
    /// Returns the crawl budget described by this configuration
    pub fn budget(&self) -> CrawlBudget {
        CrawlBudget::from_config(self)
    }

    /// Returns the configured seed URLs in order
    pub fn seed_urls(&self) -> Vec<String> {
        self.seed.iter().map(|s| s.url.clone()).collect()
    }
}
