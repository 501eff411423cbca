//! Crawler module for site traversal
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with body caps and timeouts
//! - The breadth-first frontier
//! - The traversal engine tying fetch, extraction and storage together
//! - Per-run summaries

mod engine;
mod fetcher;
mod frontier;
mod summary;

pub use engine::Crawler;
pub use fetcher::{build_http_client, FetchError, FetchedResource, Fetcher, HttpFetcher};
pub use frontier::{Frontier, QueueEntry};
pub use summary::{CrawlSummary, TerminationReason};

use crate::config::Config;
use crate::storage::SqliteStorage;
use crate::HarvestError;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Runs a complete harvest over the given seeds
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP fetcher from the user agent configuration
/// 2. Crawl each seed in order under one shared page budget
/// 3. Return one summary per crawled seed
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `config_hash` - Hash of the configuration file, recorded with each run
/// * `storage` - Ledger, sink and run log
/// * `seeds` - Seed URLs to crawl in order
/// * `cancel` - Stops the harvest between pages
///
/// # Returns
///
/// * `Ok(Vec<CrawlSummary>)` - Harvest finished, possibly early on budget or cancellation
/// * `Err(HarvestError)` - Harvest failed
pub async fn harvest(
    config: &Config,
    config_hash: &str,
    storage: Arc<Mutex<SqliteStorage>>,
    seeds: &[String],
    cancel: &CancellationToken,
) -> Result<Vec<CrawlSummary>, HarvestError> {
    let budget = config.budget();
    let fetcher = HttpFetcher::new(&config.user_agent, budget.max_pdf_bytes())?;
    let crawler = Crawler::new(storage, fetcher).with_config_hash(config_hash);

    crawler.crawl_all(seeds, &budget, cancel).await
}
