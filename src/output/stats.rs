//! Statistics from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! ledger and sink statistics, and for printing crawl summaries.

use crate::crawler::CrawlSummary;
use crate::state::{ContentKind, UrlStatus};
use crate::storage::{
    ContentSink, Ledger, RunLog, RunRecord, SinkSize, Storage, StorageResult, UrlRecord,
};
use std::collections::BTreeMap;

/// Number of failed URLs listed by `print_statistics`
const FAILURE_SAMPLE: usize = 10;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Count of ledger records by status
    pub urls_by_status: BTreeMap<String, u64>,

    /// Count of ledger records by discovery depth
    pub urls_by_depth: BTreeMap<u32, u64>,

    /// Aggregate size of the sink
    pub sink: SinkSize,

    pub html_documents: u64,
    pub pdf_documents: u64,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// A sample of failed URLs with their reasons
    pub failures: Vec<UrlRecord>,

    /// Total failed URLs
    pub failed_total: u64,
}

impl HarvestStatistics {
    pub fn total_urls(&self) -> u64 {
        self.urls_by_status.values().sum()
    }

    pub fn status_count(&self, status: UrlStatus) -> u64 {
        self.urls_by_status
            .get(status.to_db_string())
            .copied()
            .unwrap_or(0)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<HarvestStatistics> {
    let mut urls_by_status = BTreeMap::new();
    for status in UrlStatus::all_states() {
        urls_by_status.insert(status.to_db_string().to_string(), storage.count(status)?);
    }

    let failed = storage.list(UrlStatus::Failed)?;
    let failed_total = failed.len() as u64;

    Ok(HarvestStatistics {
        urls_by_status,
        urls_by_depth: storage.depth_breakdown()?,
        sink: storage.size()?,
        html_documents: storage.count_by_kind(ContentKind::Html)?,
        pdf_documents: storage.count_by_kind(ContentKind::Pdf)?,
        latest_run: storage.latest_run()?,
        failures: failed.into_iter().take(FAILURE_SAMPLE).collect(),
        failed_total,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Ledger ({} URLs):", stats.total_urls());
    for (status, count) in &stats.urls_by_status {
        println!("  {}: {}", status, count);
    }
    println!();

    if !stats.urls_by_depth.is_empty() {
        println!("URLs by Depth:");
        for (depth, count) in &stats.urls_by_depth {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    println!("Content Sink:");
    println!("  Documents: {}", stats.sink.documents);
    println!("  HTML: {}", stats.html_documents);
    println!("  PDF: {}", stats.pdf_documents);
    println!(
        "  Text: {} bytes, {} characters ({:.2} MB)",
        stats.sink.bytes,
        stats.sink.chars,
        stats.sink.bytes as f64 / (1024.0 * 1024.0)
    );
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  ID: {}", run.id);
        println!("  Seed: {}", run.seed_url);
        println!("  Started: {}", run.started_at.to_rfc3339());
        if let Some(finished) = run.finished_at {
            println!("  Finished: {}", finished.to_rfc3339());
        }
        println!("  Status: {}", run.status.to_db_string());
        println!();
    }

    if !stats.failures.is_empty() {
        println!(
            "Failed URLs ({} shown of {}):",
            stats.failures.len(),
            stats.failed_total
        );
        for record in &stats.failures {
            println!(
                "  - {} ({})",
                record.url,
                record.error.as_deref().unwrap_or("no reason recorded")
            );
        }
        println!();
    }

    let processed = stats.status_count(UrlStatus::Processed);
    let success_rate = if stats.total_urls() > 0 {
        (processed as f64 / stats.total_urls() as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Success Rate: {:.1}% ({} / {} URLs processed)",
        success_rate,
        processed,
        stats.total_urls()
    );
}

/// Prints per-seed crawl summaries followed by totals
pub fn print_summary(summaries: &[CrawlSummary]) {
    println!("\n=== Harvest Summary ===\n");

    let mut total = CrawlSummary::default();
    for summary in summaries {
        println!("{} ({})", summary.seed, summary.termination);
        println!(
            "  Pages: {} ({} HTML, {} PDF)",
            summary.pages(),
            summary.html_pages,
            summary.pdf_pages
        );
        println!(
            "  Failed: {} | Already harvested: {} | Repaired: {}",
            summary.failed, summary.skipped, summary.repaired
        );
        println!(
            "  Links filtered: {} | Beyond max depth: {}",
            summary.filtered_links, summary.discarded_by_depth
        );
        total.absorb(summary);
    }

    if summaries.len() > 1 {
        println!(
            "\nTotal: {} pages ({} HTML, {} PDF), {} failed",
            total.pages(),
            total.html_pages,
            total.pdf_pages,
            total.failed
        );
    }
    println!(
        "Text harvested this run: {} characters ({:.2} MB)",
        total.chars,
        total.bytes as f64 / (1024.0 * 1024.0)
    );
}
