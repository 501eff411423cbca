//! Traversal engine - breadth-first crawl of one site
//!
//! This module contains the crawl loop that coordinates:
//! - The initial-URL guarantee (the seed is always considered, and re-fetched
//!   when its text is missing from the sink)
//! - Depth and page-count limits
//! - Cross-run deduplication through the ledger and the sink
//! - Fetching, extractor dispatch and link expansion
//! - Politeness delay and cancellation

use crate::config::CrawlBudget;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::{Frontier, QueueEntry};
use crate::crawler::summary::{CrawlSummary, TerminationReason};
use crate::extract::{Dispatcher, Extraction};
use crate::state::{ContentKind, UrlStatus};
use crate::storage::{
    ContentSink, ExtractedDocument, RunStatus, Storage, StorageError, StorageResult, UrlRecord,
};
use crate::url::{normalize_url, Classifier};
use crate::HarvestError;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Log a progress line every this many processed pages
const PROGRESS_INTERVAL: u64 = 10;

/// Crawls sites into a ledger and a content sink
///
/// Every call to `crawl` builds its own frontier from the seed. The only
/// state kept between calls is the time of the last fetch, so the politeness
/// delay also holds across seeds. Storage is shared behind `Arc<Mutex<_>>`
/// and locked only for the duration of each storage call.
pub struct Crawler<S, F> {
    storage: Arc<Mutex<S>>,
    fetcher: F,
    config_hash: String,
    last_fetch: Mutex<Option<tokio::time::Instant>>,
}

/// Result of handling one fetched page
enum PageOutcome {
    Harvested { final_url: Url, extraction: Extraction },
    Failed { kind: ContentKind, reason: String },
}

enum Step {
    Continue,
    Cancelled,
}

/// Per-crawl state
struct Traversal<'a> {
    seed: &'a Url,
    budget: &'a CrawlBudget,
    cancel: &'a CancellationToken,
    classifier: Classifier,
    dispatcher: Dispatcher,
    frontier: Frontier,
    summary: CrawlSummary,
    started: Instant,
}

impl<'a> Traversal<'a> {
    fn new(seed: &'a Url, budget: &'a CrawlBudget, cancel: &'a CancellationToken) -> Self {
        Self {
            seed,
            budget,
            cancel,
            classifier: Classifier::new(seed, budget),
            dispatcher: Dispatcher::new(budget.max_pdf_bytes()),
            frontier: Frontier::new(),
            summary: CrawlSummary::new(seed.as_str()),
            started: Instant::now(),
        }
    }
}

impl<S: Storage, F: Fetcher> Crawler<S, F> {
    /// Creates a crawler over the given storage and fetcher
    pub fn new(storage: Arc<Mutex<S>>, fetcher: F) -> Self {
        Self {
            storage,
            fetcher,
            config_hash: String::new(),
            last_fetch: Mutex::new(None),
        }
    }

    /// Sets the configuration hash recorded with each run
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    pub fn storage(&self) -> &Arc<Mutex<S>> {
        &self.storage
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Crawls one site breadth-first from `seed`
    ///
    /// # Arguments
    ///
    /// * `seed` - The seed URL; normalized before use
    /// * `budget` - Limits and policies for this crawl
    /// * `cancel` - Stops the crawl between pages and during the politeness delay
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - The crawl ended normally, on its budget, or by cancellation
    /// * `Err(HarvestError::UrlError)` - The seed is not a valid http(s) URL
    /// * `Err(HarvestError::Aborted)` - Storage failed; carries the partial summary
    pub async fn crawl(
        &self,
        seed: &str,
        budget: &CrawlBudget,
        cancel: &CancellationToken,
    ) -> Result<CrawlSummary, HarvestError> {
        let seed = normalize_url(seed, None)?;
        let run_id = self.with_storage(|s| s.create_run(seed.as_str(), &self.config_hash))?;

        tracing::info!(
            "Starting run {} from {} (max depth {}, max pages {}, {})",
            run_id,
            seed,
            budget.max_depth,
            budget.max_pages,
            budget.same_domain.as_str()
        );

        let mut traversal = Traversal::new(&seed, budget, cancel);
        let outcome = self.traverse(&mut traversal).await;
        let elapsed = traversal.started.elapsed();
        let mut summary = traversal.summary;

        match outcome {
            Ok(reason) => {
                summary.termination = reason;
                self.with_storage(|s| s.finish_run(run_id, reason.into()))?;
                tracing::info!(
                    "Run {} {}: {} HTML, {} PDF, {} failed, {} skipped in {:?}",
                    run_id,
                    reason,
                    summary.html_pages,
                    summary.pdf_pages,
                    summary.failed,
                    summary.skipped,
                    elapsed
                );
                Ok(summary)
            }
            Err(source) => {
                tracing::error!("Run {} aborted on storage failure: {}", run_id, source);
                if let Err(e) = self.with_storage(|s| s.finish_run(run_id, RunStatus::Aborted)) {
                    tracing::warn!("Could not close run {}: {}", run_id, e);
                }
                Err(HarvestError::Aborted {
                    seed: seed.to_string(),
                    processed: summary.pages(),
                    summary: Box::new(summary),
                    source,
                })
            }
        }
    }

    /// Crawls several seeds in order with one shared page budget
    ///
    /// Each seed gets whatever the previous seeds left of `budget.max_pages`.
    /// Stops early when the budget is spent or the crawl is cancelled. A seed
    /// that cannot be crawled is logged and skipped; only a storage failure
    /// ends the whole call with an error.
    pub async fn crawl_all(
        &self,
        seeds: &[String],
        budget: &CrawlBudget,
        cancel: &CancellationToken,
    ) -> Result<Vec<CrawlSummary>, HarvestError> {
        let mut summaries = Vec::with_capacity(seeds.len());
        let mut remaining = budget.max_pages;

        for seed in seeds {
            if remaining == 0 {
                tracing::info!("Page budget spent, not crawling {}", seed);
                break;
            }
            if cancel.is_cancelled() {
                break;
            }

            let summary = match self
                .crawl(seed, &budget.with_max_pages(remaining), cancel)
                .await
            {
                Ok(summary) => summary,
                Err(e @ (HarvestError::Aborted { .. } | HarvestError::Storage(_))) => {
                    return Err(e)
                }
                Err(e) => {
                    tracing::warn!("Skipping seed {}: {}", seed, e);
                    continue;
                }
            };
            remaining = remaining.saturating_sub(summary.pages());

            let cancelled = summary.termination == TerminationReason::Cancelled;
            summaries.push(summary);
            if cancelled {
                break;
            }
        }

        Ok(summaries)
    }

    /// Runs a storage operation under the lock
    fn with_storage<T>(&self, op: impl FnOnce(&mut S) -> StorageResult<T>) -> StorageResult<T> {
        let mut storage = self.storage.lock().map_err(|_| StorageError::LockPoisoned)?;
        op(&mut *storage)
    }

    async fn traverse(&self, t: &mut Traversal<'_>) -> StorageResult<TerminationReason> {
        // Initial-URL guarantee: the seed is queued whatever the ledger says
        let seed = t.seed.clone();
        self.with_storage(|s| s.ensure_pending(seed.as_str(), 0))?;
        t.frontier.push(seed, 0);

        loop {
            if t.cancel.is_cancelled() {
                tracing::info!("Crawl cancelled, {} URLs left in queue", t.frontier.len());
                return Ok(TerminationReason::Cancelled);
            }
            if t.frontier.is_empty() {
                return Ok(TerminationReason::Completed);
            }
            if t.summary.pages() >= t.budget.max_pages {
                tracing::info!(
                    "Page budget of {} reached, {} URLs left in queue",
                    t.budget.max_pages,
                    t.frontier.len()
                );
                return Ok(TerminationReason::BudgetExhausted);
            }

            let Some(entry) = t.frontier.pop() else {
                return Ok(TerminationReason::Completed);
            };

            if entry.depth > t.budget.max_depth {
                t.summary.discarded_by_depth += 1;
                tracing::debug!("Beyond max depth: {} (depth {})", entry.url, entry.depth);
                continue;
            }

            if let Step::Cancelled = self.process_entry(t, &entry).await? {
                tracing::info!("Crawl cancelled, {} URLs left in queue", t.frontier.len());
                return Ok(TerminationReason::Cancelled);
            }
        }
    }

    /// Handles one dequeued URL
    async fn process_entry(&self, t: &mut Traversal<'_>, entry: &QueueEntry) -> StorageResult<Step> {
        let url = entry.url.as_str();
        let current = self.with_storage(|s| s.get(url))?.map(|record| record.status);
        let repairing = current == Some(UrlStatus::Processed);

        if repairing {
            if self.with_storage(|s| ContentSink::has(s, url))? {
                t.summary.skipped += 1;
                tracing::debug!("Already harvested: {}", url);
                if entry.depth == 0 && t.budget.refresh_seed_links {
                    return self.refresh_links(t, entry).await;
                }
                return Ok(Step::Continue);
            }
            tracing::info!("{} is processed but has no stored text, fetching again", url);
        }

        if !self.polite_wait(t).await {
            return Ok(Step::Cancelled);
        }

        match self.fetch_page(t, &entry.url).await {
            PageOutcome::Harvested {
                final_url,
                extraction,
            } => {
                let Extraction { kind, text, links } = extraction;
                let document = ExtractedDocument::new(url, kind, text);
                let (bytes, chars) = (document.byte_len(), document.char_len());

                if !self.with_storage(|s| s.append(&document))? {
                    tracing::warn!("Text for {} already stored, duplicate ignored", url);
                }
                self.record(current, UrlRecord::processed(url, entry.depth, kind))?;

                if repairing {
                    t.summary.repaired += 1;
                }
                t.summary.record_page(kind, bytes, chars);
                tracing::info!(
                    "[{}] depth {} | {} chars | {}",
                    kind.export_label(),
                    entry.depth,
                    chars,
                    url
                );

                self.expand_links(t, &links, &final_url, entry.depth)?;
                self.log_progress(t);
            }
            PageOutcome::Failed { kind, reason } => {
                if repairing {
                    // Stays processed without text, so the next run repairs it again
                    tracing::warn!("Repair of {} failed: {}", url, reason);
                } else {
                    tracing::warn!("Failed {}: {}", url, reason);
                }
                t.summary.failed += 1;
                self.record(current, UrlRecord::failed(url, entry.depth, kind, reason))?;
            }
        }

        Ok(Step::Continue)
    }

    /// Re-fetches an already harvested seed only to collect its links
    ///
    /// Nothing is written to the ledger or the sink, so a crawl that stopped
    /// on its page budget can continue into unvisited pages next time.
    async fn refresh_links(&self, t: &mut Traversal<'_>, entry: &QueueEntry) -> StorageResult<Step> {
        if !self.polite_wait(t).await {
            return Ok(Step::Cancelled);
        }

        tracing::debug!("Refreshing links of {}", entry.url);
        match self.fetch_page(t, &entry.url).await {
            PageOutcome::Harvested {
                final_url,
                extraction,
            } => self.expand_links(t, &extraction.links, &final_url, entry.depth)?,
            PageOutcome::Failed { reason, .. } => {
                tracing::warn!("Could not refresh links of {}: {}", entry.url, reason)
            }
        }

        Ok(Step::Continue)
    }

    /// Fetches a URL and runs the matching extractor
    async fn fetch_page(&self, t: &Traversal<'_>, url: &Url) -> PageOutcome {
        let extension = t.classifier.classify(url).extension;

        let resource = match self.fetcher.fetch(url, t.budget.request_timeout).await {
            Ok(resource) => resource,
            Err(e) => {
                return PageOutcome::Failed {
                    kind: ContentKind::Unknown,
                    reason: e.to_string(),
                }
            }
        };

        match t.dispatcher.dispatch(&resource, extension) {
            Ok(extraction) => PageOutcome::Harvested {
                final_url: resource.final_url,
                extraction,
            },
            Err(e) => PageOutcome::Failed {
                kind: t
                    .dispatcher
                    .select(&resource, extension)
                    .map(|kind| kind.content_kind())
                    .unwrap_or(ContentKind::Unknown),
                reason: e.to_string(),
            },
        }
    }

    /// Writes a ledger record unless the stored status forbids the change
    fn record(&self, current: Option<UrlStatus>, record: UrlRecord) -> StorageResult<()> {
        match current {
            Some(status) if !status.can_transition_to(record.status) => {
                tracing::debug!("Ledger keeps {} as {}", record.url, status);
                Ok(())
            }
            _ => self.with_storage(|s| s.put(&record)),
        }
    }

    /// Normalizes, filters and enqueues the links of a page at `depth`
    fn expand_links(
        &self,
        t: &mut Traversal<'_>,
        links: &[String],
        base: &Url,
        depth: u32,
    ) -> StorageResult<()> {
        let child_depth = depth.saturating_add(1);
        let mut enqueued = 0usize;

        for raw in links {
            let url = match normalize_url(raw, Some(base)) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!("Skipping link {:?}: {}", raw, e);
                    t.summary.filtered_links += 1;
                    continue;
                }
            };

            if t.frontier.is_seen(&url) {
                continue;
            }

            let classification = t.classifier.classify(&url);
            if !classification.is_crawlable() {
                tracing::debug!(
                    "Filtered {} (same domain: {}, {:?})",
                    url,
                    classification.same_domain,
                    classification.extension
                );
                t.frontier.mark_seen(&url);
                t.summary.filtered_links += 1;
                continue;
            }

            if child_depth > t.budget.max_depth {
                t.frontier.mark_seen(&url);
                t.summary.discarded_by_depth += 1;
                continue;
            }

            self.with_storage(|s| s.ensure_pending(url.as_str(), child_depth))?;
            t.frontier.push(url, child_depth);
            enqueued += 1;
        }

        tracing::debug!(
            "{} of {} links from {} enqueued at depth {}",
            enqueued,
            links.len(),
            base,
            child_depth
        );
        Ok(())
    }

    /// Waits out the politeness delay before a fetch
    ///
    /// The delay runs from the previous fetch made by this crawler, whichever
    /// seed it belonged to. No delay before the crawler's first fetch. Returns
    /// false if the crawl was cancelled while waiting.
    async fn polite_wait(&self, t: &Traversal<'_>) -> bool {
        let cancel = t.cancel;
        if cancel.is_cancelled() {
            return false;
        }

        let last = self.last_fetch.lock().ok().and_then(|guard| *guard);
        if let Some(last) = last {
            let ready_at = last + t.budget.delay;
            if ready_at > tokio::time::Instant::now() {
                let waited = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => false,
                    _ = tokio::time::sleep_until(ready_at) => true,
                };
                if !waited {
                    return false;
                }
            }
        }

        if let Ok(mut guard) = self.last_fetch.lock() {
            *guard = Some(tokio::time::Instant::now());
        }
        true
    }

    fn log_progress(&self, t: &Traversal<'_>) {
        let pages = t.summary.pages();
        if pages > 0 && pages % PROGRESS_INTERVAL == 0 {
            let elapsed = t.started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 { pages as f64 / elapsed } else { 0.0 };
            tracing::info!(
                "Progress: {} pages processed, {} queued, {:.2} pages/sec",
                pages,
                t.frontier.len(),
                rate
            );
        }
    }
}
