//! Crawl summary and termination reasons

use crate::state::ContentKind;
use crate::storage::RunStatus;
use std::fmt;

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminationReason {
    /// The queue ran empty
    #[default]
    Completed,
    /// The page budget was reached with URLs still queued
    BudgetExhausted,
    /// The cancellation token fired
    Cancelled,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::BudgetExhausted => "budget-exhausted",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<TerminationReason> for RunStatus {
    fn from(reason: TerminationReason) -> Self {
        match reason {
            TerminationReason::Completed => RunStatus::Completed,
            TerminationReason::BudgetExhausted => RunStatus::BudgetExhausted,
            TerminationReason::Cancelled => RunStatus::Cancelled,
        }
    }
}

/// What one crawl did
///
/// Counts only work done in this run. Pages skipped because an earlier run
/// already harvested them appear in `skipped`, not in the page counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Normalized seed URL
    pub seed: String,
    pub html_pages: u64,
    pub pdf_pages: u64,
    /// URLs recorded as failed in this run
    pub failed: u64,
    /// URLs already processed and present in the sink
    pub skipped: u64,
    /// Processed URLs whose missing sink entry was restored
    pub repaired: u64,
    /// Links dropped for lying beyond the depth limit
    pub discarded_by_depth: u64,
    /// Links dropped as invalid, off-domain or on the extension block-list
    pub filtered_links: u64,
    /// Bytes of extracted text
    pub bytes: u64,
    /// Characters of extracted text
    pub chars: u64,
    pub termination: TerminationReason,
}

impl CrawlSummary {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            ..Self::default()
        }
    }

    /// Pages processed in this run; the figure checked against the page budget
    pub fn pages(&self) -> u64 {
        self.html_pages + self.pdf_pages
    }

    /// Counts one successfully harvested page
    pub fn record_page(&mut self, kind: ContentKind, bytes: u64, chars: u64) {
        match kind {
            ContentKind::Pdf => self.pdf_pages += 1,
            _ => self.html_pages += 1,
        }
        self.bytes += bytes;
        self.chars += chars;
    }

    /// Adds another summary's counters to this one
    ///
    /// The termination reason becomes that of `other`, the later crawl.
    pub fn absorb(&mut self, other: &CrawlSummary) {
        self.html_pages += other.html_pages;
        self.pdf_pages += other.pdf_pages;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.repaired += other.repaired;
        self.discarded_by_depth += other.discarded_by_depth;
        self.filtered_links += other.filtered_links;
        self.bytes += other.bytes;
        self.chars += other.chars;
        self.termination = other.termination;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_page() {
        let mut summary = CrawlSummary::new("https://example.com/");
        summary.record_page(ContentKind::Html, 10, 8);
        summary.record_page(ContentKind::Pdf, 100, 90);

        assert_eq!(summary.html_pages, 1);
        assert_eq!(summary.pdf_pages, 1);
        assert_eq!(summary.pages(), 2);
        assert_eq!(summary.bytes, 110);
        assert_eq!(summary.chars, 98);
    }

    #[test]
    fn test_absorb() {
        let mut total = CrawlSummary::default();
        let mut first = CrawlSummary::new("https://a.test/");
        first.record_page(ContentKind::Html, 5, 5);
        first.failed = 2;
        let mut second = CrawlSummary::new("https://b.test/");
        second.record_page(ContentKind::Pdf, 7, 7);
        second.termination = TerminationReason::BudgetExhausted;

        total.absorb(&first);
        total.absorb(&second);

        assert_eq!(total.pages(), 2);
        assert_eq!(total.failed, 2);
        assert_eq!(total.bytes, 12);
        assert_eq!(total.termination, TerminationReason::BudgetExhausted);
    }

    #[test]
    fn test_run_status_mapping() {
        assert_eq!(
            RunStatus::from(TerminationReason::BudgetExhausted),
            RunStatus::BudgetExhausted
        );
        assert_eq!(RunStatus::from(TerminationReason::Cancelled), RunStatus::Cancelled);
    }
}
