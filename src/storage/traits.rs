//! Storage traits and error types
//!
//! This module defines the trait interfaces for the visited ledger, the
//! content sink and the run log, plus their shared error type.

use crate::output::ExportError;
use crate::state::{ContentKind, UrlStatus};
use crate::storage::{ExtractedDocument, RunRecord, RunStatus, SinkSize, UrlRecord};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// Every variant is fatal for a crawl: the engine stops and reports the
/// partial summary instead of continuing without durable state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Record for {url} is {status} and can no longer change")]
    ImmutableRecord { url: String, status: UrlStatus },

    #[error("Invalid status transition for {url}: {from} -> {to}")]
    InvalidTransition {
        url: String,
        from: UrlStatus,
        to: UrlStatus,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable per-URL processing status, keyed by canonical URL
pub trait Ledger {
    /// Returns true if the URL has a record in any status
    fn has(&self, url: &str) -> StorageResult<bool>;

    /// Gets the record for a URL
    fn get(&self, url: &str) -> StorageResult<Option<UrlRecord>>;

    /// Inserts or updates a record
    ///
    /// An existing record keeps its depth and discovery time. Its status may
    /// only move along `UrlStatus::can_transition_to`; anything else is
    /// `StorageError::ImmutableRecord` (or `InvalidTransition` for a pending
    /// record written as pending again).
    fn put(&mut self, record: &UrlRecord) -> StorageResult<()>;

    /// Inserts a pending record unless the URL is already known
    ///
    /// # Returns
    ///
    /// `true` if a new record was written
    fn ensure_pending(&mut self, url: &str, depth: u32) -> StorageResult<bool>;

    /// Counts records with the given status
    fn count(&self, status: UrlStatus) -> StorageResult<u64>;

    /// Lists records with the given status, oldest discovery first
    fn list(&self, status: UrlStatus) -> StorageResult<Vec<UrlRecord>>;

    /// Number of records at each depth of first discovery
    fn depth_breakdown(&self) -> StorageResult<BTreeMap<u32, u64>>;

    /// Deletes every record
    fn reset(&mut self) -> StorageResult<()>;
}

/// Durable append-only store of extracted text, keyed by source URL
pub trait ContentSink {
    /// Returns true if a document for the URL is stored
    fn has(&self, url: &str) -> StorageResult<bool>;

    /// Appends a document
    ///
    /// Never overwrites. A second document for the same URL is ignored.
    ///
    /// # Returns
    ///
    /// `true` if the document was stored, `false` if the URL was already present
    fn append(&mut self, document: &ExtractedDocument) -> StorageResult<bool>;

    /// Document count and total bytes and characters of stored text
    fn size(&self) -> StorageResult<SinkSize>;

    /// All stored documents in append order
    fn documents(&self) -> StorageResult<Vec<ExtractedDocument>>;

    /// Counts stored documents of one kind
    fn count_by_kind(&self, kind: ContentKind) -> StorageResult<u64>;

    /// Deletes every document
    fn clear(&mut self) -> StorageResult<()>;

    /// Writes a human-readable snapshot of the sink to `path`
    ///
    /// # Returns
    ///
    /// The number of documents written
    fn export(&self, path: &Path) -> Result<u64, ExportError> {
        let documents = self.documents()?;
        crate::output::write_export(path, &documents)
    }
}

/// Record of each crawl invocation
pub trait RunLog {
    /// Opens a run in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, seed_url: &str, config_hash: &str) -> StorageResult<i64>;

    /// Closes a run with its final status and a finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;
}

/// Everything the crawler needs from its storage backend
pub trait Storage: Ledger + ContentSink + RunLog {}

impl<T: Ledger + ContentSink + RunLog> Storage for T {}
