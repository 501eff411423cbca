//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - The visited ledger (per-URL status, depth and failure reason)
//! - The content sink (append-only extracted text)
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ContentSink, Ledger, RunLog, Storage, StorageError, StorageResult};

use crate::state::{ContentKind, UrlStatus};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    SqliteStorage::new(path)
}

/// Represents a URL in the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct UrlRecord {
    pub url: String,
    pub status: UrlStatus,
    pub content_kind: ContentKind,
    /// Depth of first discovery; never changes once written
    pub depth: u32,
    pub discovered_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl UrlRecord {
    pub fn pending(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            status: UrlStatus::Pending,
            content_kind: ContentKind::Unknown,
            depth,
            discovered_at: Utc::now(),
            processed_at: None,
            error: None,
        }
    }

    pub fn processed(url: impl Into<String>, depth: u32, kind: ContentKind) -> Self {
        let now = Utc::now();
        Self {
            url: url.into(),
            status: UrlStatus::Processed,
            content_kind: kind,
            depth,
            discovered_at: now,
            processed_at: Some(now),
            error: None,
        }
    }

    pub fn failed(
        url: impl Into<String>,
        depth: u32,
        kind: ContentKind,
        reason: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            url: url.into(),
            status: UrlStatus::Failed,
            content_kind: kind,
            depth,
            discovered_at: now,
            processed_at: Some(now),
            error: Some(reason.into()),
        }
    }
}

/// Text extracted from one URL
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub url: String,
    pub kind: ContentKind,
    pub extracted_at: DateTime<Utc>,
    pub text: String,
}

impl ExtractedDocument {
    /// Creates a document stamped with the current time
    pub fn new(url: impl Into<String>, kind: ContentKind, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            extracted_at: Utc::now(),
            text: text.into(),
        }
    }

    /// Length of the text in bytes
    pub fn byte_len(&self) -> u64 {
        self.text.len() as u64
    }

    /// Length of the text in characters
    pub fn char_len(&self) -> u64 {
        self.text.chars().count() as u64
    }
}

/// Aggregate size of the content sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkSize {
    pub documents: u64,
    pub bytes: u64,
    pub chars: u64,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub seed_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    BudgetExhausted,
    Cancelled,
    Aborted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::BudgetExhausted => "budget_exhausted",
            Self::Cancelled => "cancelled",
            Self::Aborted => "aborted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "budget_exhausted" => Some(Self::BudgetExhausted),
            "cancelled" => Some(Self::Cancelled),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }
}
