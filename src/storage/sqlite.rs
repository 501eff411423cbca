//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ledger, content
//! sink and run log traits.

use crate::state::{ContentKind, UrlStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ContentSink, Ledger, RunLog, StorageError, StorageResult};
use crate::storage::{ExtractedDocument, RunRecord, RunStatus, SinkSize, UrlRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const URL_COLUMNS: &str = "url, status, content_type, depth, discovered_at, processed_at, error";
const RUN_COLUMNS: &str = "id, seed_url, started_at, finished_at, config_hash, status";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    ///
    /// Nothing survives the process; used by tests and dry runs.
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Raw `urls` row, converted outside the rusqlite row closure
struct UrlRow {
    url: String,
    status: String,
    content_type: String,
    depth: u32,
    discovered_at: String,
    processed_at: Option<String>,
    error: Option<String>,
}

impl UrlRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            status: row.get(1)?,
            content_type: row.get(2)?,
            depth: row.get(3)?,
            discovered_at: row.get(4)?,
            processed_at: row.get(5)?,
            error: row.get(6)?,
        })
    }

    fn into_record(self) -> StorageResult<UrlRecord> {
        Ok(UrlRecord {
            status: parse_status(&self.status)?,
            content_kind: parse_kind(&self.content_type)?,
            depth: self.depth,
            discovered_at: parse_timestamp(&self.discovered_at)?,
            processed_at: self.processed_at.as_deref().map(parse_timestamp).transpose()?,
            error: self.error,
            url: self.url,
        })
    }
}

struct DocumentRow {
    url: String,
    content_type: String,
    extracted_at: String,
    body: String,
}

impl DocumentRow {
    fn into_document(self) -> StorageResult<ExtractedDocument> {
        Ok(ExtractedDocument {
            kind: parse_kind(&self.content_type)?,
            extracted_at: parse_timestamp(&self.extracted_at)?,
            text: self.body,
            url: self.url,
        })
    }
}

struct RunRow {
    id: i64,
    seed_url: String,
    started_at: String,
    finished_at: Option<String>,
    config_hash: String,
    status: String,
}

impl RunRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            seed_url: row.get(1)?,
            started_at: row.get(2)?,
            finished_at: row.get(3)?,
            config_hash: row.get(4)?,
            status: row.get(5)?,
        })
    }

    fn into_record(self) -> StorageResult<RunRecord> {
        let status = RunStatus::from_db_string(&self.status).ok_or_else(|| {
            StorageError::Serialization(format!("unknown run status '{}'", self.status))
        })?;
        Ok(RunRecord {
            id: self.id,
            seed_url: self.seed_url,
            started_at: parse_timestamp(&self.started_at)?,
            finished_at: self.finished_at.as_deref().map(parse_timestamp).transpose()?,
            config_hash: self.config_hash,
            status,
        })
    }
}

fn parse_status(s: &str) -> StorageResult<UrlStatus> {
    UrlStatus::from_db_string(s)
        .ok_or_else(|| StorageError::Serialization(format!("unknown URL status '{}'", s)))
}

fn parse_kind(s: &str) -> StorageResult<ContentKind> {
    ContentKind::from_db_string(s)
        .ok_or_else(|| StorageError::Serialization(format!("unknown content type '{}'", s)))
}

fn parse_timestamp(s: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("invalid timestamp '{}': {}", s, e)))
}

impl Ledger for SqliteStorage {
    fn has(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM urls WHERE url = ?1", params![url], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn get(&self, url: &str) -> StorageResult<Option<UrlRecord>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM urls WHERE url = ?1", URL_COLUMNS),
                params![url],
                UrlRow::from_row,
            )
            .optional()?;

        row.map(UrlRow::into_record).transpose()
    }

    fn put(&mut self, record: &UrlRecord) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT status FROM urls WHERE url = ?1",
                params![record.url],
                |row| row.get(0),
            )
            .optional()?;

        let processed_at = record.processed_at.map(|t| t.to_rfc3339());

        match existing {
            None => {
                tx.execute(
                    "INSERT INTO urls (url, status, content_type, depth, discovered_at, processed_at, error)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        record.url,
                        record.status.to_db_string(),
                        record.content_kind.to_db_string(),
                        record.depth,
                        record.discovered_at.to_rfc3339(),
                        processed_at,
                        record.error,
                    ],
                )?;
            }
            Some(current) => {
                let current = parse_status(&current)?;
                if !current.can_transition_to(record.status) {
                    return Err(if current.is_terminal() {
                        StorageError::ImmutableRecord {
                            url: record.url.clone(),
                            status: current,
                        }
                    } else {
                        StorageError::InvalidTransition {
                            url: record.url.clone(),
                            from: current,
                            to: record.status,
                        }
                    });
                }

                // Depth and discovery time are those of first discovery
                tx.execute(
                    "UPDATE urls SET status = ?1, content_type = ?2, processed_at = ?3, error = ?4
                     WHERE url = ?5",
                    params![
                        record.status.to_db_string(),
                        record.content_kind.to_db_string(),
                        processed_at,
                        record.error,
                        record.url,
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn ensure_pending(&mut self, url: &str, depth: u32) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO urls (url, status, content_type, depth, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                url,
                UrlStatus::Pending.to_db_string(),
                ContentKind::Unknown.to_db_string(),
                depth,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(inserted > 0)
    }

    fn count(&self, status: UrlStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn list(&self, status: UrlStatus) -> StorageResult<Vec<UrlRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM urls WHERE status = ?1 ORDER BY discovered_at, url",
            URL_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![status.to_db_string()], UrlRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(UrlRow::into_record).collect()
    }

    fn depth_breakdown(&self) -> StorageResult<BTreeMap<u32, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT depth, COUNT(*) FROM urls GROUP BY depth ORDER BY depth")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?)))?;

        let mut breakdown = BTreeMap::new();
        for row in rows {
            let (depth, count) = row?;
            breakdown.insert(depth, count as u64);
        }

        Ok(breakdown)
    }

    fn reset(&mut self) -> StorageResult<()> {
        let removed = self.conn.execute("DELETE FROM urls", [])?;
        debug!("Ledger reset, {} records removed", removed);
        Ok(())
    }
}

impl ContentSink for SqliteStorage {
    fn has(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM documents WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn append(&mut self, document: &ExtractedDocument) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO documents (url, content_type, extracted_at, body)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                document.url,
                document.kind.to_db_string(),
                document.extracted_at.to_rfc3339(),
                document.text,
            ],
        )?;
        Ok(inserted > 0)
    }

    fn size(&self) -> StorageResult<SinkSize> {
        let (documents, bytes, chars): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(LENGTH(CAST(body AS BLOB))), 0),
                    COALESCE(SUM(LENGTH(body)), 0)
             FROM documents",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(SinkSize {
            documents: documents as u64,
            bytes: bytes as u64,
            chars: chars as u64,
        })
    }

    fn documents(&self) -> StorageResult<Vec<ExtractedDocument>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, content_type, extracted_at, body FROM documents ORDER BY id")?;

        let rows = stmt
            .query_map([], |row| {
                Ok(DocumentRow {
                    url: row.get(0)?,
                    content_type: row.get(1)?,
                    extracted_at: row.get(2)?,
                    body: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    fn count_by_kind(&self, kind: ContentKind) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE content_type = ?1",
            params![kind.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn clear(&mut self) -> StorageResult<()> {
        let removed = self.conn.execute("DELETE FROM documents", [])?;
        debug!("Content sink cleared, {} documents removed", removed);
        Ok(())
    }
}

impl RunLog for SqliteStorage {
    fn create_run(&mut self, seed_url: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (seed_url, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![seed_url, now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                RunRow::from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;

        row.into_record()
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                RunRow::from_row,
            )
            .optional()?;

        row.map(RunRow::into_record).transpose()
    }
}
