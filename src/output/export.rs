//! Exported text file
//!
//! A self-contained, human-readable snapshot of the content sink. The file
//! opens with a header block and holds one record per document:
//!
//! ```text
//! ================================================================================
//! Exported at: 2026-01-05T10:30:00+00:00
//! Total HTML: 1
//! Total PDF: 0
//! Total documents: 1
//! ================================================================================
//!
//! ================================================================================
//! URL: https://example.com/
//! Type: HTML
//! Extracted at: 2026-01-05T10:29:58.120341+00:00
//! Length: 11
//! ================================================================================
//! Hello world
//! ```
//!
//! `Length` is the body size in bytes, so bodies are read back exactly even
//! when they contain separator lines. Files written by the earlier Portuguese
//! tool (`Tipo:`, `Extraído em:`, no `Length:`) are also readable; their bodies
//! run to the next separator.

use crate::state::ContentKind;
use crate::storage::{ExtractedDocument, StorageError};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Width of the separator line
pub const SEPARATOR_WIDTH: usize = 80;

/// Errors that can occur while writing or reading an export file
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Malformed export at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// A parsed export file
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    /// Absent for files without a header block
    pub exported_at: Option<DateTime<Utc>>,
    pub total_html: Option<u64>,
    pub total_pdf: Option<u64>,
    pub documents: Vec<ExtractedDocument>,
}

fn separator() -> String {
    "=".repeat(SEPARATOR_WIDTH)
}

/// Writes the export file for `documents` to `path`
///
/// Parent directories are created as needed and an existing file is replaced.
///
/// # Returns
///
/// The number of documents written
pub fn write_export(path: &Path, documents: &[ExtractedDocument]) -> Result<u64, ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(format_export(documents, Utc::now()).as_bytes())?;
    writer.flush()?;

    tracing::info!("Exported {} documents to {}", documents.len(), path.display());
    Ok(documents.len() as u64)
}

/// Renders the export file contents
pub fn format_export(documents: &[ExtractedDocument], exported_at: DateTime<Utc>) -> String {
    let sep = separator();
    let count = |kind: ContentKind| documents.iter().filter(|d| d.kind == kind).count();

    let mut out = String::new();
    out.push_str(&format!("{}\n", sep));
    out.push_str(&format!("Exported at: {}\n", exported_at.to_rfc3339()));
    out.push_str(&format!("Total HTML: {}\n", count(ContentKind::Html)));
    out.push_str(&format!("Total PDF: {}\n", count(ContentKind::Pdf)));
    out.push_str(&format!("Total documents: {}\n", documents.len()));
    out.push_str(&format!("{}\n\n", sep));

    for doc in documents {
        out.push_str(&format!("{}\n", sep));
        out.push_str(&format!("URL: {}\n", doc.url));
        out.push_str(&format!("Type: {}\n", doc.kind.export_label()));
        out.push_str(&format!("Extracted at: {}\n", doc.extracted_at.to_rfc3339()));
        out.push_str(&format!("Length: {}\n", doc.text.len()));
        out.push_str(&format!("{}\n", sep));
        out.push_str(&doc.text);
        out.push_str("\n\n");
    }

    out
}

/// Reads an export file from disk
pub fn read_export(path: &Path) -> Result<ExportFile, ExportError> {
    let contents = std::fs::read_to_string(path)?;
    parse_export(&contents)
}

/// Parses export file contents back into documents
pub fn parse_export(input: &str) -> Result<ExportFile, ExportError> {
    let mut reader = Reader::new(input);
    let mut file = ExportFile {
        exported_at: None,
        total_html: None,
        total_pdf: None,
        documents: Vec::new(),
    };

    reader.skip_blank_lines();
    if reader.peek_line_after_separator().is_some_and(|l| l.starts_with("Exported at:")) {
        reader.expect_separator()?;
        for (key, value) in reader.fields()? {
            match key {
                "Exported at" => file.exported_at = Some(reader.timestamp(value)?),
                "Total HTML" => file.total_html = Some(reader.number(value)?),
                "Total PDF" => file.total_pdf = Some(reader.number(value)?),
                _ => {}
            }
        }
    }

    loop {
        reader.skip_blank_lines();
        if reader.at_end() {
            break;
        }
        file.documents.push(reader.record()?);
    }

    Ok(file)
}

/// Line cursor over the export text
struct Reader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn error(&self, message: impl Into<String>) -> ExportError {
        ExportError::Parse {
            line: self.input[..self.pos].matches('\n').count() + 1,
            message: message.into(),
        }
    }

    /// Returns the line at the cursor without consuming it
    fn peek_line(&self) -> Option<(&'a str, usize)> {
        if self.at_end() {
            return None;
        }
        let rest = &self.input[self.pos..];
        let (line, consumed) = match rest.find('\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        Some((line.trim_end_matches('\r'), consumed))
    }

    fn next_line(&mut self) -> Option<&'a str> {
        let (line, consumed) = self.peek_line()?;
        self.pos += consumed;
        Some(line)
    }

    fn peek_line_after_separator(&self) -> Option<&'a str> {
        let (first, consumed) = self.peek_line()?;
        if !is_separator(first) {
            return None;
        }
        let after = Reader {
            input: self.input,
            pos: self.pos + consumed,
        };
        after.peek_line().map(|(line, _)| line)
    }

    fn skip_blank_lines(&mut self) {
        while let Some((line, consumed)) = self.peek_line() {
            if !line.trim().is_empty() {
                break;
            }
            self.pos += consumed;
        }
    }

    fn expect_separator(&mut self) -> Result<(), ExportError> {
        match self.next_line() {
            Some(line) if is_separator(line) => Ok(()),
            Some(line) => Err(self.error(format!("expected separator, found {:?}", line))),
            None => Err(self.error("expected separator, found end of file")),
        }
    }

    /// Reads `Key: value` lines up to and including the closing separator
    fn fields(&mut self) -> Result<Vec<(&'a str, &'a str)>, ExportError> {
        let mut fields = Vec::new();
        loop {
            let Some(line) = self.next_line() else {
                return Err(self.error("unterminated metadata block"));
            };
            if is_separator(line) {
                return Ok(fields);
            }
            match line.split_once(':') {
                Some((key, value)) => fields.push((key.trim(), value.trim())),
                None => return Err(self.error(format!("expected a field, found {:?}", line))),
            }
        }
    }

    fn record(&mut self) -> Result<ExtractedDocument, ExportError> {
        self.expect_separator()?;

        let mut url = None;
        let mut kind = None;
        let mut extracted_at = None;
        let mut length = None;
        for (key, value) in self.fields()? {
            match key {
                "URL" => url = Some(value.to_string()),
                "Type" | "Tipo" => {
                    kind = Some(
                        ContentKind::from_export_label(value)
                            .ok_or_else(|| self.error(format!("unknown type {:?}", value)))?,
                    )
                }
                "Extracted at" | "Extraído em" => extracted_at = Some(self.timestamp(value)?),
                "Length" => length = Some(self.number(value)?),
                _ => {}
            }
        }

        let url = url.ok_or_else(|| self.error("record without URL"))?;
        let text = match length {
            Some(len) => self.exact_body(len)?,
            None => self.body_to_separator(),
        };

        Ok(ExtractedDocument {
            url,
            kind: kind.unwrap_or(ContentKind::Unknown),
            extracted_at: extracted_at.ok_or_else(|| self.error("record without timestamp"))?,
            text,
        })
    }

    fn exact_body(&mut self, len: u64) -> Result<String, ExportError> {
        let end = usize::try_from(len)
            .ok()
            .and_then(|len| self.pos.checked_add(len))
            .ok_or_else(|| self.error("length out of range"))?;
        let body = self
            .input
            .get(self.pos..end)
            .ok_or_else(|| self.error(format!("body shorter than declared length {}", len)))?;
        self.pos = end;
        Ok(body.to_string())
    }

    /// Legacy records: the body runs to the next separator line
    fn body_to_separator(&mut self) -> String {
        let rest = &self.input[self.pos..];
        let boundary = format!("\n{}", separator());
        let end = rest
            .match_indices(&boundary)
            .map(|(idx, _)| idx)
            .find(|&idx| {
                let after = &rest[idx + boundary.len()..];
                after.is_empty() || after.starts_with('\n') || after.starts_with("\r\n")
            })
            .unwrap_or(rest.len());
        self.pos += end;
        rest[..end].trim().to_string()
    }

    fn timestamp(&self, value: &str) -> Result<DateTime<Utc>, ExportError> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
            return Ok(ts.with_timezone(&Utc));
        }
        // Legacy files carry naive local timestamps; read them as UTC
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|e| self.error(format!("bad timestamp {:?}: {}", value, e)))
    }

    fn number(&self, value: &str) -> Result<u64, ExportError> {
        value
            .parse()
            .map_err(|_| self.error(format!("expected a number, found {:?}", value)))
    }
}

fn is_separator(line: &str) -> bool {
    let line = line.trim_end();
    line.len() == SEPARATOR_WIDTH && line.bytes().all(|b| b == b'=')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(url: &str, kind: ContentKind, text: &str) -> ExtractedDocument {
        ExtractedDocument::new(url, kind, text)
    }

    #[test]
    fn test_header_counts() {
        let docs = vec![
            doc("https://example.com/", ContentKind::Html, "home"),
            doc("https://example.com/a.pdf", ContentKind::Pdf, "report"),
            doc("https://example.com/b", ContentKind::Html, "b"),
        ];
        let parsed = parse_export(&format_export(&docs, Utc::now())).unwrap();

        assert_eq!(parsed.total_html, Some(2));
        assert_eq!(parsed.total_pdf, Some(1));
        assert!(parsed.exported_at.is_some());
        assert_eq!(parsed.documents, docs);
    }

    #[test]
    fn test_body_containing_separator_survives() {
        let tricky = format!("before\n{}\nURL: https://fake.test/\n\n\nafter", separator());
        let docs = vec![
            doc("https://example.com/x", ContentKind::Html, &tricky),
            doc("https://example.com/y", ContentKind::Html, "çà ünïcode ✓"),
        ];
        let parsed = parse_export(&format_export(&docs, Utc::now())).unwrap();
        assert_eq!(parsed.documents, docs);
    }

    #[test]
    fn test_empty_sink() {
        let parsed = parse_export(&format_export(&[], Utc::now())).unwrap();
        assert_eq!(parsed.total_html, Some(0));
        assert!(parsed.documents.is_empty());
    }

    #[test]
    fn test_legacy_layout() {
        let sep = separator();
        let legacy = format!(
            "\n{sep}\nURL: https://example.com/pagina1\nTipo: html\nExtraído em: 2025-10-18T10:30:00\n{sep}\nPrimeira página.\n\n\n{sep}\nURL: https://example.com/doc.pdf\nTipo: pdf\nExtraído em: 2025-10-18T10:31:00.123456\n{sep}\nConteúdo do PDF\n\n"
        );

        let parsed = parse_export(&legacy).unwrap();
        assert_eq!(parsed.exported_at, None);
        assert_eq!(parsed.documents.len(), 2);

        let first = &parsed.documents[0];
        assert_eq!(first.url, "https://example.com/pagina1");
        assert_eq!(first.kind, ContentKind::Html);
        assert_eq!(first.text, "Primeira página.");
        assert_eq!(first.extracted_at.to_rfc3339(), "2025-10-18T10:30:00+00:00");

        assert_eq!(parsed.documents[1].kind, ContentKind::Pdf);
        assert_eq!(parsed.documents[1].text, "Conteúdo do PDF");
    }

    #[test]
    fn test_truncated_body_is_an_error() {
        let docs = vec![doc("https://example.com/", ContentKind::Html, "a long enough body")];
        let full = format_export(&docs, Utc::now());
        let cut = &full[..full.len() - 8];

        assert!(matches!(parse_export(cut), Err(ExportError::Parse { .. })));
    }

    #[test]
    fn test_missing_url_is_an_error() {
        let sep = separator();
        let input = format!("{sep}\nType: HTML\nExtracted at: 2026-01-01T00:00:00+00:00\nLength: 1\n{sep}\nx\n");
        match parse_export(&input) {
            Err(ExportError::Parse { message, .. }) => assert!(message.contains("URL")),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_write_and_read_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("text_output.txt");
        let docs = vec![doc("https://example.com/", ContentKind::Html, "hello")];

        assert_eq!(write_export(&path, &docs).unwrap(), 1);
        assert_eq!(read_export(&path).unwrap().documents, docs);
    }
}
