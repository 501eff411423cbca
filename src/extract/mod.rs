//! Extractor dispatch
//!
//! Routes a fetched resource to the HTML or PDF extractor and returns the
//! extracted text plus outbound links (HTML only). Everything here is a pure
//! function of the fetched bytes; nothing touches the ledger or the sink.
//!
//! # Selection
//!
//! The response `Content-Type` decides first. When it is missing or generic
//! (`application/octet-stream`), the URL's extension category and the
//! `%PDF-` magic bytes decide instead.

mod html;
mod pdf;

pub use html::{HtmlExtractor, STRIPPED_ELEMENTS};
pub use pdf::PdfExtractor;

use crate::crawler::FetchedResource;
use crate::state::ContentKind;
use crate::url::ExtensionClass;
use thiserror::Error;

/// Per-URL extraction failures
///
/// The URL is recorded as failed with the error text and the crawl continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("Resource of {size} bytes exceeds the {limit} byte limit")]
    OversizedResource { size: u64, limit: u64 },

    #[error("Unreadable PDF: {0}")]
    UnreadablePdf(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Body cut off after {received} bytes")]
    TruncatedBody { received: u64, declared: Option<u64> },

    #[error("No text left after cleaning")]
    EmptyContent,

    #[error("HTML error: {0}")]
    Html(String),
}

/// Which extractor handles a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Html,
    Pdf,
}

impl DocumentKind {
    pub fn content_kind(&self) -> ContentKind {
        match self {
            Self::Html => ContentKind::Html,
            Self::Pdf => ContentKind::Pdf,
        }
    }
}

/// Output of a successful extraction
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub kind: ContentKind,
    pub text: String,
    /// Raw, unnormalized link targets in document order
    pub links: Vec<String>,
}

/// Turns fetched bytes into text
pub trait Extractor {
    /// The kind of document this extractor handles
    fn kind(&self) -> DocumentKind;

    fn extract(&self, resource: &FetchedResource) -> Result<Extraction, ExtractionError>;
}

/// Picks the extractor for each fetched resource
#[derive(Debug, Clone)]
pub struct Dispatcher {
    html: HtmlExtractor,
    pdf: PdfExtractor,
}

impl Dispatcher {
    /// Creates a dispatcher whose PDF extractor refuses files above `max_pdf_bytes`
    pub fn new(max_pdf_bytes: u64) -> Self {
        Self {
            html: HtmlExtractor::new(),
            pdf: PdfExtractor::new(max_pdf_bytes),
        }
    }

    /// Decides which extractor handles a resource
    ///
    /// # Arguments
    ///
    /// * `resource` - The fetched resource
    /// * `extension` - Extension category of the URL, used when the header is not conclusive
    ///
    /// # Returns
    ///
    /// * `Ok(DocumentKind)` - The extractor to use
    /// * `Err(ExtractionError::UnsupportedContentType)` - Neither extractor applies
    pub fn select(
        &self,
        resource: &FetchedResource,
        extension: ExtensionClass,
    ) -> Result<DocumentKind, ExtractionError> {
        let mime = resource.mime_type();

        match mime.as_deref() {
            Some("text/html") | Some("application/xhtml+xml") => Ok(DocumentKind::Html),
            Some("application/pdf") | Some("application/x-pdf") => Ok(DocumentKind::Pdf),
            None | Some("application/octet-stream") | Some("binary/octet-stream") => {
                if resource.body.starts_with(b"%PDF-") {
                    return Ok(DocumentKind::Pdf);
                }
                match extension {
                    ExtensionClass::Pdf => Ok(DocumentKind::Pdf),
                    ExtensionClass::HtmlCandidate if mime.is_none() => Ok(DocumentKind::Html),
                    _ => Err(ExtractionError::UnsupportedContentType(
                        mime.unwrap_or_else(|| "none".to_string()),
                    )),
                }
            }
            Some(other) => Err(ExtractionError::UnsupportedContentType(other.to_string())),
        }
    }

    /// Selects an extractor and runs it
    pub fn dispatch(
        &self,
        resource: &FetchedResource,
        extension: ExtensionClass,
    ) -> Result<Extraction, ExtractionError> {
        let extractor: &dyn Extractor = match self.select(resource, extension)? {
            DocumentKind::Html => &self.html,
            DocumentKind::Pdf => &self.pdf,
        };
        extractor.extract(resource)
    }
}

/// Collapses all whitespace runs to single spaces and trims the ends
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
