//! PDF text extraction

use crate::crawler::FetchedResource;
use crate::extract::{clean_text, DocumentKind, Extraction, ExtractionError, Extractor};
use crate::state::ContentKind;
use std::panic::{self, AssertUnwindSafe};

/// Extracts the text of every page of a PDF, refusing oversized files
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    max_bytes: u64,
}

impl PdfExtractor {
    /// Creates an extractor that refuses PDFs larger than `max_bytes`
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Extracts text from in-memory PDF bytes
    ///
    /// The size limit is not checked here; `extract` does that before
    /// calling in.
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        // pdf-extract panics on some malformed inputs
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(bytes)
        }));

        let raw = match outcome {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(ExtractionError::UnreadablePdf(e.to_string())),
            Err(_) => {
                return Err(ExtractionError::UnreadablePdf(
                    "parser panicked on malformed input".to_string(),
                ))
            }
        };

        let text = clean_text(&raw);
        if text.is_empty() {
            return Err(ExtractionError::EmptyContent);
        }
        Ok(text)
    }
}

impl Extractor for PdfExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Pdf
    }

    fn extract(&self, resource: &FetchedResource) -> Result<Extraction, ExtractionError> {
        let size = resource.size();
        if size > self.max_bytes || (resource.truncated && resource.body.len() as u64 >= self.max_bytes)
        {
            return Err(ExtractionError::OversizedResource {
                size,
                limit: self.max_bytes,
            });
        }
        if resource.truncated {
            return Err(ExtractionError::TruncatedBody {
                received: resource.body.len() as u64,
                declared: resource.content_length,
            });
        }

        let text = self.extract_bytes(&resource.body)?;

        Ok(Extraction {
            kind: ContentKind::Pdf,
            text,
            links: Vec::new(),
        })
    }
}
