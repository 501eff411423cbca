//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UrlStatus`: ledger status of a canonical URL (pending, processed, failed)
//! - `ContentKind`: what a URL turned out to be (HTML, PDF, unknown)

mod content_kind;
mod url_status;

// Re-export main types
pub use content_kind::ContentKind;
pub use url_status::UrlStatus;
