//! Output module for exports and reports
//!
//! This module handles:
//! - Writing the content sink to a human-readable export file
//! - Parsing export files back into documents
//! - Printing ledger and sink statistics and crawl summaries
//! - Opening the optional persistent log file

mod export;
mod logfile;
pub mod stats;

pub use export::{
    format_export, parse_export, read_export, write_export, ExportError, ExportFile,
    SEPARATOR_WIDTH,
};
pub use logfile::open_log_file;
pub use stats::{load_statistics, print_statistics, print_summary, HarvestStatistics};
