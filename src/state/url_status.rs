/// Ledger status definitions for tracking crawl progress
///
/// Every canonical URL in the ledger is in exactly one of these states.
use std::fmt;

/// Represents the processing status of a URL in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlStatus {
    /// URL has been discovered and enqueued but not yet handled
    Pending,

    /// URL was fetched and its text is in the content sink
    Processed,

    /// URL could not be fetched or extracted; the record carries the reason
    Failed,
}

impl UrlStatus {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if a record in this state may be overwritten with `next`
    ///
    /// `pending` may move to either terminal state. `failed` may move to
    /// `processed` when a later run retries it successfully. Nothing else
    /// changes once written.
    pub fn can_transition_to(&self, next: UrlStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processed)
                | (Self::Pending, Self::Failed)
                | (Self::Failed, Self::Processed)
        )
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processed" => Some(Self::Processed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_states() -> Vec<Self> {
        vec![Self::Pending, Self::Processed, Self::Failed]
    }
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
