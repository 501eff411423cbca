use std::fmt;

/// Kind of content a URL resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Html,
    Pdf,
    /// Not yet fetched, or the fetch failed before the type was known
    Unknown,
}

impl ContentKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "html" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Label used in the text export
    pub fn export_label(&self) -> &'static str {
        match self {
            Self::Html => "HTML",
            Self::Pdf => "PDF",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parses an export label, case-insensitively
    pub fn from_export_label(s: &str) -> Option<Self> {
        Self::from_db_string(&s.trim().to_lowercase())
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
