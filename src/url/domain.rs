use url::Url;

/// Strips a single leading `www.` label from a host
///
/// A host that is nothing but `www.` followed by nothing is returned as-is.
pub fn strip_www(host: &str) -> &str {
    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest,
        _ => host,
    }
}

/// Returns the lowercase extension of the last path segment, with its dot
///
/// `/files/Report.PDF` yields `.pdf`; `/docs` and `/` yield `None`.
pub fn path_extension(url: &Url) -> Option<String> {
    let last = url.path().rsplit('/').next()?;
    let dot = last.rfind('.')?;
    let ext = &last[dot..];
    if ext.len() < 2 {
        return None;
    }
    Some(ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_www() {
        assert_eq!(strip_www("www.example.com"), "example.com");
        assert_eq!(strip_www("example.com"), "example.com");
        assert_eq!(strip_www("www2.example.com"), "www2.example.com");
        assert_eq!(strip_www("www."), "www.");
    }

    #[test]
    fn test_path_extension() {
        let ext = |s: &str| path_extension(&Url::parse(s).unwrap());

        assert_eq!(ext("https://example.com/files/Report.PDF"), Some(".pdf".into()));
        assert_eq!(ext("https://example.com/img/logo.png?v=2"), Some(".png".into()));
        assert_eq!(ext("https://example.com/archive.tar.gz"), Some(".gz".into()));
        assert_eq!(ext("https://example.com/docs"), None);
        assert_eq!(ext("https://example.com/"), None);
        assert_eq!(ext("https://example.com/v1.2/guide"), None);
        assert_eq!(ext("https://example.com/trailing."), None);
    }
}
