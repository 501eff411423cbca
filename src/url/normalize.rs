use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Normalizes a URL into its canonical, deduplication-ready form
///
/// # Normalization Steps
///
/// 1. Resolve the URL against `base` when given; reject if malformed
/// 2. Accept only http and https
/// 3. Lowercase scheme and host, drop default ports
/// 4. Normalize path:
///    - Remove dot segments (. and ..) and repeated slashes
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Remove tracking query parameters
/// 7. Sort remaining query parameters by key (stable for repeated keys)
/// 8. Remove empty query string (trailing ?)
///
/// Normalizing an already canonical URL returns it unchanged.
///
/// # Arguments
///
/// * `raw` - The URL string to normalize, absolute or relative
/// * `base` - The page the URL was found on, used to resolve relative URLs
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use site_harvester::url::normalize_url;
/// use url::Url;
///
/// let url = normalize_url("HTTP://Example.COM:80/page/#top", None).unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page");
///
/// let base = Url::parse("https://example.com/docs/intro").unwrap();
/// let url = normalize_url("../about?b=2&a=1", Some(&base)).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about?a=1&b=2");
/// ```
pub fn normalize_url(raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    // Step 1: Parse or resolve the URL
    let mut url = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    }
    .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    // Step 2: Validate scheme
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // Step 3: Lowercase the host (the url crate already strips default ports)
    match url.host_str() {
        Some(host) if host.is_empty() => return Err(UrlError::MissingDomain),
        Some(host) => {
            let lowered = host.to_lowercase();
            if lowered != host {
                url.set_host(Some(&lowered))
                    .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
            }
        }
        None => return Err(UrlError::MissingDomain),
    }

    // Step 4: Normalize path
    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    // Step 5: Remove fragment
    url.set_fragment(None);

    // Steps 6-8: Filter and sort query parameters
    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        url.set_query(None);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    // Stable sort so repeated keys keep their relative order
    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> String {
        normalize_url(raw, None).unwrap().to_string()
    }

    #[test]
    fn test_scheme_preserved() {
        assert_eq!(norm("http://example.com/page"), "http://example.com/page");
        assert_eq!(norm("https://example.com/page"), "https://example.com/page");
    }

    #[test]
    fn test_lowercase_scheme_and_domain() {
        assert_eq!(norm("HTTPS://EXAMPLE.COM/Page"), "https://example.com/Page");
    }

    #[test]
    fn test_default_port_removed() {
        assert_eq!(norm("http://example.com:80/a"), "http://example.com/a");
        assert_eq!(norm("https://example.com:443/a"), "https://example.com/a");
        assert_eq!(norm("https://example.com:8443/a"), "https://example.com:8443/a");
    }

    #[test]
    fn test_remove_trailing_slash() {
        assert_eq!(norm("https://example.com/page/"), "https://example.com/page");
    }

    #[test]
    fn test_keep_root_slash() {
        assert_eq!(norm("https://example.com/"), "https://example.com/");
        assert_eq!(norm("https://example.com"), "https://example.com/");
    }

    #[test]
    fn test_remove_fragment() {
        assert_eq!(norm("https://example.com/page#section"), "https://example.com/page");
    }

    #[test]
    fn test_remove_tracking_params() {
        assert_eq!(
            norm("https://example.com/page?utm_source=twitter&fbclid=1"),
            "https://example.com/page"
        );
        assert_eq!(norm("https://example.com/page?utm_custom=x"), "https://example.com/page");
    }

    #[test]
    fn test_sort_query_params() {
        assert_eq!(
            norm("https://example.com/page?b=2&a=1"),
            "https://example.com/page?a=1&b=2"
        );
    }

    #[test]
    fn test_query_encoding_preserved() {
        // An encoded ampersand inside a value must not split the parameter
        assert_eq!(
            norm("https://example.com/s?q=a%26b&p=1"),
            "https://example.com/s?p=1&q=a%26b"
        );
    }

    #[test]
    fn test_repeated_keys_keep_order() {
        assert_eq!(
            norm("https://example.com/s?tag=z&a=1&tag=b"),
            "https://example.com/s?a=1&tag=z&tag=b"
        );
    }

    #[test]
    fn test_empty_query_removed() {
        assert_eq!(norm("https://example.com/page?"), "https://example.com/page");
    }

    #[test]
    fn test_normalize_path_with_dots() {
        assert_eq!(norm("https://example.com/a/../b/./c"), "https://example.com/b/c");
    }

    #[test]
    fn test_multiple_slashes() {
        assert_eq!(
            norm("https://example.com///path//to///page"),
            "https://example.com/path/to/page"
        );
    }

    #[test]
    fn test_relative_resolution() {
        let base = Url::parse("https://example.com/docs/guide/intro").unwrap();
        let resolve = |raw: &str| normalize_url(raw, Some(&base)).unwrap().to_string();

        assert_eq!(resolve("setup"), "https://example.com/docs/guide/setup");
        assert_eq!(resolve("../api/"), "https://example.com/docs/api");
        assert_eq!(resolve("/root"), "https://example.com/root");
        assert_eq!(resolve("#top"), "https://example.com/docs/guide/intro");
        assert_eq!(resolve("//cdn.example.com/x"), "https://cdn.example.com/x");
    }

    #[test]
    fn test_idempotent() {
        let once = norm("HTTP://WWW.Example.com:80/a/./b/?z=1&utm_term=x&a=2#frag");
        let twice = normalize_url(&once, None).unwrap().to_string();
        assert_eq!(once, twice);
        assert_eq!(once, "http://www.example.com/a/b?a=2&z=1");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page", None);
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));

        let base = Url::parse("https://example.com/").unwrap();
        assert!(matches!(
            normalize_url("mailto:someone@example.com", Some(&base)),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(
            normalize_url("javascript:void(0)", Some(&base)),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url", None).is_err());
        assert!(normalize_url("   ", None).is_err());
        assert!(normalize_url("http://", None).is_err());
    }
}
