use crate::config::SameDomainPolicy;
use crate::url::domain::strip_www;
use url::Url;

/// Checks if a host lies within a base domain
///
/// The base domain itself matches, as does any subdomain of it at any depth.
///
/// # Examples
///
/// ```
/// use site_harvester::url::matches_domain;
///
/// assert!(matches_domain("example.com", "example.com"));
/// assert!(matches_domain("example.com", "blog.example.com"));
/// assert!(matches_domain("example.com", "api.v2.example.com"));
/// assert!(!matches_domain("example.com", "notexample.com"));
/// assert!(!matches_domain("blog.example.com", "example.com"));
/// ```
pub fn matches_domain(base: &str, candidate: &str) -> bool {
    candidate == base
        || candidate
            .strip_suffix(base)
            .map_or(false, |prefix| prefix.ends_with('.'))
}

/// Checks if `path` lies under `prefix`, on segment boundaries
///
/// `/docs` contains `/docs` and `/docs/intro` but not `/docsearch`.
pub fn path_under(prefix: &str, path: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Decides whether `candidate` belongs to the site rooted at `seed`
///
/// # Arguments
///
/// * `policy` - The configured same-domain rule
/// * `seed` - The normalized seed URL
/// * `candidate` - The normalized URL under test
///
/// # Returns
///
/// * `true` - The candidate may be crawled as part of the seed's site
/// * `false` - The candidate is off-domain
pub fn is_same_site(policy: SameDomainPolicy, seed: &Url, candidate: &Url) -> bool {
    let (Some(seed_host), Some(host)) = (seed.host_str(), candidate.host_str()) else {
        return false;
    };

    match policy {
        SameDomainPolicy::Exact => host == seed_host,
        SameDomainPolicy::Subdomains => matches_domain(strip_www(seed_host), strip_www(host)),
        SameDomainPolicy::SeedPrefix => {
            host == seed_host && path_under(seed.path(), candidate.path())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_matches_domain() {
        assert!(matches_domain("example.com", "example.com"));
        assert!(matches_domain("example.com", "deep.nested.sub.example.com"));
        assert!(!matches_domain("example.com", "example.org"));
        assert!(!matches_domain("example.com", "badexample.com"));
    }

    #[test]
    fn test_path_under() {
        assert!(path_under("/", "/anything"));
        assert!(path_under("/docs", "/docs"));
        assert!(path_under("/docs", "/docs/intro"));
        assert!(path_under("/docs/", "/docs/intro"));
        assert!(!path_under("/docs", "/docsearch"));
        assert!(!path_under("/docs", "/blog"));
    }

    #[test]
    fn test_exact_policy() {
        let seed = url("https://example.com/");
        assert!(is_same_site(SameDomainPolicy::Exact, &seed, &url("https://example.com/a")));
        assert!(!is_same_site(SameDomainPolicy::Exact, &seed, &url("https://www.example.com/a")));
        assert!(!is_same_site(SameDomainPolicy::Exact, &seed, &url("https://blog.example.com/")));
    }

    #[test]
    fn test_subdomains_policy_ignores_www() {
        let seed = url("https://www.example.com/");
        let policy = SameDomainPolicy::Subdomains;

        assert!(is_same_site(policy, &seed, &url("https://example.com/a")));
        assert!(is_same_site(policy, &seed, &url("https://www.example.com/a")));
        assert!(is_same_site(policy, &seed, &url("https://blog.example.com/a")));
        assert!(!is_same_site(policy, &seed, &url("https://example.org/a")));
        assert!(!is_same_site(policy, &seed, &url("https://notexample.com/a")));
    }

    #[test]
    fn test_scheme_does_not_matter() {
        let seed = url("https://example.com/");
        assert!(is_same_site(SameDomainPolicy::Subdomains, &seed, &url("http://example.com/x")));
    }

    #[test]
    fn test_seed_prefix_policy() {
        let seed = url("https://example.com/docs");
        let policy = SameDomainPolicy::SeedPrefix;

        assert!(is_same_site(policy, &seed, &url("https://example.com/docs")));
        assert!(is_same_site(policy, &seed, &url("https://example.com/docs/a/b")));
        assert!(!is_same_site(policy, &seed, &url("https://example.com/blog")));
        assert!(!is_same_site(policy, &seed, &url("https://sub.example.com/docs/a")));
    }
}
