//! URL handling module for Site-Harvester
//!
//! This module provides URL normalization, host helpers, same-site
//! matching, and the link classification used by the crawler.

mod domain;
mod matcher;
mod normalize;

use crate::config::{CrawlBudget, SameDomainPolicy};
use url::Url;

// Re-export main functions
pub use domain::{path_extension, strip_www};
pub use matcher::{is_same_site, matches_domain, path_under};
pub use normalize::normalize_url;

/// File-extension category of a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionClass {
    /// Extension is on the block-list; never fetched
    Ignored,
    /// Path ends in `.pdf`
    Pdf,
    /// Anything else, expected to be an HTML page
    HtmlCandidate,
}

impl ExtensionClass {
    /// Returns true if a URL of this class may be fetched
    pub fn should_fetch(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Result of classifying a URL against a seed and a budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub same_domain: bool,
    pub extension: ExtensionClass,
}

impl Classification {
    /// Returns true if the URL may be enqueued
    pub fn is_crawlable(&self) -> bool {
        self.same_domain && self.extension.should_fetch()
    }
}

/// Classifies URLs relative to one seed
///
/// Built once per crawl; holds the normalized seed, the same-domain policy
/// and the extension block-list from the budget.
#[derive(Debug, Clone)]
pub struct Classifier {
    seed: Url,
    policy: SameDomainPolicy,
    ignored_extensions: Vec<String>,
}

impl Classifier {
    /// Creates a classifier for the given normalized seed
    ///
    /// # Examples
    ///
    /// ```
    /// use site_harvester::{CrawlBudget, Classifier, ExtensionClass};
    /// use site_harvester::url::normalize_url;
    ///
    /// let seed = normalize_url("https://example.com/", None).unwrap();
    /// let classifier = Classifier::new(&seed, &CrawlBudget::new(3, 100));
    ///
    /// let page = normalize_url("https://blog.example.com/post", None).unwrap();
    /// assert!(classifier.classify(&page).is_crawlable());
    ///
    /// let logo = normalize_url("https://example.com/logo.png", None).unwrap();
    /// assert_eq!(classifier.classify(&logo).extension, ExtensionClass::Ignored);
    /// ```
    pub fn new(seed: &Url, budget: &CrawlBudget) -> Self {
        Self {
            seed: seed.clone(),
            policy: budget.same_domain,
            ignored_extensions: budget.ignored_extensions.clone(),
        }
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// Classifies a normalized URL
    pub fn classify(&self, url: &Url) -> Classification {
        Classification {
            same_domain: is_same_site(self.policy, &self.seed, url),
            extension: self.extension_class(url),
        }
    }

    fn extension_class(&self, url: &Url) -> ExtensionClass {
        match path_extension(url) {
            Some(ext) if ext == ".pdf" => ExtensionClass::Pdf,
            Some(ext) if self.ignored_extensions.binary_search(&ext).is_ok() => {
                ExtensionClass::Ignored
            }
            _ => ExtensionClass::HtmlCandidate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(seed: &str, policy: SameDomainPolicy) -> Classifier {
        let seed = normalize_url(seed, None).unwrap();
        Classifier::new(&seed, &CrawlBudget::new(3, 100).with_same_domain(policy))
    }

    fn classify(c: &Classifier, raw: &str) -> Classification {
        c.classify(&normalize_url(raw, None).unwrap())
    }

    #[test]
    fn test_html_candidate() {
        let c = classifier("https://example.com/", SameDomainPolicy::Subdomains);
        let result = classify(&c, "https://example.com/about");
        assert_eq!(result.extension, ExtensionClass::HtmlCandidate);
        assert!(result.same_domain);
        assert!(result.is_crawlable());
    }

    #[test]
    fn test_pdf_extension_any_case() {
        let c = classifier("https://example.com/", SameDomainPolicy::Subdomains);
        assert_eq!(
            classify(&c, "https://example.com/files/Report.PDF").extension,
            ExtensionClass::Pdf
        );
    }

    #[test]
    fn test_ignored_extensions() {
        let c = classifier("https://example.com/", SameDomainPolicy::Subdomains);
        for raw in [
            "https://example.com/logo.png",
            "https://example.com/style.CSS",
            "https://example.com/app.js",
            "https://example.com/dump.zip",
        ] {
            let result = classify(&c, raw);
            assert_eq!(result.extension, ExtensionClass::Ignored, "{}", raw);
            assert!(!result.is_crawlable());
        }
    }

    #[test]
    fn test_custom_block_list() {
        let seed = normalize_url("https://example.com/", None).unwrap();
        let budget = CrawlBudget::new(1, 1).with_ignored_extensions(["docx"]);
        let c = Classifier::new(&seed, &budget);

        assert_eq!(
            classify(&c, "https://example.com/a.docx").extension,
            ExtensionClass::Ignored
        );
        assert_eq!(
            classify(&c, "https://example.com/a.png").extension,
            ExtensionClass::HtmlCandidate
        );
    }

    #[test]
    fn test_off_domain_not_crawlable() {
        let c = classifier("https://example.com/", SameDomainPolicy::Exact);
        let result = classify(&c, "https://other.org/page");
        assert!(!result.same_domain);
        assert!(!result.is_crawlable());
    }
}
