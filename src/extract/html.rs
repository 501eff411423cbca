//! HTML text and link extraction
//!
//! Text comes from every text node outside the boilerplate elements listed in
//! `STRIPPED_ELEMENTS`, with whitespace collapsed. Links are the raw `href`
//! values of `<a>` tags; resolving and normalizing them is the crawler's job.
//!
//! Bytes are decoded with the charset named in the `Content-Type` header, then
//! a `<meta>` charset declaration near the top of the document, then UTF-8.

use crate::crawler::FetchedResource;
use crate::extract::{clean_text, DocumentKind, Extraction, ExtractionError, Extractor};
use crate::state::ContentKind;
use encoding_rs::{Encoding, UTF_8};
use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose contents never count as page text
pub const STRIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "template",
];

/// How far into the body to look for a `<meta>` charset declaration
const META_SNIFF_BYTES: usize = 1024;

/// Extracts readable text and outbound links from HTML pages
#[derive(Debug, Clone, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts text and raw link targets from an HTML string
    ///
    /// # Example
    ///
    /// ```
    /// use site_harvester::extract::HtmlExtractor;
    ///
    /// let html = r#"<html><body><nav>Menu</nav><p>Hello <b>world</b></p><a href="/next">Next</a></body></html>"#;
    /// let (text, links) = HtmlExtractor::new().extract_str(html).unwrap();
    /// assert_eq!(text, "Hello world Next");
    /// assert_eq!(links, vec!["/next".to_string()]);
    /// ```
    pub fn extract_str(&self, html: &str) -> Result<(String, Vec<String>), ExtractionError> {
        let document = Html::parse_document(html);
        Ok((extract_text(&document), extract_links(&document)?))
    }
}

impl Extractor for HtmlExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Html
    }

    fn extract(&self, resource: &FetchedResource) -> Result<Extraction, ExtractionError> {
        if resource.truncated {
            return Err(ExtractionError::TruncatedBody {
                received: resource.body.len() as u64,
                declared: resource.content_length,
            });
        }

        let html = decode_body(resource);
        let (text, links) = self.extract_str(&html)?;

        if text.is_empty() {
            return Err(ExtractionError::EmptyContent);
        }

        Ok(Extraction {
            kind: ContentKind::Html,
            text,
            links,
        })
    }
}

/// Decodes the body into a string using the declared or sniffed charset
///
/// A byte order mark wins over any label. Unknown labels fall back to UTF-8
/// and invalid sequences become U+FFFD.
pub fn decode_body(resource: &FetchedResource) -> String {
    let encoding = resource
        .content_type
        .as_deref()
        .and_then(charset_param)
        .or_else(|| sniff_meta_charset(&resource.body))
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(&resource.body);
    if had_errors {
        tracing::debug!(
            "Replaced invalid {} sequences in {}",
            used.name(),
            resource.url
        );
    }
    text.into_owned()
}

/// The `charset` parameter of a `Content-Type` value
fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c: char| c == '"' || c == '\'').to_string())
    })
}

/// Finds `<meta charset=...>` or the charset inside an `http-equiv` content value
fn sniff_meta_charset(body: &[u8]) -> Option<String> {
    let head = &body[..body.len().min(META_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let mut rest = head.as_str();
    while let Some(start) = rest.find("<meta") {
        let tag = &rest[start..];
        let tag = &tag[..tag.find('>').unwrap_or(tag.len())];
        if let Some(pos) = tag.find("charset=") {
            let value =
                tag[pos + "charset=".len()..].trim_start_matches(|c: char| c == '"' || c == '\'');
            let end = value
                .find(|c: char| matches!(c, '"' | '\'' | ';' | '/') || c.is_whitespace())
                .unwrap_or(value.len());
            if end > 0 {
                return Some(value[..end].to_string());
            }
        }
        rest = &rest[start + "<meta".len()..];
    }
    None
}

/// Collects page text, skipping stripped elements and their descendants
fn extract_text(document: &Html) -> String {
    let mut raw = String::new();
    let mut stack = vec![document.tree.root()];

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => {
                raw.push_str(text);
                raw.push(' ');
            }
            Node::Element(element) if STRIPPED_ELEMENTS.contains(&element.name()) => continue,
            _ => {}
        }
        // Reversed so the stack yields children in document order
        stack.extend(node.children().rev());
    }

    clean_text(&raw)
}

/// Collects raw `href` values of anchors, in document order
fn extract_links(document: &Html) -> Result<Vec<String>, ExtractionError> {
    let selector = Selector::parse("a[href]")
        .map_err(|e| ExtractionError::Html(format!("bad anchor selector: {:?}", e)))?;

    let links = document
        .select(&selector)
        .filter(|anchor| anchor.value().attr("download").is_none())
        .filter(|anchor| !inside_template(anchor))
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
        .map(str::to_string)
        .collect();

    Ok(links)
}

fn inside_template(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().name() == "template")
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn resource(html: &str) -> FetchedResource {
        FetchedResource::new(
            Url::parse("https://example.com/page").unwrap(),
            Some("text/html"),
            html.as_bytes().to_vec(),
        )
    }

    #[test]
    fn test_text_in_document_order() {
        let html = r#"<html><head><title>Title</title></head>
            <body><h1>Heading</h1><p>First   paragraph.</p>
            <div><p>Second</p> paragraph</div></body></html>"#;
        let (text, _) = HtmlExtractor::new().extract_str(html).unwrap();
        assert_eq!(text, "Title Heading First paragraph. Second paragraph");
    }

    #[test]
    fn test_boilerplate_stripped() {
        let html = r#"<html><head><style>body { color: red }</style>
            <script>var x = 1;</script></head>
            <body>
              <header>Site header</header>
              <nav><a href="/menu">Menu</a></nav>
              <main>Main content</main>
              <aside>Related</aside>
              <noscript>Enable JS</noscript>
              <footer>Copyright</footer>
            </body></html>"#;
        let (text, links) = HtmlExtractor::new().extract_str(html).unwrap();
        assert_eq!(text, "Main content");
        // Links inside boilerplate still count for traversal
        assert_eq!(links, vec!["/menu".to_string()]);
    }

    #[test]
    fn test_links_are_raw() {
        let html = r##"<html><body>
            <a href="/a">A</a>
            <a href=" relative/b ">B</a>
            <a href="https://other.org/c">C</a>
            <a href="mailto:x@example.com">Mail</a>
            <a href="#top">Top</a>
            <a href="">Empty</a>
            <a href="/file.zip" download>Get</a>
            <a>No href</a>
        </body></html>"##;
        let (_, links) = HtmlExtractor::new().extract_str(html).unwrap();
        assert_eq!(
            links,
            vec![
                "/a".to_string(),
                "relative/b".to_string(),
                "https://other.org/c".to_string(),
                "mailto:x@example.com".to_string(),
            ]
        );
    }

    #[test]
    fn test_extract_resource() {
        let extraction = HtmlExtractor::new()
            .extract(&resource("<p>Olá, mundo</p><a href='/x'>x</a>"))
            .unwrap();
        assert_eq!(extraction.kind, ContentKind::Html);
        assert_eq!(extraction.text, "Olá, mundo x");
        assert_eq!(extraction.links, vec!["/x".to_string()]);
    }

    #[test]
    fn test_empty_page_is_an_error() {
        let result = HtmlExtractor::new()
            .extract(&resource("<html><body><script>only()</script>   </body></html>"));
        assert!(matches!(result, Err(ExtractionError::EmptyContent)));
    }

    #[test]
    fn test_latin1_header_charset_decoded() {
        let res = FetchedResource::new(
            Url::parse("https://example.com/pt").unwrap(),
            Some("text/html; charset=ISO-8859-1"),
            b"<p>Informa\xe7\xe3o p\xfablica</p>".to_vec(),
        );
        let extraction = HtmlExtractor::new().extract(&res).unwrap();
        assert_eq!(extraction.text, "Informação pública");
    }

    #[test]
    fn test_meta_charset_decoded() {
        let mut res = resource("");
        res.body = b"<html><head><meta charset=\"windows-1252\"></head><body><p>caf\xe9</p></body></html>"
            .to_vec();
        assert_eq!(HtmlExtractor::new().extract(&res).unwrap().text, "café");

        res.body = b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=iso-8859-1\"><p>S\xe3o Paulo</p>"
            .to_vec();
        assert_eq!(HtmlExtractor::new().extract(&res).unwrap().text, "São Paulo");
    }

    #[test]
    fn test_header_charset_wins_over_meta() {
        let res = FetchedResource::new(
            Url::parse("https://example.com/").unwrap(),
            Some("text/html; charset=utf-8"),
            "<meta charset=\"iso-8859-1\"><p>ação</p>".as_bytes().to_vec(),
        );
        assert_eq!(HtmlExtractor::new().extract(&res).unwrap().text, "ação");
    }

    #[test]
    fn test_truncated_page_fails() {
        let mut res = resource("<html><body><p>first half of the pa");
        res.truncated = true;
        res.content_length = None;
        assert_eq!(
            HtmlExtractor::new().extract(&res),
            Err(ExtractionError::TruncatedBody {
                received: 35,
                declared: None,
            })
        );

        // Declared length over the cap: nothing was read at all
        let mut res = resource("");
        res.truncated = true;
        res.content_length = Some(80 * 1024 * 1024);
        assert!(matches!(
            HtmlExtractor::new().extract(&res),
            Err(ExtractionError::TruncatedBody { received: 0, declared: Some(_) })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut res = resource("");
        res.body = b"<p>caf\xe9</p>".to_vec();
        let extraction = HtmlExtractor::new().extract(&res).unwrap();
        assert!(extraction.text.starts_with("caf"));
    }
}
