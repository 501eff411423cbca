//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the fetcher and the full crawl cycle end-to-end.

use site_harvester::config::{load_config_with_hash, CrawlBudget, UserAgentConfig};
use site_harvester::crawler::{harvest, FetchError, Fetcher, HttpFetcher};
use site_harvester::output::read_export;
use site_harvester::storage::{open_storage, ContentSink, Ledger, SqliteStorage};
use site_harvester::{ContentKind, Crawler, TerminationReason, UrlStatus};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html; charset=utf-8",
    )
}

/// Mounts a small site:
///
/// `/` links to `/page1`, `/page2`, `/doc.pdf`, `/logo.png` and an external host;
/// `/page1` links back to `/` and on to `/page1/deep`.
async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<nav>menu</nav><h1>Home</h1><p>Welcome home.</p>
               <a href="/page1">One</a>
               <a href="page2?utm_source=x#top">Two</a>
               <a href="/doc.pdf">Report</a>
               <a href="/logo.png">Logo</a>
               <a href="https://elsewhere.test/">Away</a>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html(
            r#"<p>First page.</p><a href="/">Home</a><a href="/page1/deep">Deeper</a>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html("<p>Second page.</p>"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"this is not really a pdf".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1/deep"))
        .respond_with(html("<p>Too deep.</p>"))
        .expect(0)
        .mount(server)
        .await;
}

fn crawler(db: &std::path::Path) -> Crawler<SqliteStorage, HttpFetcher> {
    let storage = open_storage(db).unwrap();
    let fetcher = HttpFetcher::new(&user_agent(), 50 * 1024 * 1024).unwrap();
    Crawler::new(Arc::new(Mutex::new(storage)), fetcher)
}

fn budget() -> CrawlBudget {
    CrawlBudget::new(1, 50)
        .with_delay(Duration::ZERO)
        .with_request_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_fetcher_returns_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(html("<p>hi</p>"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&user_agent(), 1024).unwrap();
    let url = Url::parse(&format!("{}/hello", server.uri())).unwrap();
    let resource = fetcher.fetch(&url, Duration::from_secs(5)).await.unwrap();

    assert_eq!(resource.status, 200);
    assert_eq!(resource.mime_type().as_deref(), Some("text/html"));
    assert!(!resource.truncated);
    assert!(String::from_utf8(resource.body).unwrap().contains("<p>hi</p>"));
}

#[tokio::test]
async fn test_fetcher_reports_http_status() {
    let server = MockServer::start().await;
    let fetcher = HttpFetcher::new(&user_agent(), 1024).unwrap();
    let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();

    match fetcher.fetch(&url, Duration::from_secs(5)).await {
        Err(FetchError::HttpStatus { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected HttpStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetcher_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<p>late</p>").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&user_agent(), 1024).unwrap();
    let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
    let result = fetcher.fetch(&url, Duration::from_millis(200)).await;

    assert!(matches!(result, Err(FetchError::Timeout { .. })));
}

#[tokio::test]
async fn test_full_crawl_and_export_round_trip() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = TempDir::new().unwrap();
    let crawler = crawler(&dir.path().join("harvest.db"));
    let seed = format!("{}/", server.uri());

    let summary = crawler
        .crawl(&seed, &budget(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.termination, TerminationReason::Completed);
    assert_eq!(summary.html_pages, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.discarded_by_depth, 1);

    let storage = crawler.storage().lock().unwrap();
    let documents = storage.documents().unwrap();
    let urls: Vec<&str> = documents.iter().map(|d| d.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            seed.clone(),
            format!("{}/page1", server.uri()),
            format!("{}/page2", server.uri()),
        ]
    );
    assert_eq!(documents[0].text, "Home Welcome home. One Two Report Logo Away");
    assert!(documents.iter().all(|d| d.kind == ContentKind::Html));

    let pdf = storage
        .get(&format!("{}/doc.pdf", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(pdf.status, UrlStatus::Failed);
    assert_eq!(pdf.content_kind, ContentKind::Pdf);

    let export_path = dir.path().join("export").join("text_output.txt");
    assert_eq!(storage.export(&export_path).unwrap(), 3);
    let exported = read_export(&export_path).unwrap();
    assert_eq!(exported.total_html, Some(3));
    assert_eq!(exported.total_pdf, Some(0));
    assert_eq!(exported.documents, documents);
}

#[tokio::test]
async fn test_second_run_fetches_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<p>Home</p><a href="/a">A</a>"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html("<p>A</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db = dir.path().join("harvest.db");
    let seed = format!("{}/", server.uri());
    let cancel = CancellationToken::new();

    let first = crawler(&db).crawl(&seed, &budget(), &cancel).await.unwrap();
    assert_eq!(first.pages(), 2);

    // A new process opening the same database
    let crawler = crawler(&db);
    let second = crawler.crawl(&seed, &budget(), &cancel).await.unwrap();
    assert_eq!(second.pages(), 0);
    assert_eq!(second.skipped, 1);

    let storage = crawler.storage().lock().unwrap();
    assert_eq!(storage.documents().unwrap().len(), 2);
    assert_eq!(storage.count(UrlStatus::Processed).unwrap(), 2);
}

#[tokio::test]
async fn test_latin1_page_stored_as_utf8() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"<html><body><p>Pol\xedtica de privacidade e informa\xe7\xe3o</p></body></html>".to_vec())
                .insert_header("content-type", "text/html; charset=iso-8859-1"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let crawler = crawler(&dir.path().join("harvest.db"));
    let seed = format!("{}/", server.uri());
    crawler
        .crawl(&seed, &budget(), &CancellationToken::new())
        .await
        .unwrap();

    let storage = crawler.storage().lock().unwrap();
    let documents = storage.documents().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].text, "Política de privacidade e informação");
}

#[tokio::test]
async fn test_harvest_from_config_file() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("data").join("harvest.db");

    let config_path = dir.path().join("harvest.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[crawler]
max-depth = 1
max-pages = 2
delay-between-requests = 0.0

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "ops@example.com"

[output]
database-path = "{}"

[[seed]]
url = "{}/"
"#,
            db.display(),
            server.uri()
        ),
    )
    .unwrap();

    let (config, hash) = load_config_with_hash(&config_path).unwrap();
    let storage = Arc::new(Mutex::new(open_storage(&db).unwrap()));
    let summaries = harvest(
        &config,
        &hash,
        Arc::clone(&storage),
        &config.seed_urls(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].pages(), 2);
    assert_eq!(summaries[0].termination, TerminationReason::BudgetExhausted);
    assert_eq!(storage.lock().unwrap().documents().unwrap().len(), 2);
}
