use dirscrape::config::{Config, RunOptions};
use dirscrape::crawler::run_crawl;
use dirscrape::ScrapeError;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, work_dir: &Path) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.site.seed_url = format!("{}/simple-search?searchterm=&page=1", base_url);
    config.crawler.max_concurrency = 2;
    config.crawler.request_timeout_secs = 5;
    config.output.data_dir = work_dir.join("data").display().to_string();
    config.output.cache_dir = work_dir.join(".cache").display().to_string();
    config
}

fn company_row(name: &str, slug: &str) -> String {
    format!(
        r#"<div class="views-row">
             <span class="h4">{name}</span>
             <div class="d-sm-flex">
               <p><i title="Email"></i> info@{slug}.test</p>
               <p><i title="Phone"></i> 208-555-0199</p>
             </div>
             <a class="btn btn-sm btn-primary" href="/company/{slug}">View</a>
           </div>"#
    )
}

fn listing(rows: &[(&str, &str)], next: Option<&str>) -> String {
    let rows: String = rows.iter().map(|(n, s)| company_row(n, s)).collect();
    let next = next
        .map(|href| format!(r#"<a class="page-link" rel="next" href="{}">›</a>"#, href))
        .unwrap_or_default();
    format!(
        r#"<html><body><div class="view-content">{}</div><nav>{}</nav></body></html>"#,
        rows, next
    )
}

fn detail(employees: &str) -> String {
    format!(
        r#"<html><body><div id="summary"><table>
             <tr><td>Employees:</td><td>{}</td></tr>
             <tr><td>Year Established:</td><td>1999</td></tr>
           </table></div></body></html>"#,
        employees
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

/// Mounts a one-page listing with "Acme" and "Be ta/Co", each hit once
async fn mount_two_company_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/simple-search"))
        .and(query_param("page", "1"))
        .respond_with(html(listing(&[("Acme", "acme"), ("Be ta/Co", "beta")], None)))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/company/acme"))
        .respond_with(html(detail("12")))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/company/beta"))
        .respond_with(html(detail("40")))
        .expect(1)
        .mount(server)
        .await;
}

fn read_json(path: &Path) -> serde_json::Value {
    let raw = std::fs::read(path).expect("artifact missing");
    serde_json::from_slice(&raw).expect("artifact is not JSON")
}

#[tokio::test]
async fn test_end_to_end_two_companies() {
    let mock_server = MockServer::start().await;
    mount_two_company_site(&mock_server).await;

    let work = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), work.path());

    let summary = run_crawl(config, RunOptions::default())
        .await
        .expect("Crawl failed");

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.seed_records, 2);
    assert_eq!(summary.detail_records, 2);
    assert!(!summary.kv_written);

    let data = work.path().join("data");

    let companies = read_json(&data.join("_companies.json"));
    assert_eq!(companies.as_array().unwrap().len(), 2);
    assert_eq!(companies[0]["email"], "info@acme.test");

    let beta = read_json(&data.join("Be_ta_Co.json"));
    assert_eq!(beta["employees"], "40");
    assert_eq!(beta["year_established"], "1999");

    let everything = read_json(&data.join("_everything.json"));
    let records = everything.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["name"], "Acme");
    assert_eq!(records[0]["details"]["employees"], "12");
    assert_eq!(records[1]["name"], "Be ta/Co");
    assert_eq!(
        records[1]["detail_url"],
        format!("{}/company/beta", mock_server.uri())
    );
}

#[tokio::test]
async fn test_rerun_in_strict_mode_is_served_from_cache() {
    let mock_server = MockServer::start().await;
    // Each mock expects exactly one hit across both runs
    mount_two_company_site(&mock_server).await;

    let work = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), work.path());

    run_crawl(config.clone(), RunOptions::default())
        .await
        .expect("First crawl failed");

    std::fs::remove_dir_all(work.path().join("data")).unwrap();

    let strict = RunOptions {
        use_kv: false,
        strict_cache: true,
    };
    let summary = run_crawl(config, strict)
        .await
        .expect("Strict crawl should be fully cached");

    assert_eq!(summary.detail_records, 2);
    assert!(work.path().join("data").join("_everything.json").exists());
}

#[tokio::test]
async fn test_strict_mode_with_cold_cache_fails() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html(listing(&[], None)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let work = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), work.path());
    let strict = RunOptions {
        use_kv: false,
        strict_cache: true,
    };

    let err = run_crawl(config, strict).await.unwrap_err();
    assert!(matches!(err, ScrapeError::CacheMiss { .. }));
}

#[tokio::test]
async fn test_pagination_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/simple-search"))
        .and(query_param("page", "1"))
        .respond_with(html(listing(
            &[("Acme", "acme")],
            Some("?searchterm=&page=2"),
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/simple-search"))
        .and(query_param("page", "2"))
        .respond_with(html(listing(&[("Zenith", "zenith")], None)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/company/acme"))
        .respond_with(html(detail("3")))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/company/zenith"))
        .respond_with(html(detail("7")))
        .mount(&mock_server)
        .await;

    let work = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), work.path());

    let summary = run_crawl(config, RunOptions::default()).await.unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.seed_records, 2);

    let everything = read_json(&work.path().join("data").join("_everything.json"));
    assert_eq!(everything[0]["name"], "Acme");
    assert_eq!(everything[1]["name"], "Zenith");
}

#[tokio::test]
async fn test_failed_detail_aborts_and_is_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/simple-search"))
        .respond_with(html(listing(&[("Acme", "acme"), ("Be ta/Co", "beta")], None)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/company/acme"))
        .respond_with(html(detail("12")))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/company/beta"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let work = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), work.path());

    let err = run_crawl(config, RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, ScrapeError::HttpStatus { status: 500, .. }));

    // The listing was checkpointed, the joined set was not
    let data = work.path().join("data");
    assert!(data.join("_companies.json").exists());
    assert!(!data.join("_everything.json").exists());

    let cached: Vec<String> = std::fs::read_dir(work.path().join(".cache"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(cached.iter().any(|name| name.contains("simple-search")));
    assert!(!cached.iter().any(|name| name.contains("beta")));
}
