use std::time::Duration;

use page_image_extractor::acquire::{RepeatedFetchAcquirer, SingleFetchAcquirer};
use page_image_extractor::config::AppConfig;
use page_image_extractor::error::ExtractionError;
use page_image_extractor::extract::classify::PathPatternSet;
use page_image_extractor::extract::{extract_from_html, run_extraction};
use page_image_extractor::fetch::build_client;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> reqwest::Client {
    build_client(&AppConfig::default()).unwrap()
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!("<html><body>{body}</body></html>"))
}

fn target(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{p}", server.uri())).unwrap()
}

#[test]
fn img_with_alt_becomes_one_record() {
    let base = Url::parse("https://ex.com/").unwrap();
    let result = extract_from_html(r#"<img src="/a.jpg" alt="x">"#, &base, PathPatternSet::Extended);

    assert_eq!(result.records.len(), 1);
    let record = &result.records[0];
    assert_eq!(record.url, "https://ex.com/a.jpg");
    assert_eq!(record.file_type, "jpg");
    assert_eq!(record.alt_text, "x");
}

#[test]
fn protocol_relative_lazy_source_inherits_scheme() {
    let base = Url::parse("https://ex.com/").unwrap();
    let result = extract_from_html(
        r#"<img data-src="//cdn.ex.com/b.png">"#,
        &base,
        PathPatternSet::Extended,
    );

    let urls: Vec<_> = result.records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, ["https://cdn.ex.com/b.png"]);
    assert_eq!(result.records[0].provenance, "img-data-src");
}

#[test]
fn inline_background_resolves_against_document_directory() {
    let base = Url::parse("https://ex.com/dir/page.html").unwrap();
    let result = extract_from_html(
        r#"<div style="background-image:url('c.webp')"></div>"#,
        &base,
        PathPatternSet::Extended,
    );

    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].url, "https://ex.com/dir/c.webp");
    assert_eq!(result.records[0].provenance, "style-background");
    assert_eq!(result.records[0].file_type, "webp");
}

#[test]
fn same_url_in_src_and_data_src_is_reported_once() {
    let base = Url::parse("https://ex.com/").unwrap();
    let result = extract_from_html(
        r#"<img src="/dup.jpg" data-src="https://ex.com/dup.jpg" alt="d">"#,
        &base,
        PathPatternSet::Extended,
    );

    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].provenance, "img-src");
}

#[tokio::test]
async fn basic_fetch_of_missing_page_fails_without_partial_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"<img src="/a.jpg">"#))
        .mount(&server)
        .await;

    let url = target(&server, "/missing");
    let mut acquirer = SingleFetchAcquirer::new(client(), url.clone());
    let err = run_extraction(&url, &mut acquirer, PathPatternSet::Conservative)
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::Upstream { status: 404 }));
    assert_eq!(err.status_code().as_u16(), 500);
}

#[tokio::test]
async fn basic_fetch_collects_from_served_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(html(
            r#"<img src="/img/hero.jpg" alt="Hero"><img src="/media/clip"><script src="/app.js"></script>"#,
        ))
        .mount(&server)
        .await;

    let url = target(&server, "/article");
    let mut acquirer = SingleFetchAcquirer::new(client(), url.clone());
    let result = run_extraction(&url, &mut acquirer, PathPatternSet::Conservative)
        .await
        .unwrap();

    let urls: Vec<_> = result.records.iter().map(|r| r.url.clone()).collect();
    assert_eq!(urls, [format!("{}/img/hero.jpg", server.uri())]);
    assert_eq!(result.total_passes, 1);
    assert_eq!(result.stats_by_pass.get(&0), Some(&1));
}

#[tokio::test]
async fn later_pass_adds_images_and_keeps_first_attribution() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(html(r#"<img src="/img/a.jpg" alt="first">"#))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(html(
            r#"<img src="/img/a.jpg" alt="second"><img src="/img/b.png" alt="late">"#,
        ))
        .mount(&server)
        .await;

    let url = target(&server, "/feed");
    let mut acquirer =
        RepeatedFetchAcquirer::enhanced(client(), url.clone(), Duration::from_millis(5));
    let result = run_extraction(&url, &mut acquirer, PathPatternSet::Extended)
        .await
        .unwrap();

    assert_eq!(result.total_passes, 2);
    assert_eq!(result.records.len(), 2);

    let a = &result.records[0];
    assert!(a.url.ends_with("/img/a.jpg"));
    assert_eq!(a.alt_text, "first");
    assert_eq!(a.pass_index, 0);

    let b = &result.records[1];
    assert!(b.url.ends_with("/img/b.png"));
    assert_eq!(b.pass_index, 1);

    assert_eq!(result.stats_by_pass.get(&0), Some(&1));
    assert_eq!(result.stats_by_pass.get(&1), Some(&1));
}

#[tokio::test]
async fn failed_pass_is_skipped_when_another_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(html(r#"<img src="/uploads/ok.gif">"#))
        .mount(&server)
        .await;

    let url = target(&server, "/flaky");
    let mut acquirer =
        RepeatedFetchAcquirer::scroll_simulation(client(), url.clone(), 3, Duration::ZERO);
    let result = run_extraction(&url, &mut acquirer, PathPatternSet::Extended)
        .await
        .unwrap();

    assert_eq!(result.total_passes, 3);
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].pass_index, 1);
}

#[tokio::test]
async fn repeated_fetch_survives_every_pass_failing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let url = target(&server, "/down");

    let mut enhanced =
        RepeatedFetchAcquirer::enhanced(client(), url.clone(), Duration::from_millis(1));
    assert_eq!(enhanced.passes(), 2);
    let result = run_extraction(&url, &mut enhanced, PathPatternSet::Extended)
        .await
        .unwrap();
    assert_eq!(result.total_passes, 2);
    assert!(result.records.is_empty());
    assert!(result.stats_by_pass.is_empty());

    let mut single_pass = RepeatedFetchAcquirer::enhanced(client(), url.clone(), Duration::ZERO);
    assert_eq!(single_pass.passes(), 1);
    let result = run_extraction(&url, &mut single_pass, PathPatternSet::Extended)
        .await
        .unwrap();
    assert_eq!(result.total_passes, 1);
    assert!(result.records.is_empty());
}

#[tokio::test]
async fn resampling_sends_viewport_headers_after_first_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gallery"))
        .and(header("viewport-width", "1920"))
        .respond_with(html(r#"<img src="/img/1.jpg"><img src="/img/2.jpg">"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gallery"))
        .respond_with(html(r#"<img src="/img/1.jpg">"#))
        .mount(&server)
        .await;

    let url = target(&server, "/gallery");
    let mut acquirer =
        RepeatedFetchAcquirer::scroll_simulation(client(), url.clone(), 2, Duration::ZERO);
    let result = run_extraction(&url, &mut acquirer, PathPatternSet::Extended)
        .await
        .unwrap();

    let passes: Vec<_> = result.records.iter().map(|r| r.pass_index).collect();
    assert_eq!(passes, [0, 1]);
}

#[tokio::test]
async fn relative_references_follow_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "/blog/post.html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blog/post.html"))
        .respond_with(html(r#"<img src="cover.png"><img src="/img/root.jpg">"#))
        .mount(&server)
        .await;

    let url = target(&server, "/old");
    let mut acquirer = SingleFetchAcquirer::new(client(), url.clone());
    let result = run_extraction(&url, &mut acquirer, PathPatternSet::Conservative)
        .await
        .unwrap();

    let urls: Vec<_> = result.records.iter().map(|r| r.url.clone()).collect();
    assert_eq!(
        urls,
        [
            format!("{}/blog/cover.png", server.uri()),
            format!("{}/img/root.jpg", server.uri()),
        ]
    );
}
