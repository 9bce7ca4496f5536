//! HTTP content fetching against a mock server

use std::time::Duration;

use page_watch::fetch::{ContentFetcher, FetchError, HttpContentFetcher};

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Pricing</title><script>track()</script></head>
<body>
  <header>Acme</header>
  <nav role="navigation"><a href="/">Home</a></nav>
  <main>
    <h1>Plans</h1>
    <ul><li>Basic &amp; Free</li><li>Pro $12</li></ul>
  </main>
  <form role="search"><input name="q"></form>
  <footer>Contact</footer>
</body>
</html>"#;

#[tokio::test]
async fn test_fetch_extracts_text_and_keeps_markup() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/pricing")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(PAGE)
        .create_async()
        .await;

    let fetcher = HttpContentFetcher::new().unwrap();
    let content = fetcher
        .fetch(&format!("{}/pricing", server.url()))
        .await
        .unwrap();

    assert_eq!(content.text, "Plans Basic & Free Pro $12");
    assert_eq!(content.markup, PAGE);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status_is_fetch_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/gone")
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;

    let fetcher = HttpContentFetcher::with_timeout(Duration::from_secs(5)).unwrap();
    let err = fetcher
        .fetch(&format!("{}/gone", server.url()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_unreachable_host_is_request_error() {
    let fetcher = HttpContentFetcher::with_timeout(Duration::from_secs(2)).unwrap();
    let err = fetcher.fetch("http://127.0.0.1:1/").await.unwrap_err();
    assert!(matches!(err, FetchError::Request { .. }));
}
