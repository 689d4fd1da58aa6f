use doclink_resolver::{DefaultResolver, Resolution, ResolveError, ResolverConfig, StrategyKind};
use httpmock::prelude::*;
use std::time::Duration;

const SOURCE_URL: &str = "https://www.scribd.com/document/123/Test-Doc";

fn config_for(server: &MockServer, strategies: Vec<StrategyKind>) -> ResolverConfig {
    let mut config = ResolverConfig::default();
    config.mirror.base_url = server.url("/docgeneratev2");
    config.mirror.file_base_url = "https://files.example.com/".to_string();
    config.strategies = strategies;
    config.http.request_timeout_secs = 5;
    config.overall_timeout_secs = 10;
    config
}

#[tokio::test]
async fn test_redirect_chain_to_viewer() {
    let server = MockServer::start_async().await;

    let mirror_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/docgeneratev2")
                .query_param("fileurl", "https://files.example.com/123%2FTest-Doc")
                .query_param("title", "<div><p>Test Doc</p></div>")
                .query_param("utm_source", "scrfree");
            then.status(302).header("Location", "/queue/abc");
        })
        .await;
    let queue_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/queue/abc");
            then.status(302).header(
                "Location",
                "/viewer/web/viewer.html?file=https%3A%2F%2Fcdn.example.com%2Fdocs%2F123.pdf",
            );
        })
        .await;

    let resolver =
        DefaultResolver::from_config(&config_for(&server, vec![StrategyKind::Redirect])).unwrap();
    let resolution = resolver.resolve(SOURCE_URL).await.unwrap();

    mirror_mock.assert_async().await;
    queue_mock.assert_async().await;
    assert_eq!(resolution.download_link, "https://cdn.example.com/docs/123.pdf");
    assert_eq!(resolution.strategy, "redirect");
    assert_eq!(resolution.doc_id, "123");
}

#[tokio::test]
async fn test_redirect_chain_ending_in_binary_file() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docgeneratev2");
            then.status(302).header("Location", "/files/123.pdf");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/files/123.pdf");
            then.status(200)
                .header("Content-Type", "application/pdf")
                .body("%PDF-1.7");
        })
        .await;

    let resolver =
        DefaultResolver::from_config(&config_for(&server, vec![StrategyKind::Redirect])).unwrap();
    let resolution = resolver.resolve(SOURCE_URL).await.unwrap();

    assert_eq!(resolution.download_link, server.url("/files/123.pdf"));
}

#[tokio::test]
async fn test_redirect_loop_is_bounded() {
    let server = MockServer::start_async().await;

    let loop_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/docgeneratev2");
            then.status(302).header("Location", "/docgeneratev2?again=1");
        })
        .await;

    let mut config = config_for(&server, vec![StrategyKind::Redirect]);
    config.http.max_redirects = 2;
    let resolver = DefaultResolver::from_config(&config).unwrap();
    let err = resolver.resolve(SOURCE_URL).await.unwrap_err();

    loop_mock.assert_hits_async(3).await;
    match err {
        ResolveError::AllStrategiesFailed { last, .. } => {
            assert!(matches!(*last, ResolveError::LinkNotDetected { .. }));
            assert!(last.to_string().contains("more than 2 redirects"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_html_scrape_finds_viewer_iframe() {
    let server = MockServer::start_async().await;

    let page = r#"<!doctype html>
<html><head><title>Generating...</title></head>
<body>
  <div class="wrap">
    <iframe src="/viewer/web/viewer.html?file=https%253A%252F%252Fcdn.example.com%252Fdocs%252F123.pdf&amp;zoom=auto"></iframe>
  </div>
</body></html>"#;

    let mirror_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/docgeneratev2");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body(page);
        })
        .await;

    let resolver =
        DefaultResolver::from_config(&config_for(&server, vec![StrategyKind::Html])).unwrap();
    let resolution = resolver.resolve(SOURCE_URL).await.unwrap();

    mirror_mock.assert_async().await;
    assert_eq!(resolution.download_link, "https://cdn.example.com/docs/123.pdf");
    assert_eq!(resolution.strategy, "html");
}

async fn scrape_mirror_page(server: &MockServer, page: &str) -> Resolution {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/docgeneratev2");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body(page);
        })
        .await;

    let resolver =
        DefaultResolver::from_config(&config_for(server, vec![StrategyKind::Html])).unwrap();
    resolver.resolve(SOURCE_URL).await.unwrap()
}

#[tokio::test]
async fn test_html_follows_redirect_to_binary_file() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docgeneratev2");
            then.status(302).header("Location", "/files/123.pdf");
        })
        .await;
    let file_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/files/123.pdf");
            then.status(200)
                .header("Content-Type", "application/pdf")
                .body("%PDF-1.7");
        })
        .await;

    let resolver =
        DefaultResolver::from_config(&config_for(&server, vec![StrategyKind::Html])).unwrap();
    let resolution = resolver.resolve(SOURCE_URL).await.unwrap();

    file_mock.assert_async().await;
    assert_eq!(resolution.strategy, "html");
    assert_eq!(resolution.download_link, server.url("/files/123.pdf"));
}

#[tokio::test]
async fn test_html_matches_viewer_on_final_url() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docgeneratev2");
            then.status(302).header(
                "Location",
                "/viewer/web/viewer.html?file=https%3A%2F%2Fcdn.example.com%2Fdocs%2F123.pdf",
            );
        })
        .await;
    // 檢視器頁面本身沒有任何連結，只能從最終網址取得
    let viewer_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/viewer/web/viewer.html");
            then.status(200)
                .header("Content-Type", "text/html")
                .body("<html><body><div id=\"viewer\"></div></body></html>");
        })
        .await;

    let resolver =
        DefaultResolver::from_config(&config_for(&server, vec![StrategyKind::Html])).unwrap();
    let resolution = resolver.resolve(SOURCE_URL).await.unwrap();

    viewer_mock.assert_async().await;
    assert_eq!(resolution.download_link, "https://cdn.example.com/docs/123.pdf");
}

#[tokio::test]
async fn test_html_attribute_beats_script_and_bare_url() {
    let server = MockServer::start_async().await;
    let page = r#"<html><body>
  <p>Mirror: https://m.example.com/viewer/web/viewer.html?file=%2Fbare.pdf</p>
  <script>location.assign("/viewer/web/viewer.html?file=%2Fscript.pdf");</script>
  <a class="open" href="/viewer/web/viewer.html?file=%2Fattr.pdf">Open</a>
</body></html>"#;

    let resolution = scrape_mirror_page(&server, page).await;

    assert_eq!(resolution.download_link, server.url("/attr.pdf"));
}

#[tokio::test]
async fn test_html_script_navigation_beats_bare_url() {
    let server = MockServer::start_async().await;
    let page = r#"<html><body>
  <p>Mirror: https://m.example.com/viewer/web/viewer.html?file=%2Fbare.pdf</p>
  <script>location.assign("/viewer/web/viewer.html?file=%2Fscript.pdf");</script>
</body></html>"#;

    let resolution = scrape_mirror_page(&server, page).await;

    assert_eq!(resolution.download_link, server.url("/script.pdf"));
}

#[tokio::test]
async fn test_html_bare_viewer_url_in_text() {
    let server = MockServer::start_async().await;
    let page = r#"<html><body>
  <p>Mirror: https://m.example.com/viewer/web/viewer.html?file=%2Fbare.pdf</p>
</body></html>"#;

    let resolution = scrape_mirror_page(&server, page).await;

    assert_eq!(resolution.download_link, "https://m.example.com/bare.pdf");
}

#[tokio::test]
async fn test_html_form_action() {
    let server = MockServer::start_async().await;
    let page = r#"<form method="get" action="/viewer/web/viewer.html?file=%2Fform.pdf">
  <button type="submit">Download</button>
</form>"#;

    let resolution = scrape_mirror_page(&server, page).await;

    assert_eq!(resolution.download_link, server.url("/form.pdf"));
}

#[tokio::test]
async fn test_html_lazy_iframe_data_src() {
    let server = MockServer::start_async().await;
    let page = r#"<iframe class="lazy" data-src="/viewer/web/viewer.html?file=https%3A%2F%2Fcdn.example.com%2Flazy.pdf"></iframe>"#;

    let resolution = scrape_mirror_page(&server, page).await;

    assert_eq!(resolution.download_link, "https://cdn.example.com/lazy.pdf");
}

#[tokio::test]
async fn test_fallback_from_redirect_to_html() {
    let server = MockServer::start_async().await;

    let page = r#"<html><body><script>
        window.location.href = "/viewer/web/viewer.html?file=%2Fstorage%2F123.pdf";
    </script></body></html>"#;

    let mirror_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/docgeneratev2");
            then.status(200).header("Content-Type", "text/html").body(page);
        })
        .await;

    let resolver = DefaultResolver::from_config(&config_for(
        &server,
        vec![StrategyKind::Redirect, StrategyKind::Html],
    ))
    .unwrap();
    let resolution = resolver.resolve(SOURCE_URL).await.unwrap();

    // redirect 策略先取一次，html 策略再取一次
    mirror_mock.assert_hits_async(2).await;
    assert_eq!(resolution.strategy, "html");
    assert_eq!(resolution.download_link, server.url("/storage/123.pdf"));
}

#[tokio::test]
async fn test_upstream_failure_reports_bad_gateway() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docgeneratev2");
            then.status(503).body("maintenance");
        })
        .await;

    let resolver = DefaultResolver::from_config(&config_for(
        &server,
        vec![StrategyKind::Redirect, StrategyKind::Html],
    ))
    .unwrap();
    let err = resolver.resolve(SOURCE_URL).await.unwrap_err();

    match &err {
        ResolveError::AllStrategiesFailed { attempts, last } => {
            assert_eq!(attempts.len(), 2);
            assert!(matches!(
                **last,
                ResolveError::UpstreamStatus { status: 503, .. }
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.status_code(), 502);
}

#[tokio::test]
async fn test_slow_mirror_maps_to_gateway_timeout() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/docgeneratev2");
            then.status(200).delay(Duration::from_secs(3)).body("late");
        })
        .await;

    let mut config = config_for(&server, vec![StrategyKind::Redirect]);
    config.http.request_timeout_secs = 1;
    let resolver = DefaultResolver::from_config(&config).unwrap();
    let err = resolver.resolve(SOURCE_URL).await.unwrap_err();

    assert_eq!(err.status_code(), 504);
}

#[test]
fn test_mirror_link_only() {
    let resolver = DefaultResolver::from_config(&ResolverConfig::default()).unwrap();
    let (document, mirror_url) = resolver
        .mirror_link("https://es.scribd.com/doc/456/Guia-Rapida")
        .unwrap();

    assert_eq!(document.doc_id, "456");
    assert_eq!(document.title, "Guia Rapida");
    assert!(mirror_url
        .as_str()
        .starts_with("https://ilide.info/docgeneratev2?fileurl="));
    assert!(mirror_url.as_str().contains("456%252FGuia-Rapida"));
}
