//! End-to-end tests: client → proxy → mock upstream → proxy → client.

use std::time::Duration;

use axum::http::StatusCode;
use tokio::net::TcpListener;

mod common;

use common::{
    client, config_for, start_mock_upstream, start_mock_upstream_with, start_proxy, MockResponse,
};

#[tokio::test]
async fn test_html_is_decorated() {
    let page = "<!DOCTYPE html><html><head><title>Habr widget</title></head><body>\
                <p>The widget gizmos are great.</p>\
                <script>var widget = 1;</script>\
                <a href=\"https://other.example/\">elsewhere</a>\
                </body></html>";
    let (upstream_addr, mut requests) = start_mock_upstream(
        MockResponse::ok("text/html; charset=utf-8", page).header("X-Upstream", "yes"),
    )
    .await;
    let (proxy_addr, shutdown) = start_proxy(config_for(upstream_addr)).await;

    let res = client()
        .get(format!("http://{proxy_addr}/post/42?page=2"))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("x-upstream").unwrap(), "yes");
    assert!(res.headers().get("x-request-id").is_some());
    let body = res.text().await.unwrap();

    assert!(body.starts_with("<!DOCTYPE html><html><head><title>Habr widget</title>"), "{body}");
    assert!(body.contains("<p>The widget™ gizmos™ are great.</p>"), "{body}");
    assert!(body.contains("<script>var widget = 1;</script>"), "{body}");
    assert!(body.contains("<a href=\"https://other.example/\">elsewhere</a>"), "{body}");

    let head = requests.recv().await.unwrap();
    assert!(head.starts_with("GET /post/42?page=2 HTTP/1.1\r\n"), "{head}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_links_point_back_at_proxy() {
    let (upstream_addr, mut requests) = start_mock_upstream_with(|addr| {
        let page = format!(
            "<html><body><a href=\"http://{addr}/post/43\">next</a>\
             <svg><use xlink:href=\"http://{addr}/img/sprite.svg#logo\"></use></svg>\
             </body></html>"
        );
        MockResponse::ok("text/html", page)
    })
    .await;
    let (proxy_addr, shutdown) = start_proxy(config_for(upstream_addr)).await;

    let res = client()
        .get(format!("http://{proxy_addr}/post/42"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.text().await.unwrap();

    assert!(body.contains(&format!("<a href=\"http://{proxy_addr}/post/43\">")), "{body}");
    assert!(
        body.contains(&format!("xlink:href=\"http://{proxy_addr}/img/sprite.svg#logo\"")),
        "{body}"
    );
    assert!(!body.contains(&upstream_addr.to_string()), "{body}");

    let head = requests.recv().await.unwrap();
    assert!(head.starts_with("GET /post/42 HTTP/1.1\r\n"), "{head}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_windows_1251_page_keeps_its_encoding() {
    let (page, _, _) = encoding_rs::WINDOWS_1251.encode("<p>Привет, читатель Хабра</p>");
    let (upstream_addr, _requests) = start_mock_upstream(MockResponse::ok(
        "text/html; charset=windows-1251",
        page.into_owned(),
    ))
    .await;
    let (proxy_addr, shutdown) = start_proxy(config_for(upstream_addr)).await;

    let res = client()
        .get(format!("http://{proxy_addr}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "text/html; charset=windows-1251"
    );
    let bytes = res.bytes().await.unwrap();
    let (text, _, had_errors) = encoding_rs::WINDOWS_1251.decode(&bytes);

    // ™ exists in windows-1251 (0x99), so it survives the round trip.
    assert!(!had_errors);
    assert!(text.contains("<p>Привет™, читатель Хабра</p>"), "{text}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_json_passes_through_unchanged() {
    let json = br#"{"title":"widget gizmos","url":"http://127.0.0.1/x"}"#.to_vec();
    let (upstream_addr, _requests) =
        start_mock_upstream(MockResponse::ok("application/json", json.clone())).await;
    let (proxy_addr, shutdown) = start_proxy(config_for(upstream_addr)).await;

    let res = client()
        .get(format!("http://{proxy_addr}/api/v2/articles"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("content-type").unwrap(), "application/json");
    assert_eq!(res.bytes().await.unwrap().to_vec(), json);

    shutdown.trigger();
}

#[tokio::test]
async fn test_compressed_upstream_body_is_decoded() {
    let compressed = include_bytes!("fixtures/widget_page.html.zst").to_vec();
    let (upstream_addr, mut requests) = start_mock_upstream(
        MockResponse::ok("text/html; charset=utf-8", compressed).header("Content-Encoding", "zstd"),
    )
    .await;
    let (proxy_addr, shutdown) = start_proxy(config_for(upstream_addr)).await;

    let res = client()
        .get(format!("http://{proxy_addr}/"))
        .header("Accept-Encoding", "gzip, deflate, br, zstd, compress")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("content-encoding").is_none());
    let body = res.text().await.unwrap();
    assert!(body.contains("<p>The widget™ gizmos™ are great.</p>"), "{body}");

    // The upstream is only offered codings the proxy can decode.
    let head = requests.recv().await.unwrap().to_ascii_lowercase();
    assert!(head.contains("accept-encoding: "), "{head}");
    assert!(!head.contains("compress\r\n"), "{head}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_missing_content_type_passes_through() {
    let bytes = vec![0x89, b'P', b'N', b'G', 0xff, 0x00, 0xfe];
    let (upstream_addr, _requests) = start_mock_upstream(MockResponse {
        status_line: "200 OK",
        headers: vec![],
        body: bytes.clone(),
    })
    .await;
    let (proxy_addr, shutdown) = start_proxy(config_for(upstream_addr)).await;

    let res = client()
        .get(format!("http://{proxy_addr}/logo.png"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.bytes().await.unwrap().to_vec(), bytes);

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_headers_cookies_and_body_are_forwarded() {
    let (upstream_addr, mut requests) =
        start_mock_upstream(MockResponse::ok("text/plain", "ok")).await;
    let (proxy_addr, shutdown) = start_proxy(config_for(upstream_addr)).await;

    let res = client()
        .post(format!("http://{proxy_addr}/comments/new"))
        .header("X-Custom", "42")
        .header("Cookie", "hl=ru; fl=ru")
        .body("text=hello")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let head = requests.recv().await.unwrap();
    let lower = head.to_ascii_lowercase();
    assert!(head.starts_with("POST /comments/new HTTP/1.1\r\n"), "{head}");
    assert!(lower.contains("x-custom: 42\r\n"), "{head}");
    assert!(lower.contains("cookie: hl=ru; fl=ru\r\n"), "{head}");
    assert!(lower.contains(&format!("host: {upstream_addr}\r\n")), "{head}");
    assert!(!lower.contains(&format!("host: {proxy_addr}\r\n")), "{head}");
    assert!(head.ends_with("text=hello"), "{head}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_status_copied_and_response_headers_filtered() {
    let (upstream_addr, _requests) = start_mock_upstream(MockResponse {
        status_line: "404 Not Found",
        headers: vec![
            ("Content-Type", "text/plain".to_string()),
            ("Content-Encoding", "identity".to_string()),
            ("X-Frame-Options", "DENY".to_string()),
        ],
        body: b"missing".to_vec(),
    })
    .await;
    let (proxy_addr, shutdown) = start_proxy(config_for(upstream_addr)).await;

    let res = client()
        .get(format!("http://{proxy_addr}/nope"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.headers().get("content-encoding").is_none());
    assert_eq!(res.headers().get("x-frame-options").unwrap(), "DENY");
    assert_eq!(res.headers().get("content-length").unwrap(), "7");
    assert_eq!(res.text().await.unwrap(), "missing");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_returns_bad_gateway() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);

    let (proxy_addr, shutdown) = start_proxy(config_for(dead_addr)).await;

    let res = client()
        .get(format!("http://{proxy_addr}/post/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_upstream_returns_gateway_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let slow_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            // Accept and never answer.
            held.push(socket);
        }
    });

    let mut config = config_for(slow_addr);
    config.upstream.timeout_secs = 1;
    let (proxy_addr, shutdown) = start_proxy(config).await;

    let res = tokio::time::timeout(
        Duration::from_secs(10),
        client().get(format!("http://{proxy_addr}/post/1")).send(),
    )
    .await
    .expect("proxy should answer before the client gives up")
    .unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let (upstream_addr, mut requests) =
        start_mock_upstream(MockResponse::ok("text/plain", "ok")).await;
    let (proxy_addr, shutdown) = start_proxy(config_for(upstream_addr)).await;

    let res = client()
        .get(format!("http://{proxy_addr}/"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers().get("x-request-id").unwrap(), "trace-me");

    let head = requests.recv().await.unwrap().to_ascii_lowercase();
    assert!(head.contains("x-request-id: trace-me\r\n"), "{head}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_generated_request_id_stays_with_the_caller() {
    let (upstream_addr, mut requests) =
        start_mock_upstream(MockResponse::ok("text/plain", "ok")).await;
    let (proxy_addr, shutdown) = start_proxy(config_for(upstream_addr)).await;

    let res = client()
        .get(format!("http://{proxy_addr}/"))
        .send()
        .await
        .unwrap();
    assert!(res.headers().get("x-request-id").is_some());

    let head = requests.recv().await.unwrap().to_ascii_lowercase();
    assert!(!head.contains("x-request-id"), "{head}");

    shutdown.trigger();
}
