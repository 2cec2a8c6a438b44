//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use habraproxy::config::ProxyConfig;
use habraproxy::http::HttpServer;
use habraproxy::lifecycle::Shutdown;

/// A canned upstream response.
#[derive(Clone)]
pub struct MockResponse {
    pub status_line: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_line: "200 OK",
            headers: vec![("Content-Type", content_type.to_string())],
            body: body.into(),
        }
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

/// Start a mock upstream that answers every request with `response`.
///
/// Returns its address and a receiver yielding the head (request line and
/// headers) of every request it received.
pub async fn start_mock_upstream(
    response: MockResponse,
) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    start_mock_upstream_with(move |_| response).await
}

/// Like `start_mock_upstream`, but the response is built from the mock's
/// own address, for pages that link back to their origin.
pub async fn start_mock_upstream_with<F>(make: F) -> (SocketAddr, mpsc::UnboundedReceiver<String>)
where
    F: FnOnce(SocketAddr) -> MockResponse,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = make(addr);
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let response = response.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        serve_one(socket, response, tx).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, rx)
}

async fn serve_one(mut socket: TcpStream, response: MockResponse, tx: mpsc::UnboundedSender<String>) {
    let head = match read_head(&mut socket).await {
        Some(head) => head,
        None => return,
    };
    let _ = tx.send(head);

    let mut out = format!("HTTP/1.1 {}\r\n", response.status_line);
    for (name, value) in &response.headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        response.body.len()
    ));

    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(&response.body);
    let _ = socket.write_all(&bytes).await;
    let _ = socket.shutdown().await;
}

/// Read until the blank line ending the request head, draining any body
/// announced by `Content-Length`.
async fn read_head(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(format!("{head}{}", String::from_utf8_lossy(&body)))
}

/// Config pointing at a local upstream, with no environment proxies.
pub fn config_for(upstream: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.base_url = format!("http://{upstream}/");
    config.upstream.system_proxy = false;
    config.upstream.timeout_secs = 5;
    config
}

/// Start the proxy on an ephemeral port. Trigger the returned `Shutdown`
/// to stop it.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
