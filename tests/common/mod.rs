//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use hvac_proxy::config::ProxyConfig;
use hvac_proxy::telemetry::{MetricsSnapshot, Publisher};
use hvac_proxy::{HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub head: String,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

pub type Log = Arc<Mutex<Vec<Recorded>>>;

/// Start a mock upstream on an ephemeral port that answers every request
/// with `body` and records what it received.
pub async fn start_mock_upstream(body: &'static str) -> (SocketAddr, Log) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: Log = Arc::default();

    let recorded = Arc::clone(&log);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let recorded = Arc::clone(&recorded);
            tokio::spawn(async move {
                if let Some(request) = read_request(&mut socket).await {
                    recorded.lock().unwrap().push(request);
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, log)
}

async fn read_request(socket: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut recorded = Recorded {
        head,
        body: Vec::new(),
    };
    let length: usize = recorded
        .header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    while buf.len() < head_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    recorded.body = buf[head_end..].to_vec();
    Some(recorded)
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Baseline config: ephemeral listener, artifacts under `data_dir`.
pub fn test_config(data_dir: &Path, upstream: Option<SocketAddr>) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.storage.data_dir = data_dir.to_string_lossy().into_owned();
    config.upstream.authority = upstream.map(|a| a.to_string());
    config
}

/// Start the proxy and return its address plus the handle that stops it.
pub async fn spawn_proxy(config: ProxyConfig, publisher: Publisher) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let snapshot = Arc::new(MetricsSnapshot::new(&config.storage.data_dir));
    let server = HttpServer::new(config, snapshot, publisher);
    let shutdown = Shutdown::new();
    tokio::spawn(server.run(listener, shutdown.wait()));

    (addr, shutdown)
}

/// A client that never routes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
