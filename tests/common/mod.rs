//! Shared utilities for integration testing: a scriptable local HTTP server
//! and a mock relay that hands each accepted WebSocket to the test.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use relay_tunnel::config::parse_config;
use relay_tunnel::TunnelConfig;

/// A request as seen by the mock local server.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Handle to a running mock local server.
pub struct LocalServer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl LocalServer {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Every request received so far, in arrival order.
    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

/// Start a local HTTP/1.1 server whose responses come from `f`.
pub async fn start_local_server<F, Fut>(f: F) -> LocalServer
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let counter = hits.clone();
    let log = seen.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let counter = counter.clone();
                    let log = log.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        counter.fetch_add(1, Ordering::SeqCst);
                        log.lock().unwrap().push(request.clone());

                        let (status, body) = f(request).await;
                        let response = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            reason(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    LocalServer { addr, hits, seen }
}

/// Start a local server that always answers with the same status and body.
pub async fn start_fixed_local_server(status: u16, body: &'static str) -> LocalServer {
    start_local_server(move |_| async move { (status, body.to_string()) }).await
}

/// A port with nothing listening on it.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

async fn read_request(socket: &mut TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Some(SeenRequest {
        method,
        path,
        headers,
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Mock relay: accepts WebSocket connections and hands them to the test.
pub struct MockRelay {
    pub addr: SocketAddr,
    connections: mpsc::UnboundedReceiver<RelayPeer>,
    accepted: Arc<AtomicUsize>,
}

impl MockRelay {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, connections) = mpsc::unbounded_channel();
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = accepted.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let Ok(ws) = tokio_tungstenite::accept_async(socket).await else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let peer = RelayPeer {
                    ws,
                    accepted_at: Instant::now(),
                };
                if tx.send(peer).is_err() {
                    break;
                }
            }
        });

        Self {
            addr,
            connections,
            accepted,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Number of WebSocket handshakes completed so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Wait for the next client connection.
    pub async fn next_peer(&mut self) -> RelayPeer {
        tokio::time::timeout(Duration::from_secs(10), self.connections.recv())
            .await
            .expect("timed out waiting for client connection")
            .expect("relay listener stopped")
    }

    /// Wait for a connection and complete the handshake with a `ready` reply.
    pub async fn accept_ready(&mut self) -> RelayPeer {
        let mut peer = self.next_peer().await;
        let hello = peer.recv_kind("ready").await;
        assert!(hello["token"].is_string());
        peer.send(serde_json::json!({"type": "ready"})).await;
        peer
    }
}

/// Relay side of one client connection.
pub struct RelayPeer {
    ws: WebSocketStream<TcpStream>,
    /// When the WebSocket handshake completed.
    pub accepted_at: Instant,
}

impl RelayPeer {
    pub async fn send(&mut self, frame: Value) {
        self.ws
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    pub async fn send_raw(&mut self, message: Message) {
        self.ws.send(message).await.unwrap();
    }

    /// Next text frame from the client, parsed as JSON. `None` once closed.
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(10), self.ws.next())
                .await
                .expect("timed out waiting for client frame")?;
            match message {
                Ok(Message::Text(text)) => return Some(serde_json::from_str(&text).unwrap()),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    /// Next frame of the given type, skipping heartbeats and anything else.
    pub async fn recv_kind(&mut self, kind: &str) -> Value {
        loop {
            let frame = self
                .recv()
                .await
                .unwrap_or_else(|| panic!("connection closed while waiting for '{kind}'"));
            if frame["type"] == kind {
                return frame;
            }
        }
    }

    /// Drop the connection without a close handshake.
    pub fn kill(self) {
        drop(self.ws);
    }
}

/// Configuration pointing at a mock relay and a local server port.
///
/// `drain_grace_secs` is 1.
pub fn tunnel_config(relay_url: &str, local_port: u16, allowed_paths: &[&str]) -> TunnelConfig {
    let patterns = allowed_paths
        .iter()
        .map(|p| format!("'{}'", p))
        .collect::<Vec<_>>()
        .join(", ");

    parse_config(&format!(
        r#"
        username = "alice"
        token = "s3cret"
        server = "tunnel.example.com"

        [local]
        port = {local_port}
        allowed_paths = [{patterns}]
        request_timeout_secs = 5

        [session]
        connect_timeout_secs = 2
        drain_grace_secs = 1
        relay_url = "{relay_url}"
        "#
    ))
    .unwrap()
}
