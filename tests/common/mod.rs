//! In-process HTTP backend for integration tests.
//!
//! Serves canned responses per `(method, path)` and records every request it
//! receives. One request per connection; responses always close.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct MockRoute {
    pub method: &'static str,
    pub path: &'static str,
    pub status: u16,
    pub content_type: &'static str,
    /// More than one chunk means the body is streamed without a length,
    /// one write per chunk.
    pub chunks: Vec<Vec<u8>>,
}

impl MockRoute {
    pub fn json(method: &'static str, path: &'static str, status: u16, body: &str) -> Self {
        Self {
            method,
            path,
            status,
            content_type: "application/json",
            chunks: vec![body.as_bytes().to_vec()],
        }
    }

    pub fn text(path: &'static str, status: u16, body: &str) -> Self {
        Self {
            method: "GET",
            path,
            status,
            content_type: "text/plain; charset=utf-8",
            chunks: vec![body.as_bytes().to_vec()],
        }
    }

    pub fn event_stream(path: &'static str, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            method: "POST",
            path,
            status: 200,
            content_type: "text/event-stream",
            chunks,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct MockBackend {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub async fn start(routes: Vec<MockRoute>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let _ = handle(stream, &routes, &recorded).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock").clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

async fn handle(
    mut stream: TcpStream,
    routes: &[MockRoute],
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];

    let (head_len, method, path, headers) = loop {
        let n = stream.read(&mut tmp).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&tmp[..n]);

        let mut header_slots = [httparse::EMPTY_HEADER; 64];
        let mut req = httparse::Request::new(&mut header_slots);
        if let Ok(httparse::Status::Complete(len)) = req.parse(&buf) {
            let method = req.method.unwrap_or_default().to_string();
            let path = req.path.unwrap_or_default().to_string();
            let headers: Vec<(String, String)> = req
                .headers
                .iter()
                .map(|h| {
                    (
                        h.name.to_string(),
                        String::from_utf8_lossy(h.value).into_owned(),
                    )
                })
                .collect();
            break (len, method, path, headers);
        }
    };

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < head_len + content_length {
        let n = stream.read(&mut tmp).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
    let body_end = buf.len().min(head_len + content_length);
    let body = buf[head_len..body_end].to_vec();

    let route = routes
        .iter()
        .find(|r| r.method == method && r.path == path)
        .cloned();
    recorded.lock().expect("lock").push(RecordedRequest {
        method,
        path,
        headers,
        body,
    });

    let Some(route) = route else {
        let resp = "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nNot Found";
        stream.write_all(resp.as_bytes()).await?;
        return stream.shutdown().await;
    };

    if route.chunks.len() == 1 {
        let head = format!(
            "HTTP/1.1 {} Mock\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            route.status,
            route.content_type,
            route.chunks[0].len()
        );
        stream.write_all(head.as_bytes()).await?;
        stream.write_all(&route.chunks[0]).await?;
    } else {
        let head = format!(
            "HTTP/1.1 {} Mock\r\nContent-Type: {}\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n",
            route.status, route.content_type
        );
        stream.write_all(head.as_bytes()).await?;
        stream.flush().await?;
        for chunk in &route.chunks {
            stream.write_all(chunk).await?;
            stream.flush().await?;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
    stream.shutdown().await
}

/// One `data:` frame carrying `content` as its delta.
pub fn sse_frame(content: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({"choices":[{"index":0,"delta":{"content":content},"finish_reason":null}]})
    )
}
