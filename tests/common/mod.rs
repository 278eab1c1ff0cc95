//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::put;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request method and path (with query) and returns the
/// status code and body to send back.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some((method, path)) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(method, path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            403 => "403 Forbidden",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            504 => "504 Gateway Timeout",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read one request; returns its method and target, discarding the body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<(String, String)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let mut received = buf.len() - header_end;
    while received < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        received += n;
    }

    Some((method, path))
}

/// Address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// In-memory append-blob service speaking the REST subset `BlobStore` uses.
#[derive(Clone, Default)]
pub struct FakeBlobService {
    containers: Arc<Mutex<HashMap<String, HashMap<String, Vec<u8>>>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl FakeBlobService {
    /// Serve on an ephemeral port; returns the connection string to use.
    pub async fn start(&self) -> String {
        let router = Router::new()
            .route("/{container}", put(put_container))
            .route("/{container}/{blob}", put(put_blob))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("BlobEndpoint=http://{addr}/;SharedAccessSignature=sv=2021-12-02&sig=test")
    }

    pub fn blob(&self, container: &str, blob: &str) -> Option<Vec<u8>> {
        self.containers
            .lock()
            .unwrap()
            .get(container)
            .and_then(|blobs| blobs.get(blob))
            .cloned()
    }

    pub fn lines(&self, container: &str, blob: &str) -> Vec<String> {
        self.blob(container, blob)
            .map(|bytes| String::from_utf8(bytes).unwrap().lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

fn storage_error(status: StatusCode, code: &'static str) -> Response {
    (status, [("x-ms-error-code", code)]).into_response()
}

async fn put_container(
    State(state): State<FakeBlobService>,
    Path(container): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.queries.lock().unwrap().push(format!("{container}?{query:?}"));
    if query.get("restype").map(String::as_str) != Some("container") || !query.contains_key("sig") {
        return storage_error(StatusCode::BAD_REQUEST, "InvalidQueryParameterValue");
    }

    let mut containers = state.containers.lock().unwrap();
    if containers.contains_key(&container) {
        return storage_error(StatusCode::CONFLICT, "ContainerAlreadyExists");
    }
    containers.insert(container, HashMap::new());
    StatusCode::CREATED.into_response()
}

async fn put_blob(
    State(state): State<FakeBlobService>,
    Path((container, blob)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.queries.lock().unwrap().push(format!("{container}/{blob}?{query:?}"));
    if !query.contains_key("sig") {
        return storage_error(StatusCode::FORBIDDEN, "AuthenticationFailed");
    }

    let mut containers = state.containers.lock().unwrap();
    let Some(blobs) = containers.get_mut(&container) else {
        return storage_error(StatusCode::NOT_FOUND, "ContainerNotFound");
    };

    if query.get("comp").map(String::as_str) == Some("appendblock") {
        return match blobs.get_mut(&blob) {
            Some(content) => {
                content.extend_from_slice(&body);
                StatusCode::CREATED.into_response()
            }
            None => storage_error(StatusCode::NOT_FOUND, "BlobNotFound"),
        };
    }

    if headers.get("x-ms-blob-type").map(|v| v.as_bytes()) != Some(b"AppendBlob".as_slice()) {
        return storage_error(StatusCode::BAD_REQUEST, "InvalidHeaderValue");
    }
    let if_none_match = headers.get("if-none-match").map(|v| v.as_bytes()) == Some(b"*".as_slice());
    if blobs.contains_key(&blob) {
        if if_none_match {
            return storage_error(StatusCode::CONFLICT, "BlobAlreadyExists");
        }
        blobs.insert(blob, Vec::new());
        return StatusCode::CREATED.into_response();
    }
    blobs.insert(blob, Vec::new());
    StatusCode::CREATED.into_response()
}
