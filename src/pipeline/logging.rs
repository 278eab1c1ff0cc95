//! HTTP interception stage.
//!
//! # Responsibilities
//! - Log a summary, the header block, and the body of every request before
//!   it is sent
//! - Log the same for the response after it returns
//! - Leave the call outcome untouched: bodies are buffered and restored
//!   byte-identically, inner errors are returned as the same object
//!
//! # Event Order (per call)
//! ```text
//! Information  Sending request
//! Debug        request header block
//! Debug        request body            (only when non-empty)
//!     <inner call>
//! Information  Received response       (or Error: Request failed)
//! Debug        response header block
//! Debug        response body           (only when non-empty)
//! ```
//!
//! # Design Decisions
//! - Each group is emitted under an emission lock after its body has been
//!   read, so a group is contiguous in every destination and the lock is never
//!   held across an await
//! - The lock belongs to the layer and is shared by every service it builds;
//!   pipelines that log to the same destinations share one lock through
//!   `LoggingLayer::with_emission_lock`
//! - Bodies are restored with their trailers
//! - Every event carries a `call_id` field for correlating request and
//!   response groups of concurrent calls

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Instant;

use hyper::{Request, Response};
use tower::{BoxError, Layer, Service};
use uuid::Uuid;

use crate::observability::metrics;
use crate::pipeline::body::{self, Body, FailedBody};
use crate::pipeline::render;
use crate::pipeline::{call_boxed, ResponseFuture};

/// Serializes event groups across concurrent calls.
pub type EmissionLock = Arc<Mutex<()>>;

fn emission_guard(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wraps a service with request/response logging.
#[derive(Debug, Clone)]
pub struct LoggingLayer {
    max_body_bytes: usize,
    emission: EmissionLock,
}

impl LoggingLayer {
    /// `max_body_bytes` bounds how much of each body is logged; the body
    /// forwarded downstream is never truncated.
    pub fn new(max_body_bytes: usize) -> Self {
        Self {
            max_body_bytes,
            emission: EmissionLock::default(),
        }
    }

    /// Share `lock` with other layers logging to the same destinations.
    pub fn with_emission_lock(mut self, lock: EmissionLock) -> Self {
        self.emission = lock;
        self
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingService {
            inner,
            max_body_bytes: self.max_body_bytes,
            emission: self.emission.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingService<S> {
    inner: S,
    max_body_bytes: usize,
    emission: EmissionLock,
}

impl<S> Service<Request<Body>> for LoggingService<S>
where
    S: Service<Request<Body>, Response = Response<Body>, Error = BoxError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = ResponseFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // The clone is not driven to readiness; keep the ready one for this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let limit = self.max_body_bytes;
        let emission = self.emission.clone();

        Box::pin(async move {
            let call_id = Uuid::new_v4();
            let start = Instant::now();

            // 1. Buffer the request body so it can be logged and restored
            let (parts, request_body) = request.into_parts();
            let (request_bytes, request_trailers) =
                match body::collect_with_trailers(request_body).await {
                    Ok(collected) => collected,
                    Err(e) => {
                        tracing::error!(call_id = %call_id, error = %e, "Failed to read request body");
                        return Err(e);
                    }
                };

            // 2. Request group
            {
                let _emission = emission_guard(&emission);
                tracing::info!(
                    call_id = %call_id,
                    method = %parts.method,
                    uri = %parts.uri,
                    "Sending request"
                );
                tracing::debug!(
                    call_id = %call_id,
                    "{}",
                    render::request_block(&parts.method, &parts.uri, parts.version, &parts.headers)
                );
                if !request_bytes.is_empty() {
                    tracing::debug!(call_id = %call_id, "{}", render::body_text(&request_bytes, limit));
                }
            }

            // 3. Inner call
            let request = Request::from_parts(parts, body::restore(request_bytes, request_trailers));
            let response = match call_boxed(&mut inner, request).await {
                Ok(response) => response,
                Err(e) => {
                    let _emission = emission_guard(&emission);
                    tracing::error!(
                        call_id = %call_id,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        error = %e,
                        "Request failed"
                    );
                    metrics::record_http_call("transport_error");
                    return Err(e);
                }
            };

            // 4. Buffer the response body
            let (parts, response_body) = response.into_parts();
            let status = parts.status;
            metrics::record_http_call(metrics::status_class(status.as_u16()));

            let (response_bytes, response_trailers) =
                match body::collect_with_trailers(response_body).await {
                    Ok(collected) => collected,
                    Err(e) => {
                        // The connection is already drained; surface the read error
                        // through the body the caller receives.
                        let _emission = emission_guard(&emission);
                        tracing::error!(
                            call_id = %call_id,
                            status = status.as_u16(),
                            error = %e,
                            "Failed to read response body"
                        );
                        return Ok(Response::from_parts(parts, FailedBody::new(e).into_body()));
                    }
                };

            // 5. Response group
            {
                let _emission = emission_guard(&emission);
                tracing::info!(
                    call_id = %call_id,
                    status = status.as_u16(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Received response"
                );
                tracing::debug!(
                    call_id = %call_id,
                    "{}",
                    render::response_block(status, parts.version, &parts.headers)
                );
                if !response_bytes.is_empty() {
                    tracing::debug!(call_id = %call_id, "{}", render::body_text(&response_bytes, limit));
                }
            }

            Ok(Response::from_parts(parts, body::restore(response_bytes, response_trailers)))
        })
    }
}
