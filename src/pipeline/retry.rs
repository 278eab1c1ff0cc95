//! Retry stage.
//!
//! # Responsibilities
//! - Determine if a request is retryable (idempotent methods only)
//! - Execute retries with exponential backoff + jitter, or `Retry-After`
//! - Drain discarded responses so their connections are released
//!
//! # Design Decisions
//! - Never retry POST/PUT/DELETE/PATCH (non-idempotent)
//! - Retries 429, 503 and 504 responses and connection-level failures
//! - Retried requests carry a `retry-attempt` header

use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use hyper::{Method, Request, Response, StatusCode, Uri, Version};
use rand::Rng;
use tower::{BoxError, Layer, Service, ServiceExt};

use crate::config::RetryConfig;
use crate::pipeline::body::{self, Body};
use crate::pipeline::{call_boxed, ResponseFuture};

/// Upper bound honoured for server-provided `Retry-After`.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(180);

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

fn is_idempotent(method: &Method) -> bool {
    *method == Method::GET
        || *method == Method::HEAD
        || *method == Method::OPTIONS
        || *method == Method::TRACE
}

/// Whether an attempt that ended with `status` (or a connection failure)
/// may be repeated.
pub fn is_retryable(method: &Method, status: Option<StatusCode>, connection_error: bool) -> bool {
    if !is_idempotent(method) {
        return false;
    }
    if connection_error {
        return true;
    }
    matches!(
        status,
        Some(s) if s == StatusCode::TOO_MANY_REQUESTS
            || s == StatusCode::SERVICE_UNAVAILABLE
            || s == StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_connection_error(error: &BoxError) -> bool {
    if let Some(e) = error.downcast_ref::<reqwest::Error>() {
        return e.is_connect() || e.is_timeout();
    }
    error.is::<tower::timeout::error::Elapsed>()
}

/// Delay requested by the server, in seconds or as an HTTP date.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    let delay = match value.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => {
            let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
            (at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
        }
    };
    Some(delay.min(MAX_RETRY_AFTER))
}

/// Parts of a buffered request needed to send it again.
struct Replay {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    payload: Bytes,
}

fn rebuild(replay: &Replay, attempt: u32) -> Result<Request<Body>, BoxError> {
    let mut builder = Request::builder()
        .method(replay.method.clone())
        .uri(replay.uri.clone())
        .version(replay.version);

    if let Some(headers) = builder.headers_mut() {
        headers.extend(replay.headers.clone());
        if attempt > 1 {
            headers.insert(
                HeaderName::from_static("retry-attempt"),
                HeaderValue::from(attempt - 1),
            );
        }
    }
    Ok(builder.body(body::full(replay.payload.clone()))?)
}

#[derive(Debug, Clone)]
pub struct RetryLayer {
    config: RetryConfig,
}

impl RetryLayer {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService {
            inner,
            config: self.config.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryService<S> {
    inner: S,
    config: RetryConfig,
}

impl<S> Service<Request<Body>> for RetryService<S>
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
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = self.config.clone();

        Box::pin(async move {
            if !config.enabled || config.max_attempts <= 1 || !is_idempotent(request.method()) {
                return call_boxed(&mut inner, request).await;
            }

            let (parts, request_body) = request.into_parts();
            let replay = Replay {
                payload: body::collect(request_body).await?,
                method: parts.method,
                uri: parts.uri,
                version: parts.version,
                headers: parts.headers,
            };

            let mut attempt = 1;
            loop {
                let request = rebuild(&replay, attempt)?;
                let result = call_boxed(inner.ready().await?, request).await;

                let retryable = match &result {
                    Ok(response) => is_retryable(&replay.method, Some(response.status()), false),
                    Err(e) => is_retryable(&replay.method, None, is_connection_error(e)),
                };
                if !retryable || attempt >= config.max_attempts {
                    return result;
                }

                let backoff = || calculate_backoff(attempt, config.base_delay_ms, config.max_delay_ms);
                let delay = match result {
                    Ok(response) => {
                        let delay = retry_after(response.headers()).unwrap_or_else(backoff);
                        tracing::info!(
                            attempt,
                            status = response.status().as_u16(),
                            delay_ms = delay.as_millis() as u64,
                            "Retrying request"
                        );
                        // Drain the discarded response to free its connection.
                        let _ = body::collect(response.into_body()).await;
                        delay
                    }
                    Err(e) => {
                        let delay = backoff();
                        tracing::info!(
                            attempt,
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            "Retrying after connection error"
                        );
                        delay
                    }
                };

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        })
    }
}
