//! Declared client pipeline.
//!
//! # Responsibilities
//! - Hold the ordered list of named stages, outermost first
//! - Build the stages directly around a terminal transport
//!
//! # Design Decisions
//! - The pipeline is constructed from its declaration; there is no default
//!   list to search and edit
//! - Logging is innermost by default so every retry attempt is observed with
//!   the headers actually sent

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use hyper::header::{HeaderName, HeaderValue};
use hyper::{Request, Response};
use thiserror::Error;
use tower::timeout::TimeoutLayer;
use tower::util::BoxCloneService;
use tower::{BoxError, Layer, Service};
use tower_http::set_header::SetRequestHeaderLayer;

use crate::auth::TokenProvider;
use crate::config::RetryConfig;
use crate::pipeline::auth::AuthorizationLayer;
use crate::pipeline::body::Body;
use crate::pipeline::logging::{EmissionLock, LoggingLayer};
use crate::pipeline::retry::RetryLayer;

/// A fully assembled client pipeline.
pub type HttpService = BoxCloneService<Request<Body>, Response<Body>, BoxError>;

/// Value of the `sdkversion` header.
pub const SDK_VERSION: &str = concat!("wiretrail/", env!("CARGO_PKG_VERSION"));

const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Named pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Authorization,
    Retry,
    Timeout,
    SdkHeader,
    Logging,
}

impl Stage {
    /// Default declaration, outermost first.
    pub const DEFAULT: [Stage; 5] = [
        Stage::Authorization,
        Stage::Retry,
        Stage::Timeout,
        Stage::SdkHeader,
        Stage::Logging,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Authorization => "authorization",
            Stage::Retry => "retry",
            Stage::Timeout => "timeout",
            Stage::SdkHeader => "sdk-header",
            Stage::Logging => "logging",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::DEFAULT
            .into_iter()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| PipelineError::UnknownStage(s.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown pipeline stage '{0}'")]
    UnknownStage(String),

    #[error("pipeline stage '{0}' is declared more than once")]
    DuplicateStage(Stage),

    #[error("pipeline stage 'authorization' requires a token provider")]
    MissingTokenProvider,
}

/// Builder for an `HttpService`.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
    token_provider: Option<Arc<dyn TokenProvider>>,
    scopes: Vec<String>,
    retry: RetryConfig,
    timeout: Duration,
    max_body_bytes: usize,
    emission_lock: EmissionLock,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            stages: Stage::DEFAULT.to_vec(),
            token_provider: None,
            scopes: Vec::new(),
            retry: RetryConfig::default(),
            timeout: Duration::from_secs(30),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            emission_lock: EmissionLock::default(),
        }
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the declared stages, outermost first.
    pub fn stages(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.stages = stages.into_iter().collect();
        self
    }

    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>, scopes: Vec<String>) -> Self {
        self.token_provider = Some(provider);
        self.scopes = scopes;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Deadline for each attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Lock serializing logged event groups; pass the same lock to every
    /// pipeline that logs to the same destinations.
    pub fn emission_lock(mut self, lock: EmissionLock) -> Self {
        self.emission_lock = lock;
        self
    }

    /// Wrap `transport` in the declared stages.
    pub fn build<T>(self, transport: T) -> Result<HttpService, PipelineError>
    where
        T: Service<Request<Body>, Response = Response<Body>, Error = BoxError> + Clone + Send + 'static,
        T::Future: Send + 'static,
    {
        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(*stage) {
                return Err(PipelineError::DuplicateStage(*stage));
            }
        }

        let mut service = HttpService::new(transport);
        for stage in self.stages.iter().rev() {
            service = match stage {
                Stage::Logging => HttpService::new(
                    LoggingLayer::new(self.max_body_bytes)
                        .with_emission_lock(self.emission_lock.clone())
                        .layer(service),
                ),
                Stage::SdkHeader => HttpService::new(
                    SetRequestHeaderLayer::if_not_present(
                        HeaderName::from_static("sdkversion"),
                        HeaderValue::from_static(SDK_VERSION),
                    )
                    .layer(service),
                ),
                Stage::Timeout => HttpService::new(TimeoutLayer::new(self.timeout).layer(service)),
                Stage::Retry => HttpService::new(RetryLayer::new(self.retry.clone()).layer(service)),
                Stage::Authorization => {
                    let provider = self
                        .token_provider
                        .clone()
                        .ok_or(PipelineError::MissingTokenProvider)?;
                    HttpService::new(AuthorizationLayer::new(provider, self.scopes.clone()).layer(service))
                }
            };
        }

        tracing::debug!(
            stages = %self.stages.iter().map(Stage::name).collect::<Vec<_>>().join(" → "),
            "Client pipeline built"
        );
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use crate::pipeline::body;
    use crate::test_support::CapturedEvents;
    use hyper::header::AUTHORIZATION;
    use tower::{service_fn, ServiceExt};

    fn provider() -> Arc<dyn TokenProvider> {
        Arc::new(StaticTokenProvider::new("client", Some("abc".into())))
    }

    async fn echo_headers(request: Request<Body>) -> Result<Response<Body>, BoxError> {
        let mut response = Response::new(body::empty());
        *response.headers_mut() = request.headers().clone();
        Ok(response)
    }

    #[test]
    fn stage_names_round_trip() {
        for stage in Stage::DEFAULT {
            assert_eq!(stage.name().parse::<Stage>().unwrap(), stage);
        }
        assert!(matches!("compression".parse::<Stage>(), Err(PipelineError::UnknownStage(_))));
    }

    #[test]
    fn duplicate_stage_rejected() {
        let result = PipelineBuilder::new()
            .stages([Stage::Logging, Stage::Retry, Stage::Logging])
            .build(service_fn(echo_headers));
        assert!(matches!(result, Err(PipelineError::DuplicateStage(Stage::Logging))));
    }

    #[test]
    fn authorization_requires_provider() {
        let result = PipelineBuilder::new().build(service_fn(echo_headers));
        assert!(matches!(result, Err(PipelineError::MissingTokenProvider)));
    }

    #[tokio::test]
    async fn default_pipeline_decorates_and_logs() {
        let captured = CapturedEvents::default();
        let _default = tracing::subscriber::set_default(captured.subscriber());

        let service = PipelineBuilder::new()
            .token_provider(provider(), vec!["User.Read".into()])
            .build(service_fn(echo_headers))
            .unwrap();

        let request = Request::get("https://graph.test/v1.0/me").body(body::empty()).unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.headers()[AUTHORIZATION], "Bearer abc");
        assert_eq!(response.headers()["sdkversion"], SDK_VERSION);

        let events = captured.events();
        let block = events
            .iter()
            .find(|e| e.message.starts_with("Method: GET"))
            .unwrap();
        assert!(block.message.contains("authorization: [redacted]"));
        assert!(block.message.contains("sdkversion: wiretrail/"));
    }

    #[tokio::test]
    async fn timeout_error_passes_through_logging() {
        let captured = CapturedEvents::default();
        let _default = tracing::subscriber::set_default(captured.subscriber());

        let slow = service_fn(|_request: Request<Body>| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, BoxError>(Response::new(body::empty()))
        });
        let service = PipelineBuilder::new()
            .stages([Stage::Logging, Stage::Timeout])
            .timeout(Duration::from_millis(20))
            .build(slow)
            .unwrap();

        let request = Request::get("https://graph.test/v1.0/me").body(body::empty()).unwrap();
        let err = service.oneshot(request).await.unwrap_err();
        assert!(err.is::<tower::timeout::error::Elapsed>());

        let events = captured.events();
        assert!(events.last().unwrap().message.starts_with("Request failed"));
    }
}
