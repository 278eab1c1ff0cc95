//! Graph API client over the declared pipeline.

use hyper::body::Bytes;
use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::{Method, Request, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tower::{BoxError, ServiceExt};
use url::Url;

use crate::graph::models::{Application, ApplicationRegistration, ErrorEnvelope, User};
use crate::pipeline::body;
use crate::pipeline::HttpService;

#[derive(Debug, Error)]
pub enum GraphError {
    /// The pipeline failed before a response arrived.
    #[error("graph request failed: {0}")]
    Transport(#[source] BoxError),

    #[error("graph returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },

    #[error("invalid graph payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid graph request: {0}")]
    Request(#[source] BoxError),

    #[error("invalid graph base url: {0}")]
    BaseUrl(#[from] url::ParseError),
}

/// Client for the two Graph operations the application performs.
#[derive(Clone)]
pub struct GraphClient {
    service: HttpService,
    base_url: String,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GraphClient {
    pub fn new(service: HttpService, base_url: &str) -> Result<Self, GraphError> {
        Url::parse(base_url)?;
        Ok(Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Profile of the signed-in user.
    pub async fn get_me(&self) -> Result<User, GraphError> {
        let request = self.request(Method::GET, "me", None, body::empty())?;
        let bytes = self.send(request).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Register a new application.
    pub async fn create_application(
        &self,
        registration: &ApplicationRegistration,
    ) -> Result<Application, GraphError> {
        let payload = serde_json::to_vec(registration)?;
        let request = self.request(
            Method::POST,
            "applications",
            Some("application/json"),
            body::full(payload),
        )?;
        let bytes = self.send(request).await?;
        decode(&bytes)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        content_type: Option<&str>,
        payload: body::Body,
    ) -> Result<Request<body::Body>, GraphError> {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("{}/{}", self.base_url, path))
            .header(ACCEPT, "application/json");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(payload).map_err(|e| GraphError::Request(e.into()))
    }

    async fn send(&self, request: Request<body::Body>) -> Result<Bytes, GraphError> {
        let response = self
            .service
            .clone()
            .oneshot(request)
            .await
            .map_err(GraphError::Transport)?;

        let (parts, response_body) = response.into_parts();
        let bytes = body::collect(response_body)
            .await
            .map_err(GraphError::Transport)?;

        if !parts.status.is_success() {
            return Err(status_error(parts.status, &bytes));
        }
        Ok(bytes)
    }
}

fn decode<T: DeserializeOwned + Default>(bytes: &[u8]) -> Result<T, GraphError> {
    if bytes.is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(bytes)?)
}

fn status_error(status: StatusCode, bytes: &[u8]) -> GraphError {
    let (code, message) = match serde_json::from_slice::<ErrorEnvelope>(bytes) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (None, None),
    };
    GraphError::Status {
        status: status.as_u16(),
        code,
        message,
    }
}
