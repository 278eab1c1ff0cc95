//! Terminal network transport.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use hyper::{Request, Response};
use tower::{BoxError, Service};

use crate::pipeline::body::{self, Body};

/// Sends requests over the network with `reqwest`.
///
/// Request bodies are sent from memory; response bodies are read fully
/// before the response is returned. Errors are `reqwest::Error` boxed as-is.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Transport with a connect timeout and no overall deadline; the pipeline
    /// timeout stage bounds each attempt.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().connect_timeout(timeout).build()?;
        Ok(Self::new(client))
    }
}

impl Service<Request<Body>> for HttpTransport {
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let client = self.client.clone();

        Box::pin(async move {
            let (parts, request_body) = request.into_parts();
            let payload = body::collect(request_body).await?;

            let upstream = client
                .request(parts.method, parts.uri.to_string())
                .headers(parts.headers)
                .body(payload)
                .send()
                .await?;

            let mut builder = Response::builder()
                .status(upstream.status())
                .version(upstream.version());
            if let Some(headers) = builder.headers_mut() {
                headers.extend(upstream.headers().clone());
            }
            let payload = upstream.bytes().await?;
            Ok(builder.body(body::full(payload))?)
        })
    }
}
