//! Authorization stage: attaches a bearer token to each request.

use std::sync::Arc;
use std::task::{Context, Poll};

use hyper::header::{HeaderValue, AUTHORIZATION};
use hyper::{Request, Response};
use tower::{BoxError, Layer, Service};

use crate::auth::TokenProvider;
use crate::pipeline::body::Body;
use crate::pipeline::{call_boxed, ResponseFuture};

#[derive(Debug, Clone)]
pub struct AuthorizationLayer {
    provider: Arc<dyn TokenProvider>,
    scopes: Arc<[String]>,
}

impl AuthorizationLayer {
    pub fn new(provider: Arc<dyn TokenProvider>, scopes: Vec<String>) -> Self {
        Self {
            provider,
            scopes: scopes.into(),
        }
    }
}

impl<S> Layer<S> for AuthorizationLayer {
    type Service = AuthorizationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizationService {
            inner,
            provider: self.provider.clone(),
            scopes: self.scopes.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizationService<S> {
    inner: S,
    provider: Arc<dyn TokenProvider>,
    scopes: Arc<[String]>,
}

impl<S> Service<Request<Body>> for AuthorizationService<S>
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

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let provider = self.provider.clone();
        let scopes = self.scopes.clone();

        Box::pin(async move {
            // Callers may authorize individual requests themselves.
            if !request.headers().contains_key(AUTHORIZATION) {
                let token = provider.token(&scopes).await?;
                let mut value = HeaderValue::try_from(format!("Bearer {}", token.secret))?;
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            call_boxed(&mut inner, request).await
        })
    }
}
