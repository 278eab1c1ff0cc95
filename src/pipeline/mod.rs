//! Client HTTP pipeline.
//!
//! # Data Flow
//! ```text
//! caller (graph client)
//!     → auth.rs (bearer token)
//!     → retry.rs (idempotent retries, backoff)
//!     → tower timeout (per attempt)
//!     → sdk-header (tower-http set-header)
//!     → logging.rs (request/response events)
//!     → transport.rs (reqwest)
//! ```
//!
//! # Design Decisions
//! - Every stage is a tower `Layer` over `Request<Body>` → `Response<Body>`
//!   with `BoxError` errors, so stages compose in any declared order
//! - Bodies are buffered in memory; logging and retries both need them whole

pub mod auth;
pub mod body;
pub mod builder;
pub mod logging;
pub mod render;
pub mod retry;
pub mod transport;

pub use body::{Body, FailedBody};
pub use builder::{HttpService, PipelineBuilder, PipelineError, Stage, SDK_VERSION};
pub use logging::{EmissionLock, LoggingLayer, LoggingService};
pub use retry::{RetryLayer, RetryService};
pub use transport::HttpTransport;

use std::future::Future;
use std::pin::Pin;

use hyper::{Request, Response};
use tower::{BoxError, Service};

/// Future returned by every stage.
pub(crate) type ResponseFuture =
    Pin<Box<dyn Future<Output = Result<Response<Body>, BoxError>> + Send>>;

/// Call the next stage with its future boxed.
///
/// Stages must not hold the inner `S::Future` across an await in their own
/// `async` block: its `Send` bound would have to hold for every lifetime in
/// `BoxError`, which the compiler cannot prove.
pub(crate) fn call_boxed<S>(service: &mut S, request: Request<Body>) -> ResponseFuture
where
    S: Service<Request<Body>, Response = Response<Body>, Error = BoxError>,
    S::Future: Send + 'static,
{
    Box::pin(service.call(request))
}
