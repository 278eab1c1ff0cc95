//! Append-object store abstraction.

use async_trait::async_trait;
use thiserror::Error;

use crate::storage::target::RemoteAppendTarget;

/// Errors raised by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The HTTP request could not be sent or its response not read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a status the operation does not accept.
    #[error("unexpected status {status} ({})", .code.as_deref().unwrap_or("no error code"))]
    Status { status: u16, code: Option<String> },

    /// Local filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Container or object does not exist.
    #[error("{0} does not exist")]
    NotFound(String),

    /// The connection string cannot be used.
    #[error("invalid connection string: {0}")]
    InvalidConnection(String),
}

/// A store offering idempotent existence-ensure and atomic tail-append.
///
/// Implementations must make each `append_block` call land as one
/// contiguous unit at the end of the object.
#[async_trait]
pub trait AppendStore: Send + Sync + std::fmt::Debug {
    /// Create the container unless it already exists.
    async fn create_container_if_not_exists(&self, container: &str) -> Result<(), StoreError>;

    /// Create an empty append object unless it already exists.
    async fn create_append_object_if_not_exists(
        &self,
        target: &RemoteAppendTarget,
    ) -> Result<(), StoreError>;

    /// Append `block` to the end of an existing object.
    async fn append_block(&self, target: &RemoteAppendTarget, block: Vec<u8>) -> Result<(), StoreError>;

    /// Short backend name for logs.
    fn kind(&self) -> &'static str;
}
