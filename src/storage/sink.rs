//! Remote append log sink.
//!
//! # Responsibilities
//! - Lazily create the container and append object (`ensure_ready`)
//! - Append newline-terminated lines as single blocks (`append`)
//! - Refuse appends locally until the target is ready
//!
//! # State Transitions
//! ```text
//! Uninitialized → Ready: first successful ensure_ready
//! Uninitialized → Uninitialized: ensure_ready failed (retry allowed)
//! ```
//!
//! # Design Decisions
//! - Failures are logged to the fallback target and returned; callers drop them
//! - Concurrent first calls to ensure_ready run one creation sequence
//! - Ready is terminal; the object is never closed or rotated here

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::observability::{metrics, FALLBACK_TARGET};
use crate::storage::store::{AppendStore, StoreError};
use crate::storage::target::RemoteAppendTarget;

/// Lifecycle of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Uninitialized,
    Ready,
}

/// Creating the container or object failed.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to create container '{container}': {source}")]
    Container { container: String, source: StoreError },

    #[error("failed to create append object '{target}': {source}")]
    Object { target: String, source: StoreError },
}

/// An append was not performed.
#[derive(Debug, Error)]
pub enum AppendError {
    /// `ensure_ready` has not completed successfully.
    #[error("append sink is not ready")]
    NotReady,

    /// The store rejected or failed the append.
    #[error("append failed: {0}")]
    Transport(#[from] StoreError),

    /// The writer feeding this sink has been closed.
    #[error("append writer is closed")]
    Closed,

    /// The writer's queue was full; the line was dropped.
    #[error("append queue is full")]
    QueueFull,
}

/// Append-only log stored remotely.
#[derive(Debug)]
pub struct AppendLogSink {
    store: Arc<dyn AppendStore>,
    target: RemoteAppendTarget,
    ready: AtomicBool,
    init_lock: Mutex<()>,
}

impl AppendLogSink {
    pub fn new(store: Arc<dyn AppendStore>, target: RemoteAppendTarget) -> Self {
        Self {
            store,
            target,
            ready: AtomicBool::new(false),
            init_lock: Mutex::new(()),
        }
    }

    pub fn target(&self) -> &RemoteAppendTarget {
        &self.target
    }

    pub fn state(&self) -> SinkState {
        if self.is_ready() {
            SinkState::Ready
        } else {
            SinkState::Uninitialized
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Create the container and append object if absent.
    ///
    /// Safe to call repeatedly; once ready, returns without touching the store.
    pub async fn ensure_ready(&self) -> Result<SinkState, InitError> {
        if self.is_ready() {
            return Ok(SinkState::Ready);
        }

        let _guard = self.init_lock.lock().await;
        // Another caller may have finished while we waited.
        if self.is_ready() {
            return Ok(SinkState::Ready);
        }

        let result = self.create().await;
        match &result {
            Ok(()) => {
                self.ready.store(true, Ordering::Release);
                tracing::info!(
                    target: FALLBACK_TARGET,
                    store = self.store.kind(),
                    target_object = %self.target,
                    "Append log ready"
                );
            }
            Err(e) => {
                tracing::error!(
                    target: FALLBACK_TARGET,
                    store = self.store.kind(),
                    target_object = %self.target,
                    error = %e,
                    "Failed to initialize append log"
                );
            }
        }
        result.map(|()| SinkState::Ready)
    }

    async fn create(&self) -> Result<(), InitError> {
        // 1. Container
        self.store
            .create_container_if_not_exists(&self.target.container_id)
            .await
            .map_err(|source| InitError::Container {
                container: self.target.container_id.clone(),
                source,
            })?;

        // 2. Append object inside it
        self.store
            .create_append_object_if_not_exists(&self.target)
            .await
            .map_err(|source| InitError::Object {
                target: self.target.to_string(),
                source,
            })
    }

    /// Append one line as a single block.
    ///
    /// Before the sink is ready this returns `NotReady` and performs no I/O.
    pub async fn append(&self, line: &str) -> Result<(), AppendError> {
        if !self.is_ready() {
            metrics::record_sink_append("not_ready");
            return Err(AppendError::NotReady);
        }

        match self.store.append_block(&self.target, encode_line(line)).await {
            Ok(()) => {
                metrics::record_sink_append("ok");
                Ok(())
            }
            Err(e) => {
                metrics::record_sink_append("error");
                tracing::warn!(
                    target: FALLBACK_TARGET,
                    target_object = %self.target,
                    error = %e,
                    "Failed to append to remote log"
                );
                Err(AppendError::Transport(e))
            }
        }
    }
}

/// UTF-8 bytes of `line` terminated by exactly one newline.
fn encode_line(line: &str) -> Vec<u8> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let mut block = Vec::with_capacity(line.len() + 1);
    block.extend_from_slice(line.as_bytes());
    block.push(b'\n');
    block
}
