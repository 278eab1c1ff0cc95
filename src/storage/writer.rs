//! Background writer feeding an append log sink from synchronous callers.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::observability::{metrics, FALLBACK_TARGET};
use crate::storage::sink::{AppendError, AppendLogSink};

/// Lines queued ahead of the writer task before new ones are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

enum Command {
    Line(String),
    Close(oneshot::Sender<()>),
}

/// Handle to a single writer task that appends lines in submission order.
///
/// `submit` never blocks and never performs I/O on the caller's thread, so it
/// can be called from tracing layers and third-party callbacks. The queue is
/// bounded; lines submitted while it is full are dropped.
#[derive(Debug, Clone)]
pub struct SinkWriter {
    sink: Arc<AppendLogSink>,
    tx: mpsc::Sender<Command>,
}

impl SinkWriter {
    /// Start the writer task.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn spawn(sink: Arc<AppendLogSink>) -> (Self, JoinHandle<()>) {
        Self::with_capacity(sink, DEFAULT_QUEUE_CAPACITY)
    }

    /// Start the writer task with room for `capacity` queued lines.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn with_capacity(sink: Arc<AppendLogSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run(sink.clone(), rx));
        (Self { sink, tx }, handle)
    }

    pub fn sink(&self) -> &Arc<AppendLogSink> {
        &self.sink
    }

    /// Queue a line for appending.
    ///
    /// Returns `NotReady` without queueing when the sink is not ready at call
    /// time, `QueueFull` when the writer is behind, and `Closed` after `close`.
    pub fn submit(&self, line: impl Into<String>) -> Result<(), AppendError> {
        if !self.sink.is_ready() {
            return Err(AppendError::NotReady);
        }
        match self.tx.try_send(Command::Line(line.into())) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                metrics::record_sink_append("dropped");
                Err(AppendError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(AppendError::Closed),
        }
    }

    /// Append everything queued so far, then stop the task.
    pub async fn close(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Close(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}

async fn run(sink: Arc<AppendLogSink>, mut rx: mpsc::Receiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            // Failures are logged by the sink and dropped here.
            Command::Line(line) => {
                let _ = sink.append(&line).await;
            }
            Command::Close(ack) => {
                rx.close();
                while let Ok(command) = rx.try_recv() {
                    if let Command::Line(line) = command {
                        let _ = sink.append(&line).await;
                    }
                }
                let _ = ack.send(());
                break;
            }
        }
    }
    tracing::debug!(target: FALLBACK_TARGET, target_object = %sink.target(), "Append writer stopped");
}
