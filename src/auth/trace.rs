//! Authentication library trace hook.
//!
//! The identity library reports through a fixed callback signature
//! `(level, message, contains_pii)` from its own threads. The hook formats
//! each report as one line and queues it on the authentication append log,
//! bypassing the general logger.

use std::fmt;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::observability::FALLBACK_TARGET;
use crate::storage::{AppendError, SinkWriter};

/// Severity used by the identity library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AuthLogLevel {
    Error,
    Warning,
    Info,
    Verbose,
}

impl AuthLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthLogLevel::Error => "Error",
            AuthLogLevel::Warning => "Warning",
            AuthLogLevel::Info => "Info",
            AuthLogLevel::Verbose => "Verbose",
        }
    }
}

impl fmt::Display for AuthLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback handed to the identity library.
pub type TraceCallback = Arc<dyn Fn(AuthLogLevel, &str, bool) + Send + Sync>;

/// Writes identity library reports to an append log.
#[derive(Debug, Clone)]
pub struct AuthTraceHook {
    writer: SinkWriter,
    pii_enabled: bool,
}

impl AuthTraceHook {
    /// `pii_enabled` decides whether reports flagged as containing personal
    /// data are written or dropped.
    pub fn new(writer: SinkWriter, pii_enabled: bool) -> Self {
        Self {
            writer,
            pii_enabled,
        }
    }

    /// Queue one report. Never blocks and never fails the caller.
    pub fn record(&self, level: AuthLogLevel, message: &str, contains_pii: bool) {
        if contains_pii && !self.pii_enabled {
            return;
        }

        let line = format!(
            "{}: {} {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            message
        );
        match self.writer.submit(line) {
            Ok(()) => {}
            Err(AppendError::NotReady) => {
                tracing::trace!(target: FALLBACK_TARGET, "Auth log not ready, trace line dropped");
            }
            Err(e) => {
                tracing::debug!(target: FALLBACK_TARGET, error = %e, "Auth trace line dropped");
            }
        }
    }

    pub fn callback(&self) -> TraceCallback {
        let hook = self.clone();
        Arc::new(move |level, message: &str, contains_pii| {
            hook.record(level, message, contains_pii)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AppendLogSink, MemoryStore, RemoteAppendTarget};

    async fn ready_writer(store: &MemoryStore) -> (SinkWriter, Arc<AppendLogSink>) {
        let sink = Arc::new(AppendLogSink::new(
            Arc::new(store.clone()),
            RemoteAppendTarget::new("auth-logs", "2024-01-01-auth-log.txt"),
        ));
        sink.ensure_ready().await.unwrap();
        let (writer, _task) = SinkWriter::spawn(sink.clone());
        (writer, sink)
    }

    #[tokio::test]
    async fn formats_lines_with_level() {
        let store = MemoryStore::new();
        let (writer, sink) = ready_writer(&store).await;
        let callback = AuthTraceHook::new(writer.clone(), true).callback();

        callback(AuthLogLevel::Info, "Acquiring token", false);
        callback(AuthLogLevel::Verbose, "Account user@contoso.com", true);
        writer.close().await;

        let lines = store.lines(sink.target());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Z: Info Acquiring token"), "{}", lines[0]);
        assert!(lines[1].ends_with("Z: Verbose Account user@contoso.com"));
    }

    #[tokio::test]
    async fn pii_reports_dropped_when_disabled() {
        let store = MemoryStore::new();
        let (writer, sink) = ready_writer(&store).await;
        let hook = AuthTraceHook::new(writer.clone(), false);

        hook.record(AuthLogLevel::Info, "public", false);
        hook.record(AuthLogLevel::Info, "user@contoso.com", true);
        writer.close().await;

        let lines = store.lines(sink.target());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("public"));
    }

    #[tokio::test]
    async fn callback_from_library_threads_before_ready_is_harmless() {
        let store = MemoryStore::new();
        let sink = Arc::new(AppendLogSink::new(
            Arc::new(store.clone()),
            RemoteAppendTarget::new("auth-logs", "log.txt"),
        ));
        let (writer, _task) = SinkWriter::spawn(sink);
        let callback = AuthTraceHook::new(writer.clone(), true).callback();

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let callback = callback.clone();
                std::thread::spawn(move || callback(AuthLogLevel::Warning, &format!("early {i}"), false))
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        writer.close().await;

        assert_eq!(store.operation_count(), 0);
    }
}
