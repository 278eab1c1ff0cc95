//! Multi-destination logging.
//!
//! # Responsibilities
//! - Build the subscriber fanning events out to console, file and remote log
//! - Install it once per process
//! - Dispatch `LogEvent`s and flush destinations at exit
//!
//! # Design Decisions
//! - Process-wide floor is an `EnvFilter`; `RUST_LOG` overrides the
//!   configured minimum when installing globally
//! - Each destination carries its own `LevelFilter` as a per-layer filter
//! - File output goes through a non-blocking worker so slow disks never stall
//!   callers

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::{Layer, SubscriberExt};

use crate::observability::event::{Level, LogEvent};
use crate::observability::remote::{forwarded_targets, RemoteLayer};
use crate::storage::SinkWriter;

/// Where events go. Absent destinations are skipped.
#[derive(Debug, Default)]
pub struct Destinations {
    pub console: Option<ConsoleDestination>,
    pub file: Option<FileDestination>,
    pub remote: Option<RemoteDestination>,
}

#[derive(Debug, Clone)]
pub struct ConsoleDestination {
    pub level: Level,
}

/// Daily rolling file. `path` supplies directory, prefix and extension:
/// `logs/wiretrail.log` rolls as `logs/wiretrail.YYYY-MM-DD.log`.
#[derive(Debug, Clone)]
pub struct FileDestination {
    pub path: PathBuf,
    pub level: Level,
}

#[derive(Debug, Clone)]
pub struct RemoteDestination {
    pub writer: SinkWriter,
    pub level: Level,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("logging is already configured for this process")]
    AlreadyConfigured,

    #[error("invalid log file path '{}'", .0.display())]
    FilePath(PathBuf),

    #[error("failed to open log file '{}': {source}", .path.display())]
    File { path: PathBuf, source: InitError },
}

/// Keeps destinations alive; call `shutdown` before exiting.
#[must_use = "dropping the guard stops file output"]
#[derive(Debug)]
pub struct LoggerGuard {
    file: Option<WorkerGuard>,
    remote: Option<SinkWriter>,
}

impl LoggerGuard {
    /// Flush queued remote lines and the file worker.
    pub async fn shutdown(self) {
        if let Some(writer) = &self.remote {
            writer.close().await;
        }
        // Dropping the worker guard blocks until buffered lines are written.
        drop(self.file);
    }
}

/// Build the subscriber without installing it.
///
/// The floor is exactly `minimum`; the environment is not consulted.
pub fn build(
    destinations: Destinations,
    minimum: Level,
) -> Result<(impl Subscriber + Send + Sync + 'static, LoggerGuard), LoggingError> {
    let floor = EnvFilter::default().add_directive(minimum.to_filter().into());
    build_with_floor(destinations, floor)
}

/// Install the subscriber process-wide.
///
/// Fails with `AlreadyConfigured` when any global subscriber already exists.
pub fn configure(destinations: Destinations, minimum: Level) -> Result<LoggerGuard, LoggingError> {
    let floor = EnvFilter::builder()
        .with_default_directive(minimum.to_filter().into())
        .from_env_lossy();
    let (subscriber, guard) = build_with_floor(destinations, floor)?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|_| LoggingError::AlreadyConfigured)?;
    Ok(guard)
}

fn build_with_floor(
    destinations: Destinations,
    floor: EnvFilter,
) -> Result<(impl Subscriber + Send + Sync + 'static, LoggerGuard), LoggingError> {
    let console = destinations.console.map(|console| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_filter(console.level.to_filter())
    });

    let (file, file_guard) = match destinations.file {
        Some(file) => {
            let appender = rolling_appender(&file.path)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer)
                .with_filter(file.level.to_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let remote_writer = destinations.remote.as_ref().map(|remote| remote.writer.clone());
    let remote = destinations
        .remote
        .map(|remote| RemoteLayer::new(remote.writer).with_filter(forwarded_targets(remote.level)));

    let subscriber = tracing_subscriber::registry()
        .with(floor)
        .with(console)
        .with(file)
        .with(remote);

    Ok((
        subscriber,
        LoggerGuard {
            file: file_guard,
            remote: remote_writer,
        },
    ))
}

fn rolling_appender(path: &Path) -> Result<RollingFileAppender, LoggingError> {
    let prefix = path
        .file_stem()
        .and_then(OsStr::to_str)
        .ok_or_else(|| LoggingError::FilePath(path.to_path_buf()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix);
    if let Some(extension) = path.extension().and_then(OsStr::to_str) {
        builder = builder.filename_suffix(extension);
    }
    builder.build(directory).map_err(|source| LoggingError::File {
        path: path.to_path_buf(),
        source,
    })
}

/// Dispatch an event to every destination admitting its level.
pub fn emit(event: &LogEvent) {
    let message = event.message.as_str();
    let sensitive = event.sensitive;
    match event.level {
        Level::Verbose => tracing::trace!(sensitive, "{message}"),
        Level::Debug => tracing::debug!(sensitive, "{message}"),
        Level::Information => tracing::info!(sensitive, "{message}"),
        Level::Warning => tracing::warn!(sensitive, "{message}"),
        Level::Error => tracing::error!(sensitive, "{message}"),
    }
}
