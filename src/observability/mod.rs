//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing macros / event.rs (LogEvent via emit)
//!     → metrics.rs (counters)
//!
//! logging.rs subscriber (process-wide floor first):
//!     → console (fmt layer)
//!     → daily rolling file (non-blocking worker)
//!     → remote.rs (SinkWriter → AppendLogSink)
//! ```
//!
//! # Design Decisions
//! - One event stream, independent per-destination level filters
//! - Only this crate's events reach the remote destination; storage failures
//!   are reported on `FALLBACK_TARGET`, which is excluded from it
//! - Call correlation IDs are carried as event fields

pub mod event;
pub(crate) mod format;
pub mod logging;
pub mod metrics;
pub mod remote;

pub use event::{Level, LogEvent, ParseLevelError};
pub use logging::{
    build, configure, emit, ConsoleDestination, Destinations, FileDestination, LoggerGuard,
    LoggingError, RemoteDestination,
};
pub use remote::{forwarded_targets, RemoteLayer};

/// Tracing target for diagnostics about the logging path itself.
pub const FALLBACK_TARGET: &str = "wiretrail::fallback";
