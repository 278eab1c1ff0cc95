//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Stores + sinks → Logger → Sinks ready → Auth hook → Pipeline
//!
//! Shutdown (shutdown.rs):
//!     Flush auth log → Flush and close logger (last)
//! ```
//!
//! # Design Decisions
//! - Ordered startup: the logger exists before anything emits events
//! - Sink readiness failures are non-fatal; the sinks stay silent
//! - One initialization per process, guarded against re-entry

pub mod shutdown;
pub mod startup;

pub use startup::{AppContext, StartupError};
