//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! token.rs (TokenProvider) → pipeline authorization stage
//!     └→ trace.rs (TraceCallback) → SinkWriter → auth append log
//! ```
//!
//! # Design Decisions
//! - The trace callback signature is fixed by the identity library
//! - PII filtering is decided by the hook's owner, not by the sink

pub mod token;
pub mod trace;

pub use token::{AccessToken, StaticTokenProvider, TokenError, TokenProvider};
pub use trace::{AuthLogLevel, AuthTraceHook, TraceCallback};
