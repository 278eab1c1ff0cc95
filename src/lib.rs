//! Wiretrail: HTTP call tracing into remote append logs.
//!
//! # Architecture Overview
//!
//! ```text
//!   business calls (graph)
//!          │
//!          ▼
//!   ┌──────────────────── pipeline ─────────────────────┐
//!   │ authorization → retry → timeout → sdk-header →    │
//!   │ logging ──────────────────────────────▶ transport ─┼──▶ network
//!   └──────────┬────────────────────────────────────────┘
//!              │ events
//!              ▼
//!   ┌──────────────── observability ───────────────┐
//!   │ console      rolling file      remote layer ──┼──▶ storage: http log
//!   └──────────────────────────────────────────────┘
//!
//!   auth token provider ── trace callback ─────────────▶ storage: auth log
//! ```
//!
//! `lifecycle::AppContext` wires everything from `config::AppConfig` and owns
//! the process-wide state.

// Core subsystems
pub mod config;
pub mod pipeline;
pub mod storage;

// Application
pub mod auth;
pub mod graph;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

#[cfg(test)]
mod test_support;

pub use config::schema::AppConfig;
pub use lifecycle::{AppContext, StartupError};
