//! Remote append log storage subsystem.
//!
//! # Data Flow
//! ```text
//! auth trace hook / remote tracing layer (sync)
//!     → writer.rs (queue, single writer task)
//!     → sink.rs (readiness check, line encoding)
//!     → store.rs (AppendStore trait)
//!         → blob.rs (append-blob REST service)
//!         → directory.rs (local files)
//!         → memory.rs (in-process)
//! ```
//!
//! # Design Decisions
//! - Target (container + object) is fixed at startup and shared via Arc
//! - Only `append` mutates remote state, and only once the sink is ready
//! - Delivery is best-effort: at most once, dropped on failure

pub mod blob;
pub mod directory;
pub mod memory;
pub mod sink;
pub mod store;
pub mod target;
pub mod writer;

use std::sync::Arc;
use std::time::Duration;

pub use blob::{BlobConnection, BlobStore};
pub use directory::DirectoryStore;
pub use memory::MemoryStore;
pub use sink::{AppendError, AppendLogSink, InitError, SinkState};
pub use store::{AppendStore, StoreError};
pub use target::RemoteAppendTarget;
pub use writer::SinkWriter;

use crate::config::{StorageBackend, StorageConfig};

/// Build the store selected by configuration.
pub fn store_from_config(config: &StorageConfig) -> Result<Arc<dyn AppendStore>, StoreError> {
    let store: Arc<dyn AppendStore> = match config.backend {
        StorageBackend::Blob => Arc::new(BlobStore::from_connection_string(
            &config.connection,
            Duration::from_secs(config.timeout_secs),
        )?),
        StorageBackend::Directory => Arc::new(DirectoryStore::new(&config.connection)),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
