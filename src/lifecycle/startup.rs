//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the append log sinks from configuration
//! - Install the process-wide logger
//! - Ready the sinks, then wire the auth trace hook and the client pipeline
//!
//! # Design Decisions
//! - Fail fast on configuration, logger, and pipeline errors
//! - Subsystems initialize in order, not concurrently (except the two sinks)
//! - All process-wide state lives in the returned `AppContext`

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::auth::{AuthTraceHook, StaticTokenProvider};
use crate::config::AppConfig;
use crate::graph::{GraphClient, GraphError};
use crate::observability::{
    self, ConsoleDestination, Destinations, FileDestination, LoggerGuard, LoggingError,
    RemoteDestination,
};
use crate::pipeline::{HttpTransport, PipelineBuilder, PipelineError};
use crate::storage::{self, AppendLogSink, RemoteAppendTarget, SinkWriter, StoreError};

/// Environment variable consulted when no access token is configured.
pub const ACCESS_TOKEN_ENV: &str = "WIRETRAIL_ACCESS_TOKEN";

static INITIALIZED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("application context is already initialized")]
    AlreadyInitialized,

    #[error("storage setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("logger setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("http transport setup failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("pipeline setup failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("graph client setup failed: {0}")]
    Graph(#[from] GraphError),
}

/// Everything the application shares, constructed once at startup.
#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub graph: GraphClient,
    pub auth_hook: AuthTraceHook,
    pub(crate) http_sink: Arc<AppendLogSink>,
    pub(crate) auth_sink: Arc<AppendLogSink>,
    pub(crate) auth_writer: SinkWriter,
    pub(crate) logger: LoggerGuard,
}

impl AppContext {
    /// Initialize every subsystem from `config`.
    ///
    /// Succeeds at most once per process; later calls return
    /// `AlreadyInitialized` without side effects.
    pub async fn initialize(config: AppConfig) -> Result<Self, StartupError> {
        if INITIALIZED.swap(true, Ordering::SeqCst) {
            return Err(StartupError::AlreadyInitialized);
        }

        // 1. Stores and sinks (not yet ready)
        let store = storage::store_from_config(&config.storage)?;
        let http_sink = Arc::new(AppendLogSink::new(
            store.clone(),
            RemoteAppendTarget::for_today(&config.storage.http_log.container, &config.storage.http_log.object),
        ));
        let auth_sink = Arc::new(AppendLogSink::new(
            store,
            RemoteAppendTarget::for_today(&config.storage.auth_log.container, &config.storage.auth_log.object),
        ));
        let (http_writer, _) = SinkWriter::spawn(http_sink.clone());
        let (auth_writer, _) = SinkWriter::spawn(auth_sink.clone());

        // 2. Logger
        let logging = &config.logging;
        let destinations = Destinations {
            console: Some(ConsoleDestination {
                level: logging.console_level,
            }),
            file: Some(FileDestination {
                path: PathBuf::from(&logging.local_path),
                level: logging.file_level,
            }),
            remote: Some(RemoteDestination {
                writer: http_writer,
                level: logging.remote_level,
            }),
        };
        let logger = observability::configure(destinations, logging.minimum_level)?;
        tracing::info!(
            backend = ?config.storage.backend,
            http_log = %http_sink.target(),
            auth_log = %auth_sink.target(),
            "Logger configured"
        );

        // 3. Ready both sinks; failures leave them silently dropping lines
        let _ = tokio::join!(http_sink.ensure_ready(), auth_sink.ensure_ready());

        // 4. Auth trace hook and token provider
        let auth_hook = AuthTraceHook::new(auth_writer.clone(), config.identity.pii_logging);
        let access_token = config
            .identity
            .access_token
            .clone()
            .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok());
        let provider = StaticTokenProvider::new(&config.identity.client_id, access_token)
            .with_trace(auth_hook.callback());

        // 5. Client pipeline
        let transport = HttpTransport::with_connect_timeout(Duration::from_secs(config.graph.timeout_secs))?;
        let service = PipelineBuilder::new()
            .token_provider(Arc::new(provider), config.identity.scopes.clone())
            .retry(config.graph.retries.clone())
            .timeout(Duration::from_secs(config.graph.timeout_secs))
            .max_body_bytes(config.logging.max_body_bytes)
            .build(transport)?;
        let graph = GraphClient::new(service, &config.graph.base_url)?;

        tracing::info!(base_url = %config.graph.base_url, "Startup complete");

        Ok(Self {
            config,
            graph,
            auth_hook,
            http_sink,
            auth_sink,
            auth_writer,
            logger,
        })
    }

    pub fn http_sink(&self) -> &Arc<AppendLogSink> {
        &self.http_sink
    }

    pub fn auth_sink(&self) -> &Arc<AppendLogSink> {
        &self.auth_sink
    }
}
