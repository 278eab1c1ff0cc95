//! Configuration schema definitions.
//!
//! This module defines the complete settings structure for the client.
//! All types derive Serde traits for deserialization from the settings file.

use serde::{Deserialize, Serialize};

use crate::observability::Level;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Application identity used by the authentication flow.
    pub identity: IdentityConfig,

    /// Local and remote logging destinations.
    pub logging: LoggingConfig,

    /// Remote append log storage.
    pub storage: StorageConfig,

    /// Outbound API client settings.
    pub graph: GraphConfig,
}

/// Identity and tenant settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Application (client) ID.
    pub client_id: String,

    /// Directory (tenant) ID.
    pub tenant_id: String,

    /// Scopes requested for the access token.
    pub scopes: Vec<String>,

    /// Redirect URI registered for the interactive flow.
    pub redirect_uri: String,

    /// Pre-acquired access token. Falls back to `WIRETRAIL_ACCESS_TOKEN`.
    pub access_token: Option<String>,

    /// Allow authentication trace events flagged as containing PII.
    pub pii_logging: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            tenant_id: "common".to_string(),
            scopes: vec!["User.Read".to_string()],
            redirect_uri: "http://localhost".to_string(),
            access_token: None,
            pii_logging: true,
        }
    }
}

/// Logging destinations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Path of the local log file; the date is inserted before the extension.
    pub local_path: String,

    /// Process-wide minimum level.
    pub minimum_level: Level,

    /// Minimum level for the console destination.
    pub console_level: Level,

    /// Minimum level for the local file destination.
    pub file_level: Level,

    /// Minimum level for the remote append log destination.
    pub remote_level: Level,

    /// Maximum number of body bytes rendered per request or response.
    pub max_body_bytes: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_path: "logs/wiretrail.log".to_string(),
            minimum_level: Level::Debug,
            console_level: Level::Verbose,
            file_level: Level::Verbose,
            remote_level: Level::Verbose,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Storage backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Cloud append-blob REST endpoint.
    Blob,
    /// Local directory tree.
    Directory,
    /// In-process memory (nothing survives the process).
    Memory,
}

/// Remote append log storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend kind.
    pub backend: StorageBackend,

    /// Connection string (blob) or root directory (directory).
    pub connection: String,

    /// Request timeout for blob storage calls in seconds.
    pub timeout_secs: u64,

    /// Target for authentication library trace events.
    pub auth_log: AppendLogConfig,

    /// Target for HTTP call trace events.
    pub http_log: AppendLogConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            connection: String::new(),
            timeout_secs: 10,
            auth_log: AppendLogConfig {
                container: "auth-logs".to_string(),
                object: "auth-log.txt".to_string(),
            },
            http_log: AppendLogConfig {
                container: "http-logs".to_string(),
                object: "http-log.txt".to_string(),
            },
        }
    }
}

/// One append log target.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppendLogConfig {
    /// Container name.
    pub container: String,

    /// Object base name; prefixed with the startup date.
    pub object: String,
}

/// Outbound API client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Base URL every request path is joined to.
    pub base_url: String,

    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,

    /// Retry settings.
    pub retries: RetryConfig,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.microsoft.com/v1.0".to_string(),
            timeout_secs: 30,
            retries: RetryConfig::default(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}
