//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check container and object naming rules for the append logs
//! - Validate value ranges (timeouts > 0, attempts >= 1)
//! - Check that the storage backend has the connection it needs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::{AppConfig, AppendLogConfig, StorageBackend};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.identity.scopes.iter().all(|s| s.trim().is_empty()) {
        errors.push(ValidationError::new("identity.scopes", "at least one scope is required"));
    }

    if config.logging.local_path.trim().is_empty() {
        errors.push(ValidationError::new("logging.local_path", "must not be empty"));
    }

    match config.storage.backend {
        StorageBackend::Blob | StorageBackend::Directory if config.storage.connection.trim().is_empty() => {
            errors.push(ValidationError::new(
                "storage.connection",
                "required for blob and directory backends",
            ));
        }
        _ => {}
    }

    if config.storage.timeout_secs == 0 {
        errors.push(ValidationError::new("storage.timeout_secs", "must be greater than zero"));
    }

    check_append_log("storage.auth_log", &config.storage.auth_log, &mut errors);
    check_append_log("storage.http_log", &config.storage.http_log, &mut errors);

    if let Err(e) = url::Url::parse(&config.graph.base_url) {
        errors.push(ValidationError::new("graph.base_url", format!("invalid URL: {}", e)));
    }

    if config.graph.timeout_secs == 0 {
        errors.push(ValidationError::new("graph.timeout_secs", "must be greater than zero"));
    }

    let retries = &config.graph.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::new("graph.retries.max_attempts", "must be at least 1"));
    }
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::new(
            "graph.retries.base_delay_ms",
            "must not exceed max_delay_ms",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_append_log(prefix: &str, log: &AppendLogConfig, errors: &mut Vec<ValidationError>) {
    if let Err(message) = check_container_name(&log.container) {
        errors.push(ValidationError::new(format!("{}.container", prefix), message));
    }

    if log.object.trim().is_empty() {
        errors.push(ValidationError::new(format!("{}.object", prefix), "must not be empty"));
    } else if log.object.len() > 1000 {
        errors.push(ValidationError::new(format!("{}.object", prefix), "longer than 1000 characters"));
    }
}

/// Container names: 3-63 chars of lowercase letters, digits and single hyphens,
/// starting and ending with a letter or digit.
fn check_container_name(name: &str) -> Result<(), &'static str> {
    if !(3..=63).contains(&name.len()) {
        return Err("must be 3-63 characters long");
    }
    if !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return Err("only lowercase letters, digits and hyphens are allowed");
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err("must start and end with a letter or digit");
    }
    if name.contains("--") {
        return Err("consecutive hyphens are not allowed");
    }
    Ok(())
}
