//! Access token acquisition.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::auth::trace::{AuthLogLevel, TraceCallback};

/// Bearer token for outbound calls.
#[derive(Clone)]
pub struct AccessToken {
    pub secret: String,
    pub expires_on: Option<DateTime<Utc>>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[redacted]")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no access token is configured")]
    Missing,

    #[error("token acquisition failed: {0}")]
    Acquisition(String),
}

/// Source of access tokens for the authorization stage.
#[async_trait]
pub trait TokenProvider: Send + Sync + fmt::Debug {
    async fn token(&self, scopes: &[String]) -> Result<AccessToken, TokenError>;
}

/// Provider serving a pre-acquired token.
///
/// Reports each acquisition through the identity library trace callback
/// like an interactive client would.
pub struct StaticTokenProvider {
    client_id: String,
    secret: Option<String>,
    trace: Option<TraceCallback>,
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("client_id", &self.client_id)
            .field("has_token", &self.secret.is_some())
            .field("traced", &self.trace.is_some())
            .finish()
    }
}

impl StaticTokenProvider {
    pub fn new(client_id: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: TraceCallback) -> Self {
        self.trace = Some(trace);
        self
    }

    fn report(&self, level: AuthLogLevel, message: &str, contains_pii: bool) {
        if let Some(trace) = &self.trace {
            trace(level, message, contains_pii);
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self, scopes: &[String]) -> Result<AccessToken, TokenError> {
        self.report(
            AuthLogLevel::Info,
            &format!("Acquiring token for scopes: {}", scopes.join(" ")),
            false,
        );
        self.report(
            AuthLogLevel::Verbose,
            &format!("Client id: {}", self.client_id),
            true,
        );

        match &self.secret {
            Some(secret) => {
                self.report(AuthLogLevel::Info, "Token served from cache", false);
                Ok(AccessToken {
                    secret: secret.clone(),
                    expires_on: None,
                })
            }
            None => {
                self.report(AuthLogLevel::Error, "No cached token available", false);
                Err(TokenError::Missing)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording() -> (TraceCallback, Arc<Mutex<Vec<(AuthLogLevel, String, bool)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: TraceCallback = Arc::new(move |level, message: &str, pii| {
            sink.lock().unwrap().push((level, message.to_string(), pii));
        });
        (callback, seen)
    }

    #[tokio::test]
    async fn serves_token_and_reports() {
        let (callback, seen) = recording();
        let provider = StaticTokenProvider::new("client-1", Some("t0k3n".into())).with_trace(callback);

        let token = provider.token(&["User.Read".to_string()]).await.unwrap();
        assert_eq!(token.secret, "t0k3n");
        assert!(!format!("{token:?}").contains("t0k3n"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, AuthLogLevel::Info);
        assert_eq!(seen[0].1, "Acquiring token for scopes: User.Read");
        assert!(seen[1].2, "client id report is flagged as PII");
    }

    #[tokio::test]
    async fn missing_token_is_an_error() {
        let (callback, seen) = recording();
        let provider = StaticTokenProvider::new("client-1", None).with_trace(callback);

        assert!(matches!(provider.token(&[]).await, Err(TokenError::Missing)));
        assert_eq!(seen.lock().unwrap().last().unwrap().0, AuthLogLevel::Error);
    }
}
