use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// No authentication session exists.
    #[error("No active session. Initiate a login first")]
    NoSession,

    /// The held session's lifetime has elapsed.
    #[error("Session expired. Initiate a new login")]
    SessionExpired,

    /// A session exists but the out-of-band login has not completed.
    #[error("Login not yet completed. Finish the login in your browser and poll again")]
    NotYetAuthenticated,

    /// The provider rejected the session credential (HTTP 401).
    #[error("Session rejected by the provider. Re-authentication required")]
    InvalidCredential,

    /// The provider refused the operation (HTTP 403).
    #[error("Permission denied by the provider")]
    PermissionDenied,

    /// Any other non-2xx provider response.
    #[error("Provider transport failure (status {0})")]
    Transport(u16),

    /// A network operation exceeded its deadline.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The remote endpoint could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The provider response did not match the expected envelope.
    #[error("Malformed provider response: {0}")]
    ResponseFormat(String),

    /// Authenticated decryption failed its tag check.
    #[error("Payload integrity verification failed")]
    Integrity,

    /// A durable-storage failure, assumed transient.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A request failed input validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or malformed configuration; fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An encryption error outside of tag verification.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// A serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Whether a retry without caller intervention is expected to succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Storage(_) | AppError::Timeout(_) | AppError::Connection(_)
        )
    }

    /// Whether this error means the caller must (re-)authenticate.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AppError::NoSession
                | AppError::SessionExpired
                | AppError::NotYetAuthenticated
                | AppError::InvalidCredential
        )
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(e: tokio_postgres::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        AppError::Storage(format!("pool checkout failed: {}", e))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AppError::Timeout(e.to_string())
        } else if e.is_connect() {
            AppError::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            AppError::Transport(status.as_u16())
        } else {
            AppError::Connection(e.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NoSession
            | AppError::SessionExpired
            | AppError::NotYetAuthenticated
            | AppError::InvalidCredential => {
                tracing::warn!("Authentication required: {}", self);
                (StatusCode::UNAUTHORIZED, self.to_string())
            }

            AppError::PermissionDenied => {
                tracing::warn!("Permission denied by provider");
                (StatusCode::FORBIDDEN, self.to_string())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Timeout(ref detail) => {
                tracing::warn!("Upstream timeout: {}", detail);
                (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out".to_string())
            }

            AppError::Transport(code) => {
                tracing::error!("Provider transport failure: status {}", code);
                (StatusCode::BAD_GATEWAY, "Provider unavailable".to_string())
            }

            AppError::Connection(ref detail) => {
                tracing::error!("Connection failure: {}", detail);
                (StatusCode::BAD_GATEWAY, "Provider unavailable".to_string())
            }

            AppError::ResponseFormat(ref detail) => {
                tracing::error!("Malformed provider response: {}", detail);
                (StatusCode::BAD_GATEWAY, "Unexpected provider response".to_string())
            }

            AppError::Integrity => {
                tracing::error!("Cache payload failed integrity verification");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Storage(ref detail) => {
                tracing::error!("Storage error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }

            AppError::Configuration(ref detail) => {
                tracing::error!("Configuration error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Encryption(ref detail) => {
                tracing::error!("Encryption error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "Encryption error".to_string())
            }

            AppError::Serialization(ref e) => {
                tracing::error!("Serialization error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::to_string(&serde_json::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification_covers_retryable_classes() {
        assert!(AppError::Storage("disconnect".into()).is_transient());
        assert!(AppError::Timeout("30s elapsed".into()).is_transient());
        assert!(AppError::Connection("refused".into()).is_transient());

        assert!(!AppError::InvalidCredential.is_transient());
        assert!(!AppError::ResponseFormat("bad envelope".into()).is_transient());
        assert!(!AppError::Transport(500).is_transient());
        assert!(!AppError::Integrity.is_transient());
    }

    #[test]
    fn auth_failures_are_grouped() {
        assert!(AppError::NoSession.is_auth_failure());
        assert!(AppError::SessionExpired.is_auth_failure());
        assert!(AppError::NotYetAuthenticated.is_auth_failure());
        assert!(AppError::InvalidCredential.is_auth_failure());
        assert!(!AppError::Timeout("x".into()).is_auth_failure());
    }
}
