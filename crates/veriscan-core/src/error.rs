//! Error types module
//!
//! All errors are unified under the `AppError` enum, which carries the error
//! taxonomy for the whole workspace: configuration errors are fatal to their
//! operation, remote errors are transient and retryable, terminal remote
//! statuses are neither, and authentication failures never crash ingestion.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature so client-side crates can build without the database stack.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like transient remote failures
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// This trait allows errors to self-describe their HTTP response characteristics.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "REMOTE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    /// Transient remote failure (network error, remote 5xx). Safe to retry.
    #[error("Remote service error: {0}")]
    Remote(String),

    /// The remote service reported an unrecoverable status for a submission.
    /// Distinct from `Remote`: retrying will not help.
    #[error("Remote service rejected submission: {0}")]
    RemoteTerminal(String),

    /// Missing or invalid local configuration (webhook registration, secrets,
    /// daemon prerequisites). Fatal to the operation, never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested lifecycle transition is not valid from the document's
    /// current state. No state was mutated.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The acting user or the submission still needs to accept the current
    /// EULA version before unattended actions are allowed.
    #[error("EULA confirmation required: {0}")]
    EulaRequired(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::Database(_) => (500, "DATABASE_ERROR", true, LogLevel::Error),
        AppError::Remote(_) => (502, "REMOTE_ERROR", true, LogLevel::Warn),
        AppError::RemoteTerminal(_) => (502, "REMOTE_TERMINAL", false, LogLevel::Warn),
        AppError::Configuration(_) => (500, "CONFIGURATION_ERROR", false, LogLevel::Error),
        AppError::Unauthorized(_) => (401, "UNAUTHORIZED", false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::InvalidTransition(_) => (409, "INVALID_TRANSITION", false, LogLevel::Debug),
        AppError::EulaRequired(_) => (403, "EULA_REQUIRED", false, LogLevel::Debug),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl AppError {
    /// Get detailed error information including the source chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Remote(_) => "Similarity service is temporarily unavailable".to_string(),
            AppError::RemoteTerminal(ref msg) => msg.clone(),
            AppError::Configuration(_) => "Integration is not configured".to_string(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::InvalidTransition(ref msg) => msg.clone(),
            AppError::EulaRequired(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_remote() {
        let err = AppError::Remote("connection reset".to_string());
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.error_code(), "REMOTE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_remote_terminal_is_not_recoverable() {
        let err = AppError::RemoteTerminal("submission failed virus scan".to_string());
        assert!(!err.is_recoverable());
        assert_eq!(err.error_code(), "REMOTE_TERMINAL");
        assert_eq!(
            err.client_message(),
            "submission failed virus scan".to_string()
        );
    }

    #[test]
    fn test_error_metadata_configuration() {
        let err = AppError::Configuration("tenant has no webhook secret".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Error);
        assert_eq!(err.client_message(), "Integration is not configured");
    }

    #[test]
    fn test_error_metadata_eula_required() {
        let err = AppError::EulaRequired("EULA v2 must be accepted".to_string());
        assert_eq!(err.http_status_code(), 403);
        assert_eq!(err.error_code(), "EULA_REQUIRED");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let source = anyhow::anyhow!("root cause").context("middle layer");
        let err = AppError::InternalWithSource {
            message: "outer".to_string(),
            source,
        };
        let details = err.detailed_message();
        assert!(details.contains("Caused by: middle layer"));
        assert!(details.contains("Caused by: root cause"));
    }
}
