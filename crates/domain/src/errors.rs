//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for focusmode
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum FocusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    /// The remote store answered but rejected the request (validation,
    /// permissions on a row, malformed document).
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The backend has not finished (or failed) its bootstrap.
    #[error("Sync unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// How the orchestrator should treat a failed sync operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// Transient or environmental; the session keeps running and a later
    /// attempt may succeed.
    Recoverable,
    /// Caller bug or broken setup; retrying cannot help.
    Fatal,
}

impl FocusError {
    /// Classify this error for retry and reporting decisions.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Network(_)
            | Self::Auth(_)
            | Self::Backend(_)
            | Self::NotFound(_)
            | Self::Unavailable(_) => ErrorSeverity::Recoverable,
            Self::Config(_) | Self::Serialization(_) | Self::InvalidInput(_) | Self::Internal(_) => {
                ErrorSeverity::Fatal
            }
        }
    }

    /// Stable label suitable for structured logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::Backend(_) => "backend",
            Self::Serialization(_) => "serialization",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }

    /// Shorthand for the precondition failure raised when a load or save is
    /// attempted without a user id.
    pub fn missing_user_id() -> Self {
        Self::InvalidInput("user id must not be empty".into())
    }
}

impl From<serde_json::Error> for FocusError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for focusmode operations
pub type Result<T> = std::result::Result<T, FocusError>;
