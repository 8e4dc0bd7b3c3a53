//! Error types for the Ioverse client.

use crate::account::ValidationErrors;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Discriminant for [`IoverseError`].
///
/// Callers branch on the kind instead of inspecting payload shapes, so the
/// backend's error body is decoded exactly once at the pipeline boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authentication,
    TransientNetwork,
    Validation,
    Http,
    StreamTransport,
    Serialization,
    Io,
    Config,
    NotFound,
    Internal,
}

/// A shared error type for the entire client.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum IoverseError {
    /// No valid refresh path remains; the user has to log in again.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The request never reached the server (timeout, refused, aborted).
    #[error("Network error: {message}")]
    TransientNetwork { message: String },

    /// Structured per-field errors returned by the backend.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The server-push stream dropped or could not be opened.
    #[error("Stream transport error: {0}")]
    StreamTransport(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IoverseError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::TransientNetwork {
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::StreamTransport(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Returns the discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::TransientNetwork { .. } => ErrorKind::TransientNetwork,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Http { .. } => ErrorKind::Http,
            Self::StreamTransport(_) => ErrorKind::StreamTransport,
            Self::Serialization { .. } => ErrorKind::Serialization,
            Self::Io { .. } => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if the caller must force a fresh login.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Check if the server rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// Check if the failure happened before reaching the server.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Http { status: 404, .. })
    }

    /// Field errors, when the backend returned any.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Text suitable for a toast or alert.
    pub fn user_message(&self) -> String {
        let message = match self {
            Self::TransientNetwork { .. } => {
                "Could not reach the server. Please try again.".to_string()
            }
            Self::Validation(errors) => errors.to_string(),
            Self::Http { message, .. } => message.clone(),
            Self::Authentication(message)
            | Self::StreamTransport(message)
            | Self::Internal(message)
            | Self::Config(message) => message.clone(),
            other => other.to_string(),
        };

        if message.trim().is_empty() {
            "Something went wrong. Please try again later.".to_string()
        } else {
            message
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for IoverseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for IoverseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for IoverseError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for IoverseError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<ValidationErrors> for IoverseError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// A type alias for `Result<T, IoverseError>`.
pub type Result<T> = std::result::Result<T, IoverseError>;
