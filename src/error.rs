//! Error types for Devassist
//!
//! Two families live here: [`DevassistError`] covers local failures
//! (configuration, terminal, I/O), and [`ApiError`] is the classified
//! failure every backend call is normalized into.

use thiserror::Error;

/// Code attached to HTTP failures whose body could not be decoded
pub const HTTP_ERROR: &str = "HTTP_ERROR";

/// Code attached to every failure where the backend could not be reached
/// or its response could not be decoded
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";

/// User-facing message for network-classified failures
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error: unable to reach the assistant service. Check your connection and try again.";

/// Main error type for local Devassist operations
#[derive(Error, Debug)]
pub enum DevassistError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Line editor errors
    #[error("Terminal error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

/// A backend failure normalized into one of two classes
///
/// `Http` means the backend answered with a non-success status, so it is
/// reachable. `Network` means it could not be reached or its answer could
/// not be decoded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Backend responded with a non-success HTTP status
    #[error("{message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Backend-supplied or status-derived message
        message: String,
        /// Backend-supplied code, or [`HTTP_ERROR`]
        code: String,
        /// Optional structured details from the error body
        details: Option<serde_json::Value>,
    },

    /// Backend unreachable or response undecodable
    #[error("{message}")]
    Network {
        /// Fixed user-facing message
        message: String,
        /// Underlying transport or decode failure, for logs
        cause: String,
    },
}

impl ApiError {
    /// Build a network-classified error from any underlying cause
    ///
    /// # Examples
    ///
    /// ```
    /// use devassist::error::{ApiError, NETWORK_ERROR};
    ///
    /// let err = ApiError::network("connection refused");
    /// assert_eq!(err.code(), NETWORK_ERROR);
    /// assert!(err.is_network());
    /// ```
    pub fn network(cause: impl std::fmt::Display) -> Self {
        Self::Network {
            message: NETWORK_ERROR_MESSAGE.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Build an HTTP error for a status whose body could not be decoded
    pub fn http_status(status: u16) -> Self {
        Self::Http {
            status,
            message: format!("Request failed with HTTP status {}", status),
            code: HTTP_ERROR.to_string(),
            details: None,
        }
    }

    /// The classification code (`HTTP_ERROR`, `NETWORK_ERROR`, or a
    /// backend-supplied code)
    pub fn code(&self) -> &str {
        match self {
            Self::Http { code, .. } => code,
            Self::Network { .. } => NETWORK_ERROR,
        }
    }

    /// The human-readable message
    pub fn message(&self) -> &str {
        match self {
            Self::Http { message, .. } | Self::Network { message, .. } => message,
        }
    }

    /// Whether this failure means the backend is unreachable
    ///
    /// Classification is by code, so an HTTP error body that itself
    /// reports `NETWORK_ERROR` counts as a network failure too.
    pub fn is_network(&self) -> bool {
        self.code() == NETWORK_ERROR
    }
}

/// Result type alias for Devassist application operations
///
/// Uses `anyhow::Error` so handlers can attach context freely; the API
/// layer uses [`crate::api::ApiResult`] instead so callers can match on
/// the classification.
pub type Result<T> = anyhow::Result<T>;
