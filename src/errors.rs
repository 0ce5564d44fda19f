//! Unified error types and result handling.
//!
//! Every layer returns [`Result`]; the web layer turns an [`Error`] into a JSON
//! response through its `IntoResponse` implementation.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// Rejected user input
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// A record that should exist could not be found
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Display name of the record kind
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// An account with this email already exists
    #[error("An account with email '{email}' already exists")]
    DuplicateEmail {
        /// The conflicting email address
        email: String,
    },

    /// Missing, expired or wrong credentials
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Reason shown to the caller
        message: String,
    },

    /// Authenticated, but the role may not perform the action
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Reason shown to the caller
        message: String,
    },

    /// The hosted table service rejected a request
    #[error("Table service error ({status}): {message}")]
    TableService {
        /// HTTP status returned by the service
        status: u16,
        /// Message extracted from the service response
        message: String,
    },

    /// The hosted image service rejected an upload
    #[error("Image service error: {message}")]
    ImageService {
        /// Message extracted from the service response
        message: String,
    },

    /// A mail transport failed
    #[error("Mail delivery error: {message}")]
    Mail {
        /// Transport failure description
        message: String,
    },

    /// Password hashing or verification failed internally
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Failure description from the hasher
        message: String,
    },

    /// An internal task failed unexpectedly
    #[error("Internal error: {message}")]
    Internal {
        /// Failure description
        message: String,
    },

    /// Template rendering failed
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Transport-level HTTP failure
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse failure
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable lookup failure
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Shorthand for an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Whether a table service failure reads like a uniqueness violation.
    ///
    /// The hosted table service has no unique constraints of its own, but
    /// automations on the base may reject duplicates with a plain message.
    #[must_use]
    pub fn is_duplicate_failure(&self) -> bool {
        match self {
            Self::TableService { message, .. } => {
                let lower = message.to_lowercase();
                lower.contains("duplicate") || lower.contains("already exists")
            }
            _ => false,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::DuplicateEmail { .. } => StatusCode::CONFLICT,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::TableService { .. } | Self::ImageService { .. } | Self::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            match status {
                StatusCode::BAD_GATEWAY => {
                    "An upstream service failed. Please try again.".to_string()
                }
                _ => "Something went wrong. Please try again.".to_string(),
            }
        } else {
            tracing::debug!(error = %self, "Request rejected");
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_failure_detection_matches_substrings() {
        let dup = Error::TableService {
            status: 422,
            message: "Record with this email ALREADY EXISTS".to_string(),
        };
        assert!(dup.is_duplicate_failure());

        let dup2 = Error::TableService {
            status: 422,
            message: "Duplicate value for field email".to_string(),
        };
        assert!(dup2.is_duplicate_failure());

        let other = Error::TableService {
            status: 422,
            message: "Unknown field name: \"foo\"".to_string(),
        };
        assert!(!other.is_duplicate_failure());
        assert!(!Error::validation("duplicate").is_duplicate_failure());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::NotFound {
                entity: "Item",
                id: "rec1".to_string()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::DuplicateEmail {
                email: "a@b.c".to_string()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::ImageService {
                message: "x".to_string()
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::Config {
                message: "x".to_string()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
