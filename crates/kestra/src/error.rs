//! Error types for Kestra reconciliation.
//!
//! Errors are categorized so callers can tell user input mistakes from
//! remote failures, and so a "not found" answer can drive a state
//! transition instead of aborting the call.

use declarative::IdError;
use std::fmt;

/// Result type alias for Kestra operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller supplied something unusable (e.g. an import identifier).
    Input,
    /// A record is missing required fields or holds duplicates.
    Validation,
    /// The remote resource does not exist.
    NotFound,
    /// The remote API or the transport failed.
    Remote,
    /// A response or document could not be decoded.
    Format,
    /// Persisted state is inconsistent.
    Internal,
}

impl ErrorCategory {
    /// Whether the error was caused by what the user wrote.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Input | Self::Validation)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Input => "Invalid input",
            Self::Validation => "Invalid configuration",
            Self::NotFound => "Resource not found",
            Self::Remote => "Remote API failure",
            Self::Format => "Unexpected response format",
            Self::Internal => "Inconsistent state",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Input => "Check the identifier format, e.g. <namespace>/<flow_id>",
            Self::Validation => "Fix the declared record and try again",
            Self::NotFound => "Run a refresh to drop records deleted out of band",
            Self::Remote => "Check the server URL and that the server is reachable",
            Self::Format => "The server may run an incompatible version",
            Self::Internal => "Re-import the resource to repair the stored identifier",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while reconciling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied identifier could not be decoded.
    #[error("invalid import identifier: {0}")]
    InvalidImportId(#[source] IdError),

    /// A stored or computed identifier could not be encoded or decoded.
    #[error("identifier error: {0}")]
    Identifier(#[from] IdError),

    /// A record failed validation before any remote call.
    #[error("validation error: {0}")]
    Validation(String),

    /// The remote resource does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// Request path that answered 404.
        path: String,
    },

    /// Remote request failed.
    #[error("remote request failed: {message}")]
    Remote {
        /// HTTP status code if available.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// A YAML document could not be parsed or emitted.
    #[error("invalid YAML: {0}")]
    Yaml(String),
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a remote error.
    pub fn remote(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Remote {
            message: message.into(),
            status,
        }
    }

    /// Build the error for a failed request, mapping 404 to [`Error::NotFound`].
    pub fn from_status(path: &str, status: u16, message: impl Into<String>) -> Self {
        if status == 404 {
            Self::NotFound {
                path: path.to_string(),
            }
        } else {
            Self::remote(message, Some(status))
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidImportId(_) => ErrorCategory::Input,
            Error::Identifier(_) => ErrorCategory::Internal,
            Error::Validation(_) => ErrorCategory::Validation,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Remote { .. } => ErrorCategory::Remote,
            Error::InvalidResponse(_) | Error::Yaml(_) => ErrorCategory::Format,
        }
    }

    /// Whether the remote side reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. }
                | Error::Remote {
                    status: Some(404),
                    ..
                }
        )
    }

    /// HTTP status code associated with this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::NotFound { .. } => Some(404),
            Error::Remote { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::remote(format!("HTTP {code}"), Some(code)),
            other => Self::remote(other.to_string(), None),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}
