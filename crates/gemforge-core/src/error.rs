//! Error types for Gemforge

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Normalized category of a failed provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    /// Credentials missing, wrong or lacking permission
    Unauthorized,
    /// Provider throttled the request
    RateLimited,
    /// Provider rejected the payload (bad prompt, bad locator, ...)
    InvalidRequest,
    /// Provider unreachable, timed out or failing server-side
    Unavailable,
    /// Provider answered but the body was not what the endpoint promises
    MalformedResponse,
}

impl ServiceErrorKind {
    /// Map an HTTP status code to an error kind.
    ///
    /// Only meaningful for non-2xx codes.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ServiceErrorKind::Unauthorized,
            429 => ServiceErrorKind::RateLimited,
            400..=499 => ServiceErrorKind::InvalidRequest,
            _ => ServiceErrorKind::Unavailable,
        }
    }

    /// Short advice on what the caller has to change
    pub fn hint(&self) -> &'static str {
        match self {
            ServiceErrorKind::Unauthorized => "check the provider API key",
            ServiceErrorKind::RateLimited => "wait before retrying this stage",
            ServiceErrorKind::InvalidRequest => "edit the input and retry this stage",
            ServiceErrorKind::Unavailable => "the provider is unreachable, retry later",
            ServiceErrorKind::MalformedResponse => {
                "the provider returned an unexpected response, retry or report it"
            }
        }
    }
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceErrorKind::Unauthorized => write!(f, "unauthorized"),
            ServiceErrorKind::RateLimited => write!(f, "rate limited"),
            ServiceErrorKind::InvalidRequest => write!(f, "invalid request"),
            ServiceErrorKind::Unavailable => write!(f, "unavailable"),
            ServiceErrorKind::MalformedResponse => write!(f, "malformed response"),
        }
    }
}

/// A failed call to an external generation provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::MalformedResponse, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Unavailable, message)
    }

    /// Build an error from a non-2xx HTTP status and (possibly empty) body
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, body)
        };
        Self::new(ServiceErrorKind::from_status(status), message)
    }
}

/// The main error type for Gemforge operations
#[derive(Debug, Error)]
pub enum GemforgeError {
    #[error("Service error: {0} ({hint})", hint = .0.kind.hint())]
    Service(#[from] ServiceError),

    #[error("Session code missing from the 3D reconstruction response")]
    SessionCodeMissing,

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),
}

impl GemforgeError {
    /// True only for conditions the caller should simply poll again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GemforgeError::ArtifactNotFound(_))
    }

    /// The provider error kind, if this came from a provider
    pub fn service_kind(&self) -> Option<ServiceErrorKind> {
        match self {
            GemforgeError::Service(e) => Some(e.kind),
            _ => None,
        }
    }
}

/// Result type alias for Gemforge operations
pub type Result<T> = std::result::Result<T, GemforgeError>;

impl From<toml::de::Error> for GemforgeError {
    fn from(err: toml::de::Error) -> Self {
        GemforgeError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for GemforgeError {
    fn from(err: toml::ser::Error) -> Self {
        GemforgeError::TomlSerError(err.to_string())
    }
}
