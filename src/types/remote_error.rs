//! Normalized shape of every failure coming back from a remote call.
//!
//! The backend reports errors in several shapes: an HTTP status, a PostgREST
//! error body (`code`, `message`, `details`, `hint`), a nested payload code, or
//! a plain message. [`RemoteError`] captures each origin as its own variant so
//! that classification can match on it instead of probing optional fields.

use core::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exact message used by the backend and some browser integrations to signal a
/// permission refusal outside of the HTTP status channel.
pub const PERMISSION_SENTINEL: &str = "permission error";

/// Error body returned by the backend inside a `{ data, error }` envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    /// Backend error code such as `PGRST301` or `42P01`.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    /// HTTP status the body arrived with, when known.
    #[serde(skip)]
    pub status: Option<u16>,
    /// Numeric code nested in the payload (`data.code`), when present.
    #[serde(skip)]
    pub payload_code: Option<u16>,
}

impl ServiceError {
    /// Creates a service error with a message and no code.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    /// Sets the backend error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the HTTP status the error arrived with.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the numeric payload code.
    #[must_use]
    pub fn with_payload_code(mut self, code: u16) -> Self {
        self.payload_code = Some(code);
        self
    }
}

impl core::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ServiceError {}

/// A failure observed at the remote-call boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The request never produced a response (DNS, connection, TLS, body read).
    #[error("network failure: {message}")]
    Transport { message: String },
    /// The call was raced against a fixed delay and lost.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    /// A non-success HTTP response whose body was not a service error.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, code: Option<String>, message: String },
    /// The backend answered with an error envelope.
    #[error("service error: {0}")]
    Service(ServiceError),
    /// The fixed permission sentinel raised outside of HTTP.
    #[error("permission error")]
    Permission,
    /// The caller cancelled the operation before its result was committed.
    #[error("operation cancelled")]
    Cancelled,
    /// Anything else, typically a local error converted at a boundary.
    #[error("{message}")]
    Other { code: Option<String>, message: String },
}

impl RemoteError {
    /// Creates an [`RemoteError::Other`] from a message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other { code: None, message: message.into() }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Service(err) => err.status,
            _ => None,
        }
    }

    /// Backend or local error code, if any.
    ///
    /// Transport failures and timeouts report `NETWORK_ERROR` and `TIMEOUT`.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Transport { .. } => Some("NETWORK_ERROR"),
            Self::Timeout(_) => Some("TIMEOUT"),
            Self::Http { code, .. } | Self::Other { code, .. } => code.as_deref(),
            Self::Service(err) => err.code.as_deref(),
            Self::Permission => None,
            Self::Cancelled => Some("CANCELLED"),
        }
    }

    /// Numeric code nested in the payload, if any.
    pub fn payload_code(&self) -> Option<u16> {
        match self {
            Self::Service(err) => err.payload_code,
            _ => None,
        }
    }

    /// Message suitable for display.
    ///
    /// Transport failures and timeouts are rewritten into connectivity-oriented
    /// messages; the raw detail stays available through `Display`.
    pub fn message(&self) -> String {
        match self {
            Self::Transport { .. } => {
                "Impossible de joindre le serveur. Vérifiez votre connexion Internet.".to_owned()
            },
            Self::Timeout(after) if after.is_zero() => "Délai d'attente dépassé".to_owned(),
            Self::Timeout(after) => {
                format!("Délai d'attente dépassé après {} secondes", after.as_secs())
            },
            Self::Http { message, .. } | Self::Other { message, .. } => message.clone(),
            Self::Service(err) => err.message.clone(),
            Self::Permission => PERMISSION_SENTINEL.to_owned(),
            Self::Cancelled => String::new(),
        }
    }

    /// Whether the message is exactly the permission sentinel.
    pub fn is_permission_sentinel(&self) -> bool {
        match self {
            Self::Permission => true,
            Self::Http { message, .. } | Self::Other { message, .. } => {
                message == PERMISSION_SENTINEL
            },
            Self::Service(err) => err.message == PERMISSION_SENTINEL,
            _ => false,
        }
    }

    /// Whether the failure happened before any response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout(_))
    }
}

impl From<ServiceError> for RemoteError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl From<reqwest::Error> for RemoteError {
    /// A timed-out request carries no duration; it maps to `Timeout(Duration::ZERO)`.
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Http { status: status.as_u16(), code: None, message: err.to_string() };
        }
        if err.is_timeout() {
            Self::Timeout(Duration::ZERO)
        } else if err.is_decode() {
            Self::Other { code: Some("DECODE_ERROR".to_owned()), message: err.to_string() }
        } else {
            Self::Transport { message: err.to_string() }
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Other { code: Some("DECODE_ERROR".to_owned()), message: err.to_string() }
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(err: std::io::Error) -> Self {
        Self::other(err.to_string())
    }
}
