//! Mapping failures to a user message and a stable code.
//!
//! [`classify`] is pure: it reads the normalized [`RemoteError`] accessors in a
//! fixed precedence order and never performs side effects. The reporting,
//! toast and session-expiry effects live in [`ErrorHandler`].
//!
//! | Order | Condition | Code |
//! |-------|-----------|------|
//! | 1 | cancelled, or trace contains an extension marker | suppressed |
//! | 2 | status 401 or code `PGRST301` | `AUTH_SESSION_EXPIRED` |
//! | 3 | status 403, payload/service code 403, or `permission error` | `AUTH_FORBIDDEN` |
//! | 4 | status 404 | `RESOURCE_NOT_FOUND` |
//! | 5 | code `PGRST401` | `AUTH_ERROR` |
//! | 6 | own message | own code or `UNKNOWN_ERROR` |
//! | 7 | anything else | none |
//!
//! [`RemoteError`]: crate::types::RemoteError

use core::fmt;

use crate::suppression::SuppressionPolicy;
use crate::types::Failure;

mod handler;

pub use handler::{handle_auth_session_expired, ErrorHandler};

/// Backend code for an expired JWT session.
pub const SESSION_EXPIRED_CODE: &str = "PGRST301";

/// Backend code for a rejected authentication.
pub const AUTH_FAILED_CODE: &str = "PGRST401";

pub const SESSION_EXPIRED_MESSAGE: &str = "Votre session a expiré. Veuillez vous reconnecter.";
pub const FORBIDDEN_MESSAGE: &str =
    "Vous n'avez pas les droits nécessaires pour effectuer cette action.";
pub const NOT_FOUND_MESSAGE: &str = "La ressource demandée n'a pas été trouvée.";
pub const AUTH_ERROR_MESSAGE: &str = "Erreur d'authentification. Veuillez vous reconnecter.";
pub const GENERIC_MESSAGE: &str = "Une erreur s'est produite. Veuillez réessayer plus tard.";

/// Stable error code handed to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AuthSessionExpired,
    AuthForbidden,
    ResourceNotFound,
    AuthError,
    /// The failure's own code, passed through.
    Own(String),
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AuthSessionExpired => "AUTH_SESSION_EXPIRED",
            Self::AuthForbidden => "AUTH_FORBIDDEN",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::AuthError => "AUTH_ERROR",
            Self::Own(code) => code,
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Whether the user must sign in again.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, Self::AuthSessionExpired | Self::AuthError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message and code resolved for a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub message: String,
    pub code: Option<ErrorCode>,
}

impl Classification {
    fn new(message: impl Into<String>, code: Option<ErrorCode>) -> Self {
        Self { message: message.into(), code }
    }

    pub fn code_str(&self) -> Option<&str> {
        self.code.as_ref().map(ErrorCode::as_str)
    }
}

/// Result of classifying a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Third-party noise or a cancelled operation: show nothing, report nothing.
    Suppressed,
    Classified(Classification),
}

impl Verdict {
    /// Whether the UI should treat this as an error.
    #[inline]
    pub fn occurred(&self) -> bool {
        matches!(self, Self::Classified(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Classified(c) => Some(&c.message),
            Self::Suppressed => None,
        }
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            Self::Classified(c) => c.code.as_ref(),
            Self::Suppressed => None,
        }
    }

    pub fn classification(&self) -> Option<&Classification> {
        match self {
            Self::Classified(c) => Some(c),
            Self::Suppressed => None,
        }
    }
}

/// Classifies a failure.
///
/// `custom_message` replaces the generic fallback message; a failure that
/// carries its own message still displays that message.
///
/// # Examples
///
/// ```
/// use voisin_rail::classify::{classify, ErrorCode, Verdict};
/// use voisin_rail::{Failure, ServiceError, SuppressionPolicy};
///
/// let policy = SuppressionPolicy::with_builtin();
/// let failure = Failure::from(ServiceError::new("gone").with_status(404));
///
/// let verdict = classify(&failure, None, &policy);
/// assert_eq!(verdict.code(), Some(&ErrorCode::ResourceNotFound));
/// ```
pub fn classify(
    failure: &Failure,
    custom_message: Option<&str>,
    policy: &SuppressionPolicy,
) -> Verdict {
    if failure.is_cancelled() || failure.traces().any(|trace| policy.is_extension_trace(trace)) {
        return Verdict::Suppressed;
    }

    let error = failure.error();
    let status = error.status();
    let code = error.code();

    let classification = if status == Some(401) || code == Some(SESSION_EXPIRED_CODE) {
        Classification::new(SESSION_EXPIRED_MESSAGE, Some(ErrorCode::AuthSessionExpired))
    } else if status == Some(403)
        || error.payload_code() == Some(403)
        || code == Some("403")
        || error.is_permission_sentinel()
    {
        Classification::new(FORBIDDEN_MESSAGE, Some(ErrorCode::AuthForbidden))
    } else if status == Some(404) {
        Classification::new(NOT_FOUND_MESSAGE, Some(ErrorCode::ResourceNotFound))
    } else if code == Some(AUTH_FAILED_CODE) {
        Classification::new(AUTH_ERROR_MESSAGE, Some(ErrorCode::AuthError))
    } else {
        let own_message = error.message();
        if own_message.is_empty() {
            Classification::new(custom_message.unwrap_or(GENERIC_MESSAGE), None)
        } else {
            let code = code.map_or(ErrorCode::Unknown, |c| ErrorCode::Own(c.to_owned()));
            Classification::new(own_message, Some(code))
        }
    };

    Verdict::Classified(classification)
}
