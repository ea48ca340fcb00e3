//! Telemetry sink adapter.
//!
//! [`Telemetry`] is the only path by which reports leave the process. It holds
//! an optional [`TelemetrySink`]; without one every call degrades to a local
//! `tracing` record. Sink failures, including panics, never reach the caller.
//!
//! # Examples
//!
//! ```
//! use voisin_rail::{Failure, ReportContext, Telemetry};
//!
//! let telemetry = Telemetry::disabled();
//! let id = telemetry.capture_exception(&Failure::msg("boom"), &ReportContext::new());
//! assert!(id.is_none());
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Failure, Level, ReportContext};

mod dsn;
mod http;

pub use dsn::{is_placeholder, Dsn, DsnError};
pub use http::HttpSink;

/// Identifier assigned to a submitted event.
pub type EventId = String;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("telemetry transport failed: {0}")]
    Transport(String),
    #[error("telemetry sink rejected the event: {0}")]
    Rejected(String),
}

/// Destination for exception and message reports.
pub trait TelemetrySink: Send + Sync {
    fn capture_exception(
        &self,
        failure: &Failure,
        context: &ReportContext,
    ) -> Result<EventId, SinkError>;

    fn capture_message(&self, message: &str, context: &ReportContext)
        -> Result<EventId, SinkError>;

    /// Associates subsequent reports with a user, or clears it.
    fn set_user(&self, user: Option<TelemetryUser>);
}

/// The only user fields ever forwarded to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryUser {
    pub id: String,
    pub username: Option<String>,
}

/// Anything that can be associated with reports.
///
/// Only the identifier and a username (falling back to the email) are read.
pub trait UserIdentity {
    fn id(&self) -> &str;

    fn username(&self) -> Option<&str> {
        None
    }

    fn email(&self) -> Option<&str> {
        None
    }
}

impl TelemetryUser {
    /// Redacts an identity down to `{ id, username }`.
    pub fn redact<U: UserIdentity + ?Sized>(user: &U) -> Self {
        Self {
            id: user.id().to_owned(),
            username: user.username().or_else(|| user.email()).map(str::to_owned),
        }
    }
}

/// Telemetry settings read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub dsn: Option<String>,
    pub environment: String,
    pub release: Option<String>,
}

/// Handle used by every capture point.
#[derive(Clone, Default)]
pub struct Telemetry {
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl core::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Telemetry").field("enabled", &self.is_enabled()).finish()
    }
}

impl Telemetry {
    /// A handle that only logs locally.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// A handle backed by the given sink.
    pub fn with_sink(sink: Arc<dyn TelemetrySink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Builds the HTTP sink from configuration.
    ///
    /// Returns a disabled handle when the DSN is missing, looks like a
    /// placeholder, or does not parse.
    pub fn init(config: &TelemetryConfig) -> Self {
        let Some(raw) = config.dsn.as_deref().filter(|dsn| !is_placeholder(dsn)) else {
            tracing::warn!("telemetry DSN missing or placeholder; error tracking disabled");
            return Self::disabled();
        };

        match HttpSink::new(raw, config) {
            Ok(sink) => {
                tracing::info!(environment = %config.environment, "telemetry initialized");
                Self::with_sink(Arc::new(sink))
            },
            Err(err) => {
                tracing::error!(
                    error = %err,
                    "telemetry initialization failed; error tracking disabled"
                );
                Self::disabled()
            },
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Reports a failure. Returns the event id when a sink accepted it.
    pub fn capture_exception(&self, failure: &Failure, context: &ReportContext) -> Option<EventId> {
        let Some(sink) = &self.sink else {
            tracing::error!(
                error = %failure,
                tags = ?context.tags(),
                "error captured (telemetry disabled)"
            );
            return None;
        };

        let submitted = catch_unwind(AssertUnwindSafe(|| sink.capture_exception(failure, context)));
        settle(submitted)
    }

    /// Reports a message. Empty messages are ignored.
    pub fn capture_message(&self, message: &str, context: &ReportContext) -> Option<EventId> {
        if message.is_empty() {
            return None;
        }
        let Some(sink) = &self.sink else {
            log_local_message(message, context.get_level());
            return None;
        };

        let submitted = catch_unwind(AssertUnwindSafe(|| sink.capture_message(message, context)));
        settle(submitted)
    }

    /// Associates reports with a user, forwarding only `{ id, username }`.
    pub fn set_user<U: UserIdentity + ?Sized>(&self, user: Option<&U>) {
        let Some(sink) = &self.sink else {
            return;
        };
        let redacted = user.map(TelemetryUser::redact);
        if catch_unwind(AssertUnwindSafe(|| sink.set_user(redacted))).is_err() {
            tracing::debug!("telemetry sink panicked while setting user");
        }
    }
}

fn settle(submitted: std::thread::Result<Result<EventId, SinkError>>) -> Option<EventId> {
    match submitted {
        Ok(Ok(id)) => Some(id),
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "telemetry submission dropped");
            None
        },
        Err(_) => {
            tracing::debug!("telemetry sink panicked; submission dropped");
            None
        },
    }
}

fn log_local_message(message: &str, level: Level) {
    match level {
        Level::Fatal | Level::Error => {
            tracing::error!(text = message, "message captured (telemetry disabled)");
        },
        Level::Warning => tracing::warn!(text = message, "message captured (telemetry disabled)"),
        Level::Info => tracing::info!(text = message, "message captured (telemetry disabled)"),
        Level::Debug => tracing::debug!(text = message, "message captured (telemetry disabled)"),
    }
}
