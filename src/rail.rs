//! The composition root of the resilience layer.
//!
//! A [`Rail`] owns the [`Telemetry`] handle and the [`SuppressionPolicy`] and
//! is cloned into every component that reports: the result wrappers, the
//! classifier, the global capture and the backend client.

use core::future::Future;

use serde::Serialize;

use crate::async_ext::{SafeCallFuture, SafeFuture};
use crate::suppression::SuppressionPolicy;
use crate::telemetry::{EventId, Telemetry, TelemetryConfig};
use crate::types::{Envelope, Failure, Level, Outcome, ReportContext};

/// Where a failure entered the wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureOrigin {
    /// A plain operation wrapped with [`Rail::safe`].
    Operation,
    /// An envelope carrying a service error.
    Service,
    /// A call that failed before producing an envelope.
    Unhandled,
}

impl FailureOrigin {
    fn error_type(self) -> Option<&'static str> {
        match self {
            Self::Operation => None,
            Self::Service => Some("service_error"),
            Self::Unhandled => Some("unhandled_exception"),
        }
    }
}

/// Shared telemetry handle plus suppression policy.
///
/// # Examples
///
/// ```
/// use voisin_rail::{Failure, Rail};
///
/// # tokio_test_block(async {
/// let rail = Rail::default();
/// let outcome: Result<u32, Failure> =
///     rail.safe(async { Err::<u32, _>(Failure::msg("x")) }, "chargement").await;
///
/// assert_eq!(outcome.unwrap_err().message(), "x");
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Rail {
    telemetry: Telemetry,
    policy: SuppressionPolicy,
}

impl Default for Rail {
    /// Disabled telemetry with the built-in suppression patterns.
    fn default() -> Self {
        Self::new(Telemetry::disabled(), SuppressionPolicy::with_builtin())
    }
}

impl Rail {
    pub fn new(telemetry: Telemetry, policy: SuppressionPolicy) -> Self {
        Self { telemetry, policy }
    }

    /// Initializes telemetry from configuration with the built-in policy.
    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(Telemetry::init(config), SuppressionPolicy::with_builtin())
    }

    #[inline]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    #[inline]
    pub fn policy(&self) -> &SuppressionPolicy {
        &self.policy
    }

    /// Whether a failure comes from an extension trace.
    pub fn is_extension_noise(&self, failure: &Failure) -> bool {
        failure.traces().any(|trace| self.policy.is_extension_trace(trace))
    }

    /// Sends a failure to telemetry unless it is extension noise or a
    /// cancellation.
    pub fn report(&self, failure: &Failure, context: &ReportContext) -> Option<EventId> {
        if failure.is_cancelled() {
            tracing::debug!(error = %failure, "cancelled operation not reported");
            return None;
        }
        if self.is_extension_noise(failure) {
            tracing::warn!(error = %failure, "extension error ignored");
            return None;
        }
        self.telemetry.capture_exception(failure, context)
    }

    /// Awaits `future`, reporting and returning its failure if it fails.
    ///
    /// Each failure is logged with `context`, labelled with it, and reported
    /// once tagged `errorContext = <context>`.
    pub fn safe<Fut, T, E>(&self, future: Fut, context: impl Into<String>) -> SafeFuture<Fut>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        SafeFuture::new(future, self.clone(), context.into())
    }

    /// Awaits a backend call resolving to an [`Envelope`].
    ///
    /// Transport failures and service-reported errors both come back as
    /// `Err(failure)`; only their telemetry tags differ.
    pub fn safe_call<Fut, T, E>(
        &self,
        future: Fut,
        context: impl Into<String>,
    ) -> SafeCallFuture<Fut>
    where
        Fut: Future<Output = Result<Envelope<T>, E>>,
        E: Into<Failure>,
    {
        SafeCallFuture::new(future, self.clone(), context.into())
    }

    /// Runs `handler(args)`, reporting a failure with the serialized arguments
    /// as extra data. The failure is still returned to the caller.
    pub async fn safe_handler<A, F, Fut, T, E>(
        &self,
        context: &str,
        args: A,
        handler: F,
    ) -> Outcome<T>
    where
        A: Serialize,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        let arguments = serde_json::to_string(&args).unwrap_or_default();
        match handler(args).await {
            Ok(value) => Ok(value),
            Err(err) => {
                let failure = err.into().with_context(context);
                tracing::error!(context, error = %failure, "handler failed");
                let report = ReportContext::new()
                    .tag("errorContext", context)
                    .extra("arguments", arguments)
                    .level(Level::Error);
                self.report(&failure, &report);
                Err(failure)
            },
        }
    }

    pub(crate) fn record_failure(&self, failure: &Failure, context: &str, origin: FailureOrigin) {
        match origin {
            FailureOrigin::Operation => {
                tracing::error!(context, error = %failure, "operation failed");
            },
            FailureOrigin::Service => {
                tracing::error!(context, error = %failure, "service error ({context})");
            },
            FailureOrigin::Unhandled => {
                tracing::error!(context, error = %failure, "unhandled exception in {context}");
            },
        }

        let report = ReportContext::new()
            .tag("errorContext", context)
            .tag_opt("errorType", origin.error_type())
            .level(Level::Error);
        self.report(failure, &report);
    }
}
