//! Backstop for failures that escaped every wrapper.
//!
//! Two listeners feed [`GlobalCapture`]:
//!
//! - **Unhandled rejections**: a task started with [`GlobalCapture::spawn`]
//!   returns `Err(failure)` and nobody is left to consume it.
//! - **Uncaught errors**: a panic anywhere in the process, routed through the
//!   hook set by [`GlobalCapture::install`].
//!
//! Each event is matched case-insensitively against the shared
//! [`SuppressionPolicy`]. A match stops the event silently apart from a
//! warning. Anything else is logged and reported, unless a previous capture
//! point already marked the failure as handled.
//!
//! [`SuppressionPolicy`]: crate::suppression::SuppressionPolicy

use core::future::Future;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;

use crate::rail::Rail;
use crate::telemetry::EventId;
use crate::types::{Failure, Level, Outcome, ReportContext};

/// Message sent to telemetry once capture is installed.
pub const APP_START_MESSAGE: &str = "Application démarrée";

static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("global capture is already installed")]
    AlreadyInstalled,
}

/// What a listener did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Matched the ignore-list.
    Suppressed { pattern: String },
    /// Logged and sent to telemetry. Holds the event id when a sink accepted it.
    Reported(Option<EventId>),
    /// Logged only; an earlier capture point already reported it.
    AlreadyHandled,
}

impl Disposition {
    #[inline]
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed { .. })
    }
}

/// A failure nobody consumed.
#[derive(Debug)]
pub struct RejectionEvent {
    failure: Failure,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl RejectionEvent {
    pub fn new(failure: Failure) -> Self {
        Self { failure, default_prevented: false, propagation_stopped: false }
    }

    #[inline]
    pub fn failure(&self) -> &Failure {
        &self.failure
    }

    #[inline]
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    #[inline]
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    #[inline]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    #[inline]
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// An uncaught synchronous error with its source location.
#[derive(Debug)]
pub struct ErrorEvent {
    message: String,
    source_file: Option<String>,
    line: Option<u32>,
    column: Option<u32>,
    failure: Failure,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl ErrorEvent {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            failure: Failure::msg(message.clone()),
            message,
            source_file: None,
            line: None,
            column: None,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Uses an existing failure, keeping its handled marker.
    pub fn from_failure(failure: Failure) -> Self {
        Self { message: failure.message(), failure, ..Self::new("") }
    }

    pub fn with_location(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.source_file = Some(file.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.failure = self.failure.with_trace(trace);
        self
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    #[inline]
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    #[inline]
    pub fn column(&self) -> Option<u32> {
        self.column
    }

    #[inline]
    pub fn failure(&self) -> &Failure {
        &self.failure
    }

    #[inline]
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    #[inline]
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    #[inline]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    #[inline]
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Process-wide listeners for unhandled rejections and uncaught errors.
#[derive(Debug, Clone)]
pub struct GlobalCapture {
    rail: Rail,
}

impl GlobalCapture {
    pub fn new(rail: Rail) -> Self {
        Self { rail }
    }

    #[inline]
    pub fn rail(&self) -> &Rail {
        &self.rail
    }

    /// Installs the panic hook and announces the application start.
    ///
    /// The hook replaces the previous one instead of chaining to it, so
    /// captured panics are not printed by the default handler. Calling this
    /// twice in one process is an error.
    pub fn install(&self) -> Result<(), CaptureError> {
        if HOOK_INSTALLED.swap(true, Ordering::AcqRel) {
            return Err(CaptureError::AlreadyInstalled);
        }

        let capture = self.clone();
        std::panic::set_hook(Box::new(move |info| {
            let payload = info.payload();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic with non-string payload".to_owned());

            let mut event = ErrorEvent::new(message);
            if let Some(location) = info.location() {
                event = event.with_location(location.file(), location.line(), location.column());
            }
            let backtrace = Backtrace::capture();
            if backtrace.status() == BacktraceStatus::Captured {
                event = event.with_trace(backtrace.to_string());
            }
            capture.handle_error(&mut event);
        }));

        tracing::info!("global error capture installed");
        let start = ReportContext::new().tag("event", "app_start").level(Level::Info);
        self.rail.telemetry().capture_message(APP_START_MESSAGE, &start);
        Ok(())
    }

    /// Spawns `future`, routing an `Err` result through the rejection listener.
    ///
    /// The handle resolves to `None` when the task failed.
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = Outcome<T>> + Send + 'static,
        T: Send + 'static,
    {
        let capture = self.clone();
        tokio::spawn(async move {
            match future.await {
                Ok(value) => Some(value),
                Err(failure) => {
                    capture.handle_rejection(&mut RejectionEvent::new(failure));
                    None
                },
            }
        })
    }

    /// Handles a failure nobody consumed.
    pub fn handle_rejection(&self, event: &mut RejectionEvent) -> Disposition {
        let failure = &event.failure;
        let message = failure.message();
        let matched = self
            .rail
            .policy()
            .first_match(core::iter::once(message.as_str()).chain(failure.traces()));

        if let Some(pattern) = matched {
            tracing::warn!(pattern = %pattern, error = %failure, "ignored unhandled rejection");
            event.prevent_default();
            event.stop_propagation();
            return Disposition::Suppressed { pattern };
        }

        tracing::error!(error = %failure, "unhandled rejection");
        let disposition = if failure.mark_handled() {
            let report = ReportContext::new()
                .tag("errorType", "unhandled_promise_rejection")
                .level(Level::Error);
            Disposition::Reported(self.rail.report(failure, &report))
        } else {
            Disposition::AlreadyHandled
        };
        event.prevent_default();
        disposition
    }

    /// Handles an uncaught synchronous error.
    pub fn handle_error(&self, event: &mut ErrorEvent) -> Disposition {
        let haystacks = core::iter::once(event.message.as_str())
            .chain(event.source_file.as_deref())
            .chain(event.failure.traces());
        let matched = self.rail.policy().first_match(haystacks);

        if let Some(pattern) = matched {
            tracing::warn!(pattern = %pattern, text = %event.message, "ignored uncaught error");
            event.prevent_default();
            event.stop_propagation();
            return Disposition::Suppressed { pattern };
        }

        tracing::error!(
            text = %event.message,
            file = event.source_file.as_deref(),
            line = event.line,
            column = event.column,
            "uncaught error"
        );
        let disposition = if event.failure.mark_handled() {
            let report = ReportContext::new()
                .tag("errorType", "global_error")
                .tag_opt("sourceFile", event.source_file.as_deref())
                .tag_opt("line", event.line)
                .tag_opt("column", event.column)
                .level(Level::Error);
            Disposition::Reported(self.rail.report(&event.failure, &report))
        } else {
            Disposition::AlreadyHandled
        };
        event.prevent_default();
        disposition
    }
}
