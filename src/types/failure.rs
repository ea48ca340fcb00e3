//! The error value that flows through every `Outcome`.
//!
//! [`Failure`] wraps a [`RemoteError`] with the diagnostics the capture points
//! need: an optional trace, the trace of a wrapped source error, a stack of
//! context labels and a shared [`HandledMarker`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::types::{ErrorVec, RemoteError, ServiceError};

/// Shared "already reported" flag.
///
/// Clones share the same flag, so a mark set by the classifier is seen by the
/// global capture even when it holds a cloned [`Failure`].
#[derive(Debug, Clone, Default)]
pub struct HandledMarker(Arc<AtomicBool>);

impl HandledMarker {
    /// Creates an unmarked flag.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the flag. Returns `true` only for the call that flipped it.
    #[inline]
    pub fn mark(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Returns whether the flag is set.
    #[inline]
    pub fn is_marked(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Error wrapper carrying a normalized [`RemoteError`] plus capture metadata.
#[must_use]
#[derive(Debug, Clone)]
pub struct Failure {
    pub(crate) error: RemoteError,
    pub(crate) trace: Option<String>,
    pub(crate) source_trace: Option<String>,
    pub(crate) context: ErrorVec<String>,
    pub(crate) handled: HandledMarker,
}

impl Failure {
    /// Creates a failure without trace or context.
    #[inline]
    pub fn new(error: RemoteError) -> Self {
        Self {
            error,
            trace: None,
            source_trace: None,
            context: ErrorVec::new(),
            handled: HandledMarker::new(),
        }
    }

    /// Creates a failure from a plain message.
    #[inline]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(RemoteError::other(message))
    }

    /// Attaches the trace (stack or backtrace text) observed with the error.
    #[inline]
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Attaches the trace of the original error this failure wraps.
    #[inline]
    pub fn with_source_trace(mut self, trace: impl Into<String>) -> Self {
        self.source_trace = Some(trace.into());
        self
    }

    /// Pushes a context label (most recent last).
    #[inline]
    pub fn with_context(mut self, label: impl Into<String>) -> Self {
        self.context.push(label.into());
        self
    }

    /// Returns the normalized error.
    #[inline]
    pub fn error(&self) -> &RemoteError {
        &self.error
    }

    /// Consumes the failure, returning the normalized error.
    #[inline]
    pub fn into_error(self) -> RemoteError {
        self.error
    }

    #[inline]
    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    #[inline]
    pub fn source_trace(&self) -> Option<&str> {
        self.source_trace.as_deref()
    }

    /// Context labels, most recent first.
    pub fn context_iter(&self) -> impl Iterator<Item = &str> {
        self.context.iter().rev().map(String::as_str)
    }

    /// Display message of the underlying error.
    #[inline]
    pub fn message(&self) -> String {
        self.error.message()
    }

    #[inline]
    pub fn code(&self) -> Option<&str> {
        self.error.code()
    }

    #[inline]
    pub fn status(&self) -> Option<u16> {
        self.error.status()
    }

    /// Marks the failure as handled. Returns `true` only for the first mark.
    #[inline]
    pub fn mark_handled(&self) -> bool {
        self.handled.mark()
    }

    #[inline]
    pub fn is_handled(&self) -> bool {
        self.handled.is_marked()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, RemoteError::Cancelled)
    }

    /// Every trace attached to this failure, own trace first.
    pub fn traces(&self) -> impl Iterator<Item = &str> {
        self.trace.as_deref().into_iter().chain(self.source_trace.as_deref())
    }

    /// Formats the context chain, most recent label first.
    pub fn error_chain(&self) -> String {
        let mut out = String::new();
        for label in self.context_iter() {
            out.push_str(label);
            out.push_str(" -> ");
        }
        out.push_str(&self.error.to_string());
        out
    }
}

impl core::fmt::Display for Failure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.error_chain())
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<RemoteError> for Failure {
    #[inline]
    fn from(error: RemoteError) -> Self {
        Self::new(error)
    }
}

impl From<ServiceError> for Failure {
    #[inline]
    fn from(error: ServiceError) -> Self {
        Self::new(RemoteError::Service(error))
    }
}

impl From<reqwest::Error> for Failure {
    fn from(error: reqwest::Error) -> Self {
        Self::new(RemoteError::from(error))
    }
}

impl From<serde_json::Error> for Failure {
    fn from(error: serde_json::Error) -> Self {
        Self::new(RemoteError::from(error))
    }
}

impl From<std::io::Error> for Failure {
    fn from(error: std::io::Error) -> Self {
        Self::new(RemoteError::from(error))
    }
}
