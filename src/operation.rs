//! Loading and error state for one screen-level operation.
//!
//! [`AsyncOperation`] runs an operation through [`Rail::safe`], hands any
//! failure to the [`ErrorHandler`] and keeps the resulting loading flag and
//! error message for the presentation layer to read. Clones share the same
//! state and cancellation token.
//!
//! [`Rail::safe`]: crate::rail::Rail::safe

use core::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::async_ext::with_cancel;
use crate::classify::{ErrorCode, ErrorHandler, Verdict};
use crate::types::Failure;

/// Message returned when a browser extension broke the operation.
pub const EXTENSION_INTERFERENCE_MESSAGE: &str =
    "Une extension de votre navigateur interfère avec le site.";

/// What went wrong during the last run.
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    /// The failure came from extension code; no toast was shown.
    pub extension: bool,
    pub message: Option<String>,
    pub code: Option<ErrorCode>,
    pub failure: Failure,
}

#[derive(Debug, Clone, Default)]
struct State {
    loading: bool,
    error: Option<String>,
    details: Option<ErrorDetails>,
}

/// Result of [`AsyncOperation::execute`].
#[derive(Debug)]
pub enum Execution<T> {
    Done(T),
    /// Classified and handled; the message is also kept as the error state.
    Failed { message: String, code: Option<ErrorCode>, failure: Failure },
    /// Extension code interfered. No toast, no error state.
    Interference { message: &'static str },
    /// Suppressed by the handler. Nothing to show.
    Ignored,
    /// The token was cancelled before the result could be committed. The
    /// previous error state is restored and loading stops.
    Cancelled,
}

impl<T> Execution<T> {
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Interference { .. })
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            _ => None,
        }
    }
}

/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use voisin_rail::classify::ErrorHandler;
/// use voisin_rail::notify::{LogNavigator, LogNotifier};
/// use voisin_rail::operation::AsyncOperation;
/// use voisin_rail::{Failure, Rail};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let handler = ErrorHandler::new(Rail::default(), Arc::new(LogNotifier), Arc::new(LogNavigator));
/// let operation = AsyncOperation::new(handler);
///
/// let run = operation
///     .execute(async { Err::<(), _>(Failure::msg("Mission complète")) }, None, "inscription")
///     .await;
///
/// assert!(run.is_error());
/// assert_eq!(operation.error().as_deref(), Some("Mission complète"));
/// assert!(!operation.is_loading());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct AsyncOperation {
    handler: ErrorHandler,
    state: Arc<RwLock<State>>,
    token: CancellationToken,
}

impl AsyncOperation {
    pub fn new(handler: ErrorHandler) -> Self {
        Self::with_token(handler, CancellationToken::new())
    }

    /// Uses `token`, typically a child of the screen's token, for cancellation.
    pub fn with_token(handler: ErrorHandler, token: CancellationToken) -> Self {
        Self { handler, state: Arc::default(), token }
    }

    /// Starts in the loading state, for screens that fetch on first display.
    #[must_use]
    pub fn loading_initially(self) -> Self {
        self.state.write().loading = true;
        self
    }

    #[inline]
    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    pub fn details(&self) -> Option<ErrorDetails> {
        self.state.read().details.clone()
    }

    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels the running and any future execution.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Shows `message` as the error without running anything.
    pub fn set_error(&self, message: impl Into<String>) {
        self.state.write().error = Some(message.into());
    }

    pub fn reset_error(&self) {
        let mut state = self.state.write();
        state.error = None;
        state.details = None;
    }

    /// Runs `future` and records its outcome.
    ///
    /// `custom_message` replaces the generic message when the failure carries
    /// none. `context` labels the failure in logs and reports.
    pub async fn execute<Fut, T, E>(
        &self,
        future: Fut,
        custom_message: Option<&str>,
        context: &str,
    ) -> Execution<T>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        if self.token.is_cancelled() {
            return Execution::Cancelled;
        }
        let previous = {
            let mut state = self.state.write();
            let previous = state.clone();
            state.loading = true;
            state.error = None;
            state.details = None;
            previous
        };

        let rail = self.handler.rail();
        let outcome = with_cancel(&self.token, rail.safe(future, context)).await;
        let failure = match outcome {
            Ok(value) => {
                self.state.write().loading = false;
                return Execution::Done(value);
            },
            Err(failure) if failure.is_cancelled() => {
                *self.state.write() = State { loading: false, ..previous };
                return Execution::Cancelled;
            },
            Err(failure) => failure,
        };

        if rail.is_extension_noise(&failure) {
            tracing::warn!(context, error = %failure, "extension error ignored");
            let mut state = self.state.write();
            state.loading = false;
            state.details = Some(ErrorDetails {
                extension: true,
                message: None,
                code: None,
                failure,
            });
            return Execution::Interference { message: EXTENSION_INTERFERENCE_MESSAGE };
        }

        let verdict = self.handler.handle_api_error(&failure, custom_message);
        let mut state = self.state.write();
        state.loading = false;
        let Verdict::Classified(classification) = verdict else {
            return Execution::Ignored;
        };

        state.error = Some(classification.message.clone());
        state.details = Some(ErrorDetails {
            extension: false,
            message: Some(classification.message.clone()),
            code: classification.code.clone(),
            failure: failure.clone(),
        });
        Execution::Failed { message: classification.message, code: classification.code, failure }
    }
}
