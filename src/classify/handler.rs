use std::sync::Arc;

use crate::notify::{NavigateOptions, Navigator, Notifier, ToastKind, LOGIN_ROUTE};
use crate::rail::Rail;
use crate::types::{Failure, Level, ReportContext};

use super::{classify, ErrorCode, Verdict, SESSION_EXPIRED_MESSAGE};

/// Shows the expiry alert and sends the user to the sign-in screen.
///
/// The history entry is replaced so that going back does not return to the
/// expired screen.
pub fn handle_auth_session_expired(notifier: &dyn Notifier, navigator: &dyn Navigator) {
    notifier.alert(SESSION_EXPIRED_MESSAGE);
    navigator.navigate(LOGIN_ROUTE, NavigateOptions { replace: true, session_expired: true });
}

/// Classifies API failures and performs the user-facing side effects.
#[derive(Clone)]
pub struct ErrorHandler {
    rail: Rail,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl core::fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ErrorHandler").field("rail", &self.rail).finish_non_exhaustive()
    }
}

impl ErrorHandler {
    pub fn new(rail: Rail, notifier: Arc<dyn Notifier>, navigator: Arc<dyn Navigator>) -> Self {
        Self { rail, notifier, navigator }
    }

    #[inline]
    pub fn rail(&self) -> &Rail {
        &self.rail
    }

    #[inline]
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Classifies `failure` and acts on the verdict.
    ///
    /// - Extension noise and cancellations are logged and otherwise ignored.
    /// - Everything else is marked handled first.
    /// - An expired session triggers the sign-in redirect instead of a toast.
    /// - Any other verdict is reported and shown as an error toast.
    pub fn handle_api_error(&self, failure: &Failure, custom_message: Option<&str>) -> Verdict {
        let verdict = classify(failure, custom_message, self.rail.policy());
        let Verdict::Classified(classification) = &verdict else {
            tracing::warn!(error = %failure, "suppressed error ignored");
            return verdict;
        };

        failure.mark_handled();

        if classification.code == Some(ErrorCode::AuthSessionExpired) {
            tracing::info!(error = %failure, "session expired; redirecting to sign-in");
            handle_auth_session_expired(self.notifier.as_ref(), self.navigator.as_ref());
            return verdict;
        }

        let code = classification.code_str().unwrap_or("UNKNOWN_ERROR");
        let report = ReportContext::new()
            .tag("errorType", "api_error")
            .tag("errorCode", code)
            .extra("customMessage", custom_message)
            .extra("errorMessage", classification.message.as_str())
            .level(Level::Error);
        self.rail.report(failure, &report);
        self.notifier.toast(&classification.message, ToastKind::Error);

        verdict
    }
}
