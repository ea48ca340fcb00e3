//! Seams to the presentation layer.
//!
//! The resilience layer never renders anything itself. It asks a [`Notifier`]
//! to show toasts and alerts, and a [`Navigator`] to change route.

/// Route of the sign-in screen.
pub const LOGIN_ROUTE: &str = "/login";

/// Route of the home screen.
pub const HOME_ROUTE: &str = "/home";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

/// Transient and blocking user notifications.
pub trait Notifier: Send + Sync {
    /// Shows a transient notification.
    fn toast(&self, message: &str, kind: ToastKind);

    /// Shows a blocking notification the user must acknowledge.
    fn alert(&self, message: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
    /// Tells the target screen that the previous session expired.
    pub session_expired: bool,
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str, options: NavigateOptions);
}

/// Notifier that only writes to the log. Useful for headless consumers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn toast(&self, message: &str, kind: ToastKind) {
        match kind {
            ToastKind::Error => tracing::error!(toast = message),
            ToastKind::Warning => tracing::warn!(toast = message),
            ToastKind::Success | ToastKind::Info => tracing::info!(toast = message),
        }
    }

    fn alert(&self, message: &str) {
        tracing::warn!(alert = message);
    }
}

/// Navigator that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str, options: NavigateOptions) {
        tracing::info!(route, replace = options.replace, "navigation requested");
    }
}
