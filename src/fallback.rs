//! Full-page fallback models.
//!
//! When a screen cannot be shown at all, the presentation layer renders a
//! [`FallbackView`] instead: a title, a message, the recovery actions on offer
//! and, for extension interference, troubleshooting tips.
//!
//! [`Boundary`] is the catcher placed around a component tree. It turns a
//! failed render into a fallback view and reports the failure once.

use crate::classify::{AUTH_FAILED_CODE, SESSION_EXPIRED_CODE, SESSION_EXPIRED_MESSAGE};
use crate::notify::{HOME_ROUTE, LOGIN_ROUTE};
use crate::rail::Rail;
use crate::suppression::SuppressionPolicy;
use crate::telemetry::EventId;
use crate::types::{Failure, Level, Outcome, ReportContext, PERMISSION_SENTINEL};

pub const DEFAULT_TITLE: &str = "Une erreur s'est produite";
pub const DEFAULT_MESSAGE: &str = "Nous n'avons pas pu charger les données. Veuillez réessayer.";
pub const PERMISSION_TITLE: &str = "Vous n'avez pas les droits nécessaires";
pub const PERMISSION_MESSAGE: &str =
    "Vous n'avez pas les autorisations requises pour accéder à cette ressource.";
pub const AUTH_TITLE: &str = "Session expirée";
pub const EXTENSION_TITLE: &str = "Erreur d'extension navigateur";
pub const EXTENSION_MESSAGE: &str = "Une extension de votre navigateur interfère avec le site. \
                                     Essayez de désactiver vos extensions ou d'utiliser le mode \
                                     navigation privée.";
pub const BOUNDARY_TITLE: &str = "Quelque chose s'est mal passé";
pub const BOUNDARY_MESSAGE: &str =
    "Nous sommes désolés, une erreur s'est produite lors du chargement de cette page.";

/// Steps suggested when an extension interferes with the page.
pub const EXTENSION_TIPS: [&str; 4] = [
    "Désactivez temporairement vos extensions de navigateur",
    "Essayez d'utiliser le mode navigation privée/incognito",
    "Videz le cache de votre navigateur",
    "Essayez un autre navigateur",
];

/// Recovery action offered by a fallback view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackAction {
    /// Run the failed operation again.
    Retry,
    /// Reload the whole page.
    Reload,
    Home,
    SignIn,
    /// Open the feedback dialog for a telemetry event.
    Report(EventId),
}

impl FallbackAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Retry => "Réessayer",
            Self::Reload => "Actualiser la page",
            Self::Home => "Retour à l'accueil",
            Self::SignIn => "Se reconnecter",
            Self::Report(_) => "Signaler ce problème",
        }
    }

    /// Route to navigate to, for actions that change screen.
    pub fn route(&self) -> Option<&'static str> {
        match self {
            Self::Home => Some(HOME_ROUTE),
            Self::SignIn => Some(LOGIN_ROUTE),
            Self::Retry | Self::Reload | Self::Report(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    Permission,
    Auth,
    Extension,
    /// A failed API call of no particular kind.
    Generic,
    /// A component tree failed to render.
    Component,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackView {
    pub kind: FallbackKind,
    pub title: String,
    pub message: String,
    pub actions: Vec<FallbackAction>,
    /// Only filled for [`FallbackKind::Extension`].
    pub tips: Vec<&'static str>,
    /// Technical details, when the caller asked for them.
    pub details: Option<String>,
}

impl FallbackView {
    /// Fallback for a failed API call.
    ///
    /// Permission problems take precedence over authentication ones, which take
    /// precedence over extension interference. `custom_message` only replaces
    /// the generic message. `retry` adds [`FallbackAction::Retry`] first.
    ///
    /// # Examples
    ///
    /// ```
    /// use voisin_rail::fallback::{FallbackAction, FallbackKind, FallbackView};
    /// use voisin_rail::{Failure, ServiceError, SuppressionPolicy};
    ///
    /// let failure = Failure::from(ServiceError::new("JWT expired").with_code("PGRST301"));
    /// let view = FallbackView::for_api_failure(
    ///     &failure,
    ///     None,
    ///     &SuppressionPolicy::with_builtin(),
    ///     false,
    /// );
    ///
    /// assert_eq!(view.kind, FallbackKind::Auth);
    /// assert!(view.actions.contains(&FallbackAction::SignIn));
    /// ```
    pub fn for_api_failure(
        failure: &Failure,
        custom_message: Option<&str>,
        policy: &SuppressionPolicy,
        retry: bool,
    ) -> Self {
        let kind = api_kind(failure, policy);
        let (title, message) = match kind {
            FallbackKind::Permission => (PERMISSION_TITLE, PERMISSION_MESSAGE),
            FallbackKind::Auth => (AUTH_TITLE, SESSION_EXPIRED_MESSAGE),
            FallbackKind::Extension => (EXTENSION_TITLE, EXTENSION_MESSAGE),
            FallbackKind::Generic | FallbackKind::Component => {
                (DEFAULT_TITLE, custom_message.unwrap_or(DEFAULT_MESSAGE))
            },
        };

        let mut actions = Vec::with_capacity(4);
        if retry {
            actions.push(FallbackAction::Retry);
        }
        actions.push(FallbackAction::Reload);
        if kind == FallbackKind::Auth {
            actions.push(FallbackAction::SignIn);
        }
        actions.push(FallbackAction::Home);

        let tips =
            if kind == FallbackKind::Extension { EXTENSION_TIPS.to_vec() } else { Vec::new() };

        Self {
            kind,
            title: title.to_owned(),
            message: message.to_owned(),
            actions,
            tips,
            details: None,
        }
    }

    /// Fallback shown in place of a component tree that failed to render.
    pub fn for_component(event_id: Option<EventId>) -> Self {
        let mut actions = vec![FallbackAction::Reload, FallbackAction::Home];
        actions.extend(event_id.map(FallbackAction::Report));
        Self {
            kind: FallbackKind::Component,
            title: BOUNDARY_TITLE.to_owned(),
            message: BOUNDARY_MESSAGE.to_owned(),
            actions,
            tips: Vec::new(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Event id behind the [`FallbackAction::Report`] action, if offered.
    pub fn event_id(&self) -> Option<&str> {
        self.actions.iter().find_map(|action| match action {
            FallbackAction::Report(id) => Some(id.as_str()),
            _ => None,
        })
    }
}

fn api_kind(failure: &Failure, policy: &SuppressionPolicy) -> FallbackKind {
    let error = failure.error();
    let code = error.code();
    if error.status() == Some(403)
        || code == Some("403")
        || error.payload_code() == Some(403)
        || error.is_permission_sentinel()
    {
        FallbackKind::Permission
    } else if error.status() == Some(401)
        || code == Some(SESSION_EXPIRED_CODE)
        || code == Some(AUTH_FAILED_CODE)
    {
        FallbackKind::Auth
    } else if failure.traces().any(|trace| policy.is_extension_trace(trace)) {
        FallbackKind::Extension
    } else {
        FallbackKind::Generic
    }
}

/// Catches failures raised while rendering a component tree.
///
/// # Examples
///
/// ```
/// use voisin_rail::fallback::{Boundary, FallbackKind};
/// use voisin_rail::{Failure, Rail};
///
/// let boundary = Boundary::new(Rail::default()).component("MissionList");
/// let view = boundary.render::<()>(Err(Failure::msg("cannot read 'title'"))).unwrap_err();
///
/// assert_eq!(view.kind, FallbackKind::Component);
/// ```
#[derive(Debug, Clone)]
pub struct Boundary {
    rail: Rail,
    component_name: Option<String>,
    show_details: bool,
}

impl Boundary {
    pub fn new(rail: Rail) -> Self {
        Self { rail, component_name: None, show_details: false }
    }

    /// Names the wrapped component in reports.
    #[must_use]
    pub fn component(mut self, name: impl Into<String>) -> Self {
        self.component_name = Some(name.into());
        self
    }

    /// Includes the failure and component stack in the fallback view.
    #[must_use]
    pub fn show_details(mut self, show: bool) -> Self {
        self.show_details = show;
        self
    }

    /// Passes a successful render through and catches a failed one.
    pub fn render<T>(&self, outcome: Outcome<T>) -> Result<T, FallbackView> {
        outcome.map_err(|failure| self.catch(&failure, None))
    }

    /// Handles a failed render and returns the view to show instead.
    ///
    /// Extension and permission noise still gets the fallback view but is
    /// neither marked handled nor reported.
    pub fn catch(&self, failure: &Failure, component_stack: Option<&str>) -> FallbackView {
        let details = self.details(failure, component_stack);
        let message = failure.message();

        if self.rail.is_extension_noise(failure) || message.contains("chrome-extension://") {
            tracing::warn!(error = %failure, "extension error ignored by boundary");
            return FallbackView::for_component(None).with_optional_details(details);
        }
        if message.contains(PERMISSION_SENTINEL) {
            tracing::warn!(error = %failure, "permission error ignored by boundary");
            return FallbackView::for_component(None).with_optional_details(details);
        }

        failure.mark_handled();
        let component = self.component_name.as_deref().unwrap_or("unknown");
        tracing::error!(
            component,
            error = %failure,
            stack = component_stack,
            "boundary caught failure"
        );

        let report = ReportContext::new()
            .tag("errorType", "component_boundary")
            .tag("componentName", component)
            .extra("componentStack", component_stack)
            .level(Level::Error);
        let event_id = self.rail.report(failure, &report);

        FallbackView::for_component(event_id).with_optional_details(details)
    }

    fn details(&self, failure: &Failure, component_stack: Option<&str>) -> Option<String> {
        if !self.show_details {
            return None;
        }
        Some(match component_stack {
            Some(stack) => format!("{failure}\n{stack}"),
            None => failure.to_string(),
        })
    }
}

impl FallbackView {
    fn with_optional_details(self, details: Option<String>) -> Self {
        match details {
            Some(details) => self.with_details(details),
            None => self,
        }
    }
}
