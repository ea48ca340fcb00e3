use voisin_rail::classify::{
    classify, handle_auth_session_expired, ErrorCode, Verdict, AUTH_ERROR_MESSAGE,
    FORBIDDEN_MESSAGE, GENERIC_MESSAGE, NOT_FOUND_MESSAGE, SESSION_EXPIRED_MESSAGE,
};
use voisin_rail::notify::{ToastKind, LOGIN_ROUTE};
use voisin_rail::{Failure, RemoteError, ServiceError, SuppressionPolicy};

use crate::support::{handler_fixture, RecordingNavigator, RecordingNotifier};

fn verdict(failure: &Failure) -> Verdict {
    classify(failure, None, &SuppressionPolicy::with_builtin())
}

fn status(code: u16) -> Failure {
    Failure::new(RemoteError::Http { status: code, code: None, message: String::new() })
}

fn expect(failure: &Failure, message: &str, code: &str) {
    let verdict = verdict(failure);
    assert_eq!(verdict.message(), Some(message));
    assert_eq!(verdict.code().map(ErrorCode::as_str), Some(code));
}

#[test]
fn unauthorized_status_means_session_expired() {
    expect(&status(401), SESSION_EXPIRED_MESSAGE, "AUTH_SESSION_EXPIRED");
}

#[test]
fn jwt_code_means_session_expired() {
    let failure = Failure::from(ServiceError::new("JWT expired").with_code("PGRST301"));
    let message = "Votre session a expiré. Veuillez vous reconnecter.";
    expect(&failure, message, "AUTH_SESSION_EXPIRED");
}

#[test]
fn forbidden_status() {
    expect(
        &status(403),
        "Vous n'avez pas les droits nécessaires pour effectuer cette action.",
        "AUTH_FORBIDDEN",
    );
}

#[test]
fn not_found_status() {
    expect(&status(404), "La ressource demandée n'a pas été trouvée.", "RESOURCE_NOT_FOUND");
}

#[test]
fn own_message_without_code_is_unknown_error() {
    expect(&Failure::msg("custom api message"), "custom api message", "UNKNOWN_ERROR");
}

#[test]
fn session_expiry_takes_precedence_over_payload_forbidden() {
    let failure =
        Failure::from(ServiceError::new("denied").with_status(401).with_payload_code(403));
    assert_eq!(verdict(&failure).code(), Some(&ErrorCode::AuthSessionExpired));
}

#[test]
fn permission_sentinel_is_forbidden() {
    expect(&Failure::new(RemoteError::Permission), FORBIDDEN_MESSAGE, "AUTH_FORBIDDEN");
    expect(&Failure::msg("permission error"), FORBIDDEN_MESSAGE, "AUTH_FORBIDDEN");
}

#[test]
fn rejected_authentication() {
    let failure = Failure::from(ServiceError::new("").with_code("PGRST401"));
    expect(&failure, AUTH_ERROR_MESSAGE, "AUTH_ERROR");
    assert!(verdict(&failure).code().is_some_and(ErrorCode::requires_sign_in));
}

#[test]
fn empty_failure_falls_back_to_generic_message() {
    let verdict = verdict(&Failure::msg(""));
    assert_eq!(verdict.message(), Some(GENERIC_MESSAGE));
    assert_eq!(verdict.code(), None);
    assert!(verdict.occurred());
}

#[test]
fn runtime_patterns_do_not_suppress_classification() {
    let policy = SuppressionPolicy::with_builtin();
    policy.add_pattern("quota");
    let verdict = classify(&Failure::msg("quota exceeded"), None, &policy);
    assert!(verdict.occurred());
}

#[test]
fn extension_trace_is_suppressed() {
    let failure = status(404).with_source_trace("at chrome-extension://abc/x.js:3:9");
    assert_eq!(verdict(&failure), Verdict::Suppressed);
}

#[test]
fn session_expiry_alerts_and_redirects() {
    let notifier = RecordingNotifier::default();
    let navigator = RecordingNavigator::default();
    handle_auth_session_expired(&notifier, &navigator);

    assert_eq!(*notifier.alerts.lock(), [SESSION_EXPIRED_MESSAGE]);
    let visits = navigator.visits.lock();
    assert_eq!(visits[0].0, LOGIN_ROUTE);
    assert!(visits[0].1.replace);
    assert!(visits[0].1.session_expired);
}

#[test]
fn handler_reports_and_toasts() {
    let fixture = handler_fixture();
    let failure = status(404);

    let verdict = fixture.handler.handle_api_error(&failure, None);

    assert_eq!(verdict.code(), Some(&ErrorCode::ResourceNotFound));
    assert!(failure.is_handled());
    let toasts = fixture.notifier.toasts.lock().clone();
    assert_eq!(toasts, [(NOT_FOUND_MESSAGE.to_owned(), ToastKind::Error)]);

    let reports = fixture.sink.exceptions();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].tag("errorType"), Some("api_error"));
    assert_eq!(reports[0].tag("errorCode"), Some("RESOURCE_NOT_FOUND"));
}

#[test]
fn handler_redirects_on_expired_session_without_toast() {
    let fixture = handler_fixture();
    fixture.handler.handle_api_error(&status(401), None);

    assert!(fixture.notifier.toasts.lock().is_empty());
    assert_eq!(fixture.notifier.alerts.lock().len(), 1);
    assert_eq!(fixture.navigator.visits.lock()[0].0, LOGIN_ROUTE);
    assert!(fixture.sink.exceptions().is_empty());
}

#[test]
fn handler_ignores_extension_noise() {
    let fixture = handler_fixture();
    let failure = Failure::msg("boom").with_trace("chrome-extension://abc/content.js");

    let verdict = fixture.handler.handle_api_error(&failure, Some("Chargement impossible"));

    assert_eq!(verdict, Verdict::Suppressed);
    assert!(!failure.is_handled());
    assert!(fixture.notifier.toasts.lock().is_empty());
    assert!(fixture.sink.exceptions().is_empty());
}
