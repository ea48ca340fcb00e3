use voisin_rail::classify::ErrorCode;
use voisin_rail::fallback::{Boundary, FallbackAction, FallbackKind, FallbackView};
use voisin_rail::notify::ToastKind;
use voisin_rail::operation::{AsyncOperation, Execution, EXTENSION_INTERFERENCE_MESSAGE};
use voisin_rail::prelude::CancellationToken;
use voisin_rail::{Failure, RemoteError, ServiceError};

use crate::support::{handler_fixture, recording_rail};

#[test]
fn boundary_reports_with_component_name() {
    let (rail, sink) = recording_rail();
    let boundary = Boundary::new(rail).component("MissionDetail");

    let view = boundary.catch(&Failure::msg("title is undefined"), Some("at MissionDetail"));

    assert_eq!(view.kind, FallbackKind::Component);
    assert_eq!(view.event_id(), Some("evt-1"));
    assert_eq!(view.actions.last(), Some(&FallbackAction::Report("evt-1".to_owned())));
    assert!(view.details.is_none());

    let report = &sink.exceptions()[0];
    assert_eq!(report.tag("errorType"), Some("component_boundary"));
    assert_eq!(report.tag("componentName"), Some("MissionDetail"));
}

#[test]
fn boundary_skips_extension_noise() {
    let (rail, sink) = recording_rail();
    let boundary = Boundary::new(rail);
    let failure = Failure::msg("boom").with_trace("at chrome-extension://abc/inject.js:1:1");

    let view = boundary.render::<()>(Err(failure)).unwrap_err();

    assert_eq!(view.event_id(), None);
    assert!(sink.exceptions().is_empty());
}

#[test]
fn boundary_passes_successful_render_through() {
    let (rail, _sink) = recording_rail();
    assert_eq!(Boundary::new(rail).render(Ok(5)), Ok(5));
}

#[test]
fn forbidden_api_failure_view() {
    let (rail, _sink) = recording_rail();
    let failure = Failure::new(RemoteError::Http { status: 403, code: None, message: "no".into() });

    let view = FallbackView::for_api_failure(&failure, None, rail.policy(), false);

    assert_eq!(view.kind, FallbackKind::Permission);
    assert_eq!(view.title, "Vous n'avez pas les droits nécessaires");
    assert_eq!(view.actions, [FallbackAction::Reload, FallbackAction::Home]);
    assert_eq!(FallbackAction::Home.route(), Some("/home"));
}

#[tokio::test]
async fn operation_failure_sets_error_and_toasts() {
    let fixture = handler_fixture();
    let operation = AsyncOperation::new(fixture.handler.clone());
    let failure = ServiceError::new("duplicate key").with_code("23505");

    let run = operation
        .execute(async { Err::<(), _>(failure) }, Some("Inscription impossible"), "inscription")
        .await;

    let (message, code) = match run {
        Execution::Failed { message, code, .. } => (message, code),
        other => panic!("expected a failed execution, got {other:?}"),
    };
    assert_eq!(message, "duplicate key");
    assert_eq!(code, Some(ErrorCode::Own("23505".to_owned())));
    assert_eq!(operation.error().as_deref(), Some("duplicate key"));
    assert_eq!(fixture.notifier.toasts.lock()[0].1, ToastKind::Error);

    // One report from the wrapper, one from the handler.
    let reports = fixture.sink.exceptions();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].tag("errorContext"), Some("inscription"));
    assert_eq!(reports[1].tag("errorType"), Some("api_error"));

    operation.reset_error();
    assert!(operation.error().is_none());
}

#[tokio::test]
async fn operation_detects_extension_interference() {
    let fixture = handler_fixture();
    let operation = AsyncOperation::new(fixture.handler.clone());
    let failure = Failure::msg("boom").with_trace("chrome-extension://abc/x.js");

    let run = operation.execute(async { Err::<(), _>(failure) }, None, "chargement").await;

    assert!(matches!(
        run,
        Execution::Interference { message } if message == EXTENSION_INTERFERENCE_MESSAGE
    ));
    assert!(fixture.notifier.toasts.lock().is_empty());
    assert!(fixture.sink.exceptions().is_empty());
}

#[tokio::test]
async fn operation_cancelled_mid_flight_commits_nothing() {
    let fixture = handler_fixture();
    let token = CancellationToken::new();
    let operation = AsyncOperation::with_token(fixture.handler.clone(), token.child_token());
    operation.set_error("Chargement précédent impossible");

    let pending = operation.execute(
        async {
            token.cancel();
            tokio::task::yield_now().await;
            Err::<(), _>(Failure::msg("trop tard"))
        },
        None,
        "chargement",
    );

    assert!(matches!(pending.await, Execution::Cancelled));
    assert!(!operation.is_loading());
    assert_eq!(operation.error().as_deref(), Some("Chargement précédent impossible"));
    assert!(fixture.notifier.toasts.lock().is_empty());
    assert!(fixture.sink.exceptions().is_empty());
}
