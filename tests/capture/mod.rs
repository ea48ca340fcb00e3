use voisin_rail::capture::{Disposition, ErrorEvent, GlobalCapture, RejectionEvent};
use voisin_rail::Failure;

use crate::support::{handler_fixture, recording_rail};

#[test]
fn rejection_is_reported_once() {
    let (rail, sink) = recording_rail();
    let capture = GlobalCapture::new(rail);
    let mut event = RejectionEvent::new(Failure::msg("fetch failed"));

    let disposition = capture.handle_rejection(&mut event);

    assert_eq!(disposition, Disposition::Reported(Some("evt-1".to_owned())));
    assert!(event.default_prevented());
    assert!(!event.propagation_stopped());
    assert_eq!(sink.exceptions()[0].tag("errorType"), Some("unhandled_promise_rejection"));
}

#[test]
fn rejection_matching_ignore_list_is_dropped() {
    let (rail, sink) = recording_rail();
    rail.policy().add_pattern("ResizeObserver loop");
    let capture = GlobalCapture::new(rail);
    let mut event = RejectionEvent::new(Failure::msg("ResizeObserver loop limit exceeded"));

    let disposition = capture.handle_rejection(&mut event);

    let pattern = "resizeobserver loop".to_owned();
    assert_eq!(disposition, Disposition::Suppressed { pattern });
    assert!(event.propagation_stopped());
    assert!(sink.exceptions().is_empty());
}

#[test]
fn failure_handled_by_the_handler_is_not_reported_again() {
    let fixture = handler_fixture();
    let failure = Failure::msg("contrainte violée");
    fixture.handler.handle_api_error(&failure, None);

    let capture = GlobalCapture::new(fixture.handler.rail().clone());
    let disposition = capture.handle_rejection(&mut RejectionEvent::new(failure.clone()));

    assert_eq!(disposition, Disposition::AlreadyHandled);
    assert_eq!(fixture.sink.exceptions().len(), 1);
}

#[test]
fn uncaught_error_carries_location_tags() {
    let (rail, sink) = recording_rail();
    let capture = GlobalCapture::new(rail);
    let mut event = ErrorEvent::new("index out of bounds").with_location("src/app.rs", 12, 5);

    capture.handle_error(&mut event);

    let report = &sink.exceptions()[0];
    assert_eq!(report.tag("errorType"), Some("global_error"));
    assert_eq!(report.tag("sourceFile"), Some("src/app.rs"));
    assert_eq!(report.tag("line"), Some("12"));
    assert_eq!(report.tag("column"), Some("5"));
}

#[test]
fn uncaught_error_from_extension_file_is_dropped() {
    let (rail, sink) = recording_rail();
    let capture = GlobalCapture::new(rail);
    let mut event =
        ErrorEvent::new("Script error.").with_location("chrome-extension://abc/content.js", 1, 1);

    assert!(capture.handle_error(&mut event).is_suppressed());
    assert!(event.default_prevented());
    assert!(sink.exceptions().is_empty());
}

#[tokio::test]
async fn spawned_task_failure_goes_through_rejection_listener() {
    let (rail, sink) = recording_rail();
    let capture = GlobalCapture::new(rail);

    let handle = capture.spawn(async { Err::<u8, _>(Failure::msg("tâche échouée")) });

    assert_eq!(handle.await.unwrap(), None);
    let reports = sink.exceptions();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].message, "tâche échouée");
}

#[tokio::test]
async fn spawned_task_success_returns_value() {
    let (rail, sink) = recording_rail();
    let capture = GlobalCapture::new(rail);

    let handle = capture.spawn(async { Ok::<_, Failure>("ok") });

    assert_eq!(handle.await.unwrap(), Some("ok"));
    assert!(sink.exceptions().is_empty());
}
