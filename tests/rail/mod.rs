use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use voisin_rail::async_ext::{
    commit, watch_loading, with_cancel, with_timeout, EnvelopeFutureExt, FutureRailExt,
    LoadingState, LoadingWatchdog, SLOW_LOADING_AFTER,
};
use voisin_rail::prelude::CancellationToken;
use voisin_rail::{Envelope, Failure, Outcome, RemoteError, ServiceError};

use crate::support::recording_rail;

#[tokio::test]
async fn safe_returns_value_without_reporting() {
    let (rail, sink) = recording_rail();
    let outcome = rail.safe(async { Ok::<_, Failure>(42) }, "calcul").await;

    assert_eq!(outcome.unwrap(), 42);
    assert!(sink.exceptions().is_empty());
}

#[tokio::test]
async fn safe_reports_failure_once_with_context_tag() {
    let (rail, sink) = recording_rail();
    let outcome: Outcome<()> = rail.safe(async { Err(Failure::msg("x")) }, "ctx").await;

    let failure = outcome.unwrap_err();
    assert_eq!(failure.message(), "x");
    assert_eq!(failure.context_iter().collect::<Vec<_>>(), ["ctx"]);

    let reports = sink.exceptions();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].tag("errorContext"), Some("ctx"));
    assert_eq!(reports[0].tag("errorType"), None);
}

#[tokio::test]
async fn safe_converts_foreign_errors() {
    let (rail, _sink) = recording_rail();
    let outcome: Outcome<serde_json::Value> = async { serde_json::from_str("{oops") }
        .safe(&rail, "lecture du cache")
        .await;

    assert!(outcome.is_err());
}

#[tokio::test]
async fn safe_call_unwraps_data() {
    let (rail, sink) = recording_rail();
    let call = async { Ok::<_, Failure>(Envelope::Data(vec![1, 2])) };

    assert_eq!(rail.safe_call(call, "liste").await.unwrap(), [1, 2]);
    assert!(sink.exceptions().is_empty());
}

#[tokio::test]
async fn safe_call_turns_service_error_into_failure() {
    let (rail, sink) = recording_rail();
    let error = ServiceError::new("duplicate key").with_code("23505");
    let outcome: Outcome<()> =
        async { Ok::<_, Failure>(Envelope::Error(error)) }.safe_call(&rail, "inscription").await;

    let failure = outcome.unwrap_err();
    assert_eq!(failure.code(), Some("23505"));

    let reports = sink.exceptions();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].tag("errorType"), Some("service_error"));
    assert_eq!(reports[0].tag("errorContext"), Some("inscription"));
}

#[tokio::test]
async fn safe_call_passes_transport_failure_through() {
    let (rail, sink) = recording_rail();
    let transport = Failure::new(RemoteError::Transport { message: "dns".into() });
    let outcome: Outcome<()> =
        rail.safe_call(async { Err::<Envelope<()>, _>(transport) }, "missions").await;

    assert_eq!(outcome.unwrap_err().code(), Some("NETWORK_ERROR"));
    assert_eq!(sink.exceptions()[0].tag("errorType"), Some("unhandled_exception"));
}

#[tokio::test]
async fn extension_failure_never_reaches_sink() {
    let (rail, sink) = recording_rail();
    let noisy = Failure::msg("Cannot read properties of undefined")
        .with_trace("at chrome-extension://abcdef/inject.js:10:3");

    let outcome: Outcome<()> = rail.safe(async { Err(noisy) }, "rendu").await;

    assert!(outcome.is_err());
    assert!(sink.exceptions().is_empty());
}

#[tokio::test]
async fn safe_handler_reports_serialized_arguments() {
    let (rail, sink) = recording_rail();
    let outcome: Outcome<()> = rail
        .safe_handler("envoi du formulaire", json!({ "mission": 7 }), |_args| async {
            Err(Failure::msg("refusé"))
        })
        .await;

    assert!(outcome.is_err());
    assert_eq!(sink.exceptions()[0].tag("errorContext"), Some("envoi du formulaire"));
}

#[tokio::test(start_paused = true)]
async fn timeout_wins_the_race() {
    let slow = async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok::<_, Failure>(())
    };
    let failure = with_timeout(Duration::from_secs(15), slow).await.unwrap_err();

    assert_eq!(failure.code(), Some("TIMEOUT"));
    assert_eq!(failure.message(), "Délai d'attente dépassé après 15 secondes");
}

#[tokio::test]
async fn cancelled_token_discards_result() {
    let token = CancellationToken::new();
    token.cancel();

    let outcome = with_cancel(&token, async { Ok::<_, Failure>(1) }).await;
    assert!(outcome.unwrap_err().is_cancelled());
    assert!(commit(&token, Ok(1)).is_err());
}

#[tokio::test]
async fn cancelled_operation_is_not_reported() {
    let (rail, sink) = recording_rail();
    let token = CancellationToken::new();
    token.cancel();

    let outcome = with_cancel(&token, async { Ok::<_, Failure>(1) }).safe(&rail, "missions").await;

    assert!(outcome.unwrap_err().is_cancelled());
    assert!(sink.exceptions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn watchdog_flips_to_slow() {
    let watchdog = LoadingWatchdog::start(SLOW_LOADING_AFTER);
    assert_eq!(watchdog.state(), LoadingState::Loading);

    tokio::time::sleep(SLOW_LOADING_AFTER + Duration::from_millis(1)).await;
    assert!(watchdog.is_slow());
}

#[tokio::test(start_paused = true)]
async fn finished_watchdog_stays_done() {
    let watchdog = LoadingWatchdog::start(SLOW_LOADING_AFTER);
    watchdog.finish();

    tokio::time::sleep(SLOW_LOADING_AFTER * 2).await;
    assert_eq!(watchdog.state(), LoadingState::Done);
}

#[tokio::test(start_paused = true)]
async fn watch_loading_calls_back_once_when_slow() {
    let slow = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&slow);

    let value = watch_loading(
        async {
            tokio::time::sleep(Duration::from_secs(20)).await;
            5
        },
        SLOW_LOADING_AFTER,
        move || flag.store(true, Ordering::SeqCst),
    )
    .await;

    assert_eq!(value, 5);
    assert!(slow.load(Ordering::SeqCst));
}
