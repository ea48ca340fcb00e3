use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voisin_rail::telemetry::{Dsn, HttpSink, TelemetryConfig};
use voisin_rail::{Failure, Level, Rail, ReportContext, Telemetry, TelemetrySink};

use crate::support::PanickingSink;

#[test]
fn disabled_telemetry_only_logs() {
    let telemetry = Telemetry::disabled();

    assert!(!telemetry.is_enabled());
    assert!(telemetry.capture_exception(&Failure::msg("boom"), &ReportContext::new()).is_none());
    assert!(telemetry.capture_message("bonjour", &ReportContext::new()).is_none());
}

#[test]
fn missing_dsn_disables_telemetry() {
    let telemetry = Telemetry::init(&TelemetryConfig::default());
    assert!(!telemetry.is_enabled());
}

#[test]
fn panicking_sink_never_reaches_the_caller() {
    let telemetry = Telemetry::with_sink(Arc::new(PanickingSink));
    let rail = Rail::new(telemetry.clone(), Default::default());

    assert!(rail.report(&Failure::msg("boom"), &ReportContext::new()).is_none());
    assert!(telemetry.capture_message("bonjour", &ReportContext::new()).is_none());
}

#[test]
fn dsn_yields_store_endpoint() {
    let dsn = Dsn::parse("https://abc123@o42.ingest.sentry.io/4507").unwrap();

    assert_eq!(dsn.public_key(), "abc123");
    assert_eq!(dsn.project_id(), "4507");
    assert_eq!(dsn.store_url(), "https://o42.ingest.sentry.io/api/4507/store/");
}

#[tokio::test]
async fn http_sink_posts_tagged_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/7/store/"))
        .and(header_exists("x-sentry-auth"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let address = server.address();
    let dsn = format!("http://publickey@{}:{}/7", address.ip(), address.port());
    let config = TelemetryConfig {
        dsn: Some(dsn.clone()),
        environment: "test".to_owned(),
        release: Some("1.2.0".to_owned()),
    };
    let sink = HttpSink::new(&dsn, &config).unwrap();

    let context = ReportContext::new().tag("errorContext", "missions").level(Level::Warning);
    let id = sink.capture_exception(&Failure::msg("boom").with_context("missions"), &context);
    assert_eq!(id.unwrap().len(), 32);

    let mut received = Vec::new();
    for _ in 0..50 {
        received = server.received_requests().await.unwrap_or_default();
        if !received.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let event: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(event["level"], "warning");
    assert_eq!(event["environment"], "test");
    assert_eq!(event["tags"]["errorContext"], "missions");
    assert_eq!(event["exception"]["values"][0]["value"], "missions -> boom");
}
