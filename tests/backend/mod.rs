use serde_json::{json, Map, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voisin_rail::backend::CLIENT_INFO;
use voisin_rail::classify::{classify, ErrorCode};
use voisin_rail::RemoteError;

use crate::support::{backend, recording_rail};

#[tokio::test]
async fn select_sends_filters_and_client_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/missions"))
        .and(query_param("select", "id,title"))
        .and(query_param("status", "eq.published"))
        .and(header("apikey", "anon-key"))
        .and(header("X-Client-Info", CLIENT_INFO))
        .and(header("Authorization", "Bearer anon-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": 1, "title": "A" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (rail, sink) = recording_rail();
    let client = backend(&server.uri(), rail);
    let rows: Vec<Value> = client
        .from("missions")
        .select("id, title")
        .eq("status", "published")
        .fetch()
        .await
        .unwrap();

    assert_eq!(rows, [json!({ "id": 1, "title": "A" })]);
    assert!(sink.exceptions().is_empty());
}

#[tokio::test]
async fn service_error_body_is_normalized_and_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/missions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "PGRST301",
            "message": "JWT expired",
            "details": null,
            "hint": null,
        })))
        .mount(&server)
        .await;

    let (rail, sink) = recording_rail();
    let client = backend(&server.uri(), rail.clone());
    let failure = client
        .from("missions")
        .context("récupération des missions")
        .fetch::<Vec<Value>>()
        .await
        .unwrap_err();

    assert_eq!(failure.status(), Some(401));
    assert_eq!(failure.code(), Some("PGRST301"));
    let verdict = classify(&failure, None, rail.policy());
    assert_eq!(verdict.code(), Some(&ErrorCode::AuthSessionExpired));

    let reports = sink.exceptions();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].tag("errorType"), Some("service_error"));
    assert_eq!(reports[0].tag("errorContext"), Some("récupération des missions"));
}

#[tokio::test]
async fn rpc_posts_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/register_for_mission"))
        .and(body_json(json!({ "p_mission_id": 7 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let (rail, _sink) = recording_rail();
    let client = backend(&server.uri(), rail);
    let answer: Value =
        client.rpc("register_for_mission", &json!({ "p_mission_id": 7 })).await.unwrap();

    assert_eq!(answer["success"], json!(true));
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let (rail, sink) = recording_rail();
    let client = backend("http://127.0.0.1:9", rail);

    let failure = client.from("missions").fetch::<Vec<Value>>().await.unwrap_err();

    assert!(matches!(failure.error(), RemoteError::Transport { .. }));
    assert_eq!(failure.code(), Some("NETWORK_ERROR"));
    assert_eq!(sink.exceptions()[0].tag("errorType"), Some("unhandled_exception"));
}

#[tokio::test]
async fn missing_probe_table_still_counts_as_connected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/health_check"))
        .and(query_param("select", "count"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "42P01",
            "message": "relation \"health_check\" does not exist",
        })))
        .mount(&server)
        .await;

    let (rail, sink) = recording_rail();
    let status = backend(&server.uri(), rail).check_connection("health_check").await;

    assert!(status.connected);
    assert!(!status.table_exists);
    assert!(sink.exceptions().is_empty());
}

#[tokio::test]
async fn failed_probe_reports_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let (rail, sink) = recording_rail();
    let status = backend(&server.uri(), rail).check_connection("categories").await;

    assert!(!status.connected);
    assert_eq!(status.error.as_deref(), Some("upstream down"));
    assert!(sink.exceptions().is_empty());
}

fn session_body() -> Value {
    json!({
        "access_token": "user-token",
        "refresh_token": "refresh",
        "token_type": "bearer",
        "expires_in": 3600,
        "user": {
            "id": "user-1",
            "email": "marie@example.fr",
            "user_metadata": { "username": "marie" },
        },
    })
}

#[tokio::test]
async fn sign_in_stores_session_and_identifies_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/notifications"))
        .and(header("Authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (rail, sink) = recording_rail();
    let client = backend(&server.uri(), rail);
    let mut sessions = client.subscribe();

    let session = client.sign_in_with_password("marie@example.fr", "secret").await.unwrap();

    assert_eq!(session.user.id, "user-1");
    assert!(sessions.has_changed().unwrap());
    assert!(sessions.borrow_and_update().is_some());
    let user = sink.user().unwrap();
    assert_eq!(user.id, "user-1");
    assert_eq!(user.username.as_deref(), Some("marie"));

    let _: Vec<Value> = client.from("notifications").fetch().await.unwrap();
}

#[tokio::test]
async fn sign_out_clears_session_even_when_backend_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "msg": "boom" })))
        .mount(&server)
        .await;

    let (rail, sink) = recording_rail();
    let client = backend(&server.uri(), rail);
    client.sign_in_with_password("marie@example.fr", "secret").await.unwrap();

    let outcome = client.sign_out().await;

    assert_eq!(outcome.unwrap_err().message(), "boom");
    assert!(client.get_session().is_none());
    assert!(sink.user().is_none());
}

#[tokio::test]
async fn sign_up_awaiting_confirmation_has_no_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-2",
            "email": "paul@example.fr",
        })))
        .mount(&server)
        .await;

    let (rail, _sink) = recording_rail();
    let client = backend(&server.uri(), rail);
    let session = client.sign_up("paul@example.fr", "secret", Map::new()).await.unwrap();

    assert!(session.is_none());
    assert!(client.get_session().is_none());
}

#[tokio::test]
async fn upload_returns_storage_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/avatars/user-1/photo.png"))
        .and(header("x-upsert", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "Key": "avatars/user-1/photo.png" })),
        )
        .mount(&server)
        .await;

    let (rail, _sink) = recording_rail();
    let client = backend(&server.uri(), rail);
    let key = client.upload("avatars", "/user-1/photo.png", vec![1, 2, 3], "image/png").await;

    assert_eq!(key.unwrap(), "avatars/user-1/photo.png");
}

