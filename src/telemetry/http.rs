use chrono::Utc;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::types::{Failure, ReportContext};

use super::{Dsn, DsnError, EventId, SinkError, TelemetryConfig, TelemetrySink, TelemetryUser};

const CLIENT_NAME: &str = concat!("voisin-rail/", env!("CARGO_PKG_VERSION"));
const AUTH_HEADER: &str = "x-sentry-auth";

/// Sink posting JSON events to an error-tracking store endpoint.
///
/// Submission happens on a spawned tokio task, so capture calls return as soon
/// as the event is built. Transport errors are logged and dropped.
#[derive(Debug)]
pub struct HttpSink {
    client: reqwest::Client,
    store_url: String,
    environment: String,
    release: Option<String>,
    user: RwLock<Option<TelemetryUser>>,
}

impl HttpSink {
    pub fn new(dsn: &str, config: &TelemetryConfig) -> Result<Self, DsnError> {
        let dsn = Dsn::parse(dsn)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&dsn.auth_header(CLIENT_NAME))
            .map_err(|err| DsnError::InvalidUrl(err.to_string()))?;
        headers.insert(AUTH_HEADER, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| DsnError::InvalidUrl(err.to_string()))?;

        Ok(Self {
            client,
            store_url: dsn.store_url(),
            environment: config.environment.clone(),
            release: config.release.clone(),
            user: RwLock::new(None),
        })
    }

    fn base_event(&self, context: &ReportContext) -> (EventId, Value) {
        let event_id = Uuid::new_v4().simple().to_string();
        let event = json!({
            "event_id": event_id,
            "timestamp": Utc::now().to_rfc3339(),
            "platform": "rust",
            "level": context.get_level().as_str(),
            "environment": self.environment,
            "release": self.release,
            "tags": context.tags(),
            "extra": context.extras(),
            "user": self.user.read().clone(),
        });
        (event_id, event)
    }

    fn submit(&self, event: Value) -> Result<(), SinkError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|err| SinkError::Transport(err.to_string()))?;
        let request = self.client.post(&self.store_url).json(&event);

        handle.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {},
                Ok(response) => {
                    tracing::debug!(status = %response.status(), "telemetry event rejected");
                },
                Err(err) => tracing::debug!(error = %err, "telemetry event not delivered"),
            }
        });
        Ok(())
    }
}

impl TelemetrySink for HttpSink {
    fn capture_exception(
        &self,
        failure: &Failure,
        context: &ReportContext,
    ) -> Result<EventId, SinkError> {
        let (event_id, mut event) = self.base_event(context);
        event["exception"] = json!({
            "values": [{
                "type": exception_type(failure),
                "value": failure.error_chain(),
                "stacktrace": failure.trace().map(|trace| json!({ "raw": trace })),
            }]
        });
        if let Some(code) = failure.code() {
            event["fingerprint"] = json!(["{{ default }}", code]);
        }
        self.submit(event)?;
        Ok(event_id)
    }

    fn capture_message(
        &self,
        message: &str,
        context: &ReportContext,
    ) -> Result<EventId, SinkError> {
        let (event_id, mut event) = self.base_event(context);
        event["message"] = json!({ "formatted": message });
        self.submit(event)?;
        Ok(event_id)
    }

    fn set_user(&self, user: Option<TelemetryUser>) {
        *self.user.write() = user;
    }
}

fn exception_type(failure: &Failure) -> &'static str {
    use crate::types::RemoteError;

    match failure.error() {
        RemoteError::Transport { .. } => "TransportError",
        RemoteError::Timeout(_) => "TimeoutError",
        RemoteError::Http { .. } => "HttpError",
        RemoteError::Service(_) => "ServiceError",
        RemoteError::Permission => "PermissionError",
        RemoteError::Cancelled => "Cancelled",
        RemoteError::Other { .. } => "Error",
    }
}
