//! Typed client for the hosted backend.
//!
//! Every public method resolves to an [`Outcome`] produced by the backend-call
//! wrapper, so a caller cannot observe a backend failure without it having
//! been logged and reported first.
//!
//! The client speaks three HTTP surfaces of the backend:
//!
//! - `/rest/v1/<table>` and `/rest/v1/rpc/<name>` through [`Query`] and
//!   [`BackendClient::rpc`];
//! - `/auth/v1/*` for password sign-in, sign-up and sign-out;
//! - `/storage/v1/object/*` for uploads and public URLs.

use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use url::Url;

use crate::async_ext::{with_timeout, DEFAULT_TIMEOUT};
use crate::rail::Rail;
use crate::types::{Envelope, Failure, Outcome, ServiceError};

mod auth;
mod query;
mod storage;

pub use auth::{AuthUser, Session};
pub use query::Query;

/// Value of the `X-Client-Info` header sent with every request.
pub const CLIENT_INFO: &str = "voisin-solidaire-app";

/// Service code returned when the probed table does not exist.
pub const UNDEFINED_TABLE_CODE: &str = "42P01";

/// Table probed by [`BackendClient::check_connection`] by default.
pub const HEALTH_CHECK_TABLE: &str = "health_check";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: Url,
    pub anon_key: String,
    /// Upper bound for a single request, body included.
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(url: Url, anon_key: impl Into<String>) -> Self {
        Self { url, anon_key: anon_key.into(), timeout: DEFAULT_TIMEOUT }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Result of a connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub table_exists: bool,
    pub latency: Option<Duration>,
    pub error: Option<String>,
}

struct Inner {
    http: reqwest::Client,
    config: BackendConfig,
    rail: Rail,
    session: watch::Sender<Option<Session>>,
}

/// Cheaply cloneable handle to the backend.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<Inner>,
}

impl core::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackendClient")
            .field("url", &self.inner.config.url.as_str())
            .field("timeout", &self.inner.config.timeout)
            .field("signed_in", &self.inner.session.borrow().is_some())
            .finish()
    }
}

impl BackendClient {
    pub fn new(config: BackendConfig, rail: Rail) -> Outcome<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Client-Info", HeaderValue::from_static(CLIENT_INFO));
        let apikey = HeaderValue::from_str(&config.anon_key)
            .map_err(|err| Failure::msg(format!("invalid anon key: {err}")))?;
        headers.insert("apikey", apikey);

        let http = reqwest::Client::builder().default_headers(headers).build()?;
        let (session, _) = watch::channel(None);

        tracing::debug!(url = %config.url, "backend client created");
        Ok(Self { inner: Arc::new(Inner { http, config, rail, session }) })
    }

    #[inline]
    pub fn rail(&self) -> &Rail {
        &self.inner.rail
    }

    #[inline]
    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    /// Starts a query on `table`.
    pub fn from(&self, table: &str) -> Query {
        Query::new(self.clone(), table)
    }

    /// Calls a stored procedure with JSON parameters.
    pub async fn rpc<P, T>(&self, function: &str, params: &P) -> Outcome<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.rpc_with_context(function, params, &format!("rpc {function}")).await
    }

    /// Same as [`rpc`](Self::rpc) with an explicit label for logs and telemetry.
    pub async fn rpc_with_context<P, T>(
        &self,
        function: &str,
        params: &P,
        context: &str,
    ) -> Outcome<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, &format!("rest/v1/rpc/{function}")).json(params);
        self.call(request, context).await
    }

    /// Probes connectivity with a minimal query on `table`.
    ///
    /// A missing table still proves the backend is reachable. The probe only
    /// logs; it never reports to telemetry.
    pub async fn check_connection(&self, table: &str) -> ConnectionStatus {
        let request = self
            .request(Method::GET, &format!("rest/v1/{table}"))
            .query(&[("select", "count"), ("limit", "1")]);
        let started = Instant::now();

        match self.execute(request).await {
            Ok(Envelope::Data(_)) => ConnectionStatus {
                connected: true,
                table_exists: true,
                latency: Some(started.elapsed()),
                error: None,
            },
            Ok(Envelope::Error(err)) if err.code.as_deref() == Some(UNDEFINED_TABLE_CODE) => {
                tracing::warn!(table, "probe table does not exist but the backend is reachable");
                ConnectionStatus {
                    connected: true,
                    table_exists: false,
                    latency: Some(started.elapsed()),
                    error: None,
                }
            },
            Ok(Envelope::Error(err)) => {
                tracing::error!(table, error = %err, "backend connection check failed");
                ConnectionStatus::down(err.message)
            },
            Err(failure) => {
                tracing::error!(table, error = %failure, "backend unreachable");
                ConnectionStatus::down(failure.message())
            },
        }
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url(), path.trim_start_matches('/'));
        self.inner.http.request(method, url).bearer_auth(self.bearer())
    }

    pub(crate) fn base_url(&self) -> &str {
        self.inner.config.url.as_str().trim_end_matches('/')
    }

    /// Sends `request` through the backend-call wrapper and decodes the data.
    pub(crate) async fn call<T>(&self, request: RequestBuilder, context: &str) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        let pending = async { self.execute(request).await.map(|envelope| envelope.decode()) };
        self.inner.rail.safe_call(pending, context).await
    }

    /// Sends `request` and turns the response into an envelope.
    ///
    /// `Err` means no usable response: transport failure or timeout.
    pub(crate) async fn execute(&self, request: RequestBuilder) -> Outcome<Envelope<Value>> {
        with_timeout(self.inner.config.timeout, async move {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, Failure>(envelope_from_response(status, &body))
        })
        .await
    }

    fn bearer(&self) -> String {
        match &*self.inner.session.borrow() {
            Some(session) => session.access_token.clone(),
            None => self.inner.config.anon_key.clone(),
        }
    }

    pub(crate) fn session_sender(&self) -> &watch::Sender<Option<Session>> {
        &self.inner.session
    }
}

impl ConnectionStatus {
    fn down(error: String) -> Self {
        Self { connected: false, table_exists: false, latency: None, error: Some(error) }
    }
}

fn envelope_from_response(status: StatusCode, body: &str) -> Envelope<Value> {
    if !status.is_success() {
        return Envelope::Error(parse_service_error(status, body));
    }
    if body.trim().is_empty() {
        return Envelope::Data(Value::Null);
    }
    match serde_json::from_str(body) {
        Ok(value) => Envelope::Data(value),
        Err(err) => {
            let error = ServiceError::new(err.to_string()).with_code("DECODE_ERROR");
            Envelope::Error(error.with_status(status.as_u16()))
        },
    }
}

/// Reads the error body of a non-success response.
///
/// The REST surface answers `{ code, message, details, hint }`; the auth
/// surface uses `msg`, `error_description` or `error`. Numeric codes, both top
/// level and nested under `data.code`, are kept as strings and as the payload
/// code respectively.
fn parse_service_error(status: StatusCode, body: &str) -> ServiceError {
    let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_owned);

    let message = text("message")
        .or_else(|| text("msg"))
        .or_else(|| text("error_description"))
        .or_else(|| text("error"))
        .or_else(|| (!body.trim().is_empty() && value.is_null()).then(|| body.trim().to_owned()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_owned());

    let code = match value.get("code") {
        Some(Value::String(code)) => Some(code.clone()),
        Some(Value::Number(code)) => Some(code.to_string()),
        _ => text("error_code"),
    };

    let mut error = ServiceError::new(message).with_status(status.as_u16());
    error.code = code;
    error.details = text("details");
    error.hint = text("hint");
    error.payload_code = value
        .pointer("/data/code")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok());
    error
}
