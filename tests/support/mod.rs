//! Recording doubles shared by the integration tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use voisin_rail::backend::{BackendClient, BackendConfig};
use voisin_rail::classify::ErrorHandler;
use voisin_rail::notify::{NavigateOptions, Navigator, Notifier, ToastKind};
use voisin_rail::telemetry::{SinkError, TelemetryUser};
use voisin_rail::{
    EventId, Failure, Level, Rail, ReportContext, SuppressionPolicy, Telemetry, TelemetrySink,
};

/// One report received by [`RecordingSink`].
#[derive(Debug, Clone)]
pub struct Captured {
    pub message: String,
    pub code: Option<String>,
    pub context: Vec<String>,
    pub tags: BTreeMap<String, String>,
    pub level: Level,
}

impl Captured {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    next_id: AtomicUsize,
    exceptions: Mutex<Vec<Captured>>,
    messages: Mutex<Vec<Captured>>,
    user: Mutex<Option<TelemetryUser>>,
}

impl RecordingSink {
    pub fn exceptions(&self) -> Vec<Captured> {
        self.exceptions.lock().clone()
    }

    pub fn messages(&self) -> Vec<Captured> {
        self.messages.lock().clone()
    }

    pub fn user(&self) -> Option<TelemetryUser> {
        self.user.lock().clone()
    }

    fn next_id(&self) -> EventId {
        format!("evt-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl TelemetrySink for RecordingSink {
    fn capture_exception(
        &self,
        failure: &Failure,
        context: &ReportContext,
    ) -> Result<EventId, SinkError> {
        self.exceptions.lock().push(Captured {
            message: failure.message(),
            code: failure.code().map(str::to_owned),
            context: failure.context_iter().map(str::to_owned).collect(),
            tags: context.tags().clone(),
            level: context.get_level(),
        });
        Ok(self.next_id())
    }

    fn capture_message(
        &self,
        message: &str,
        context: &ReportContext,
    ) -> Result<EventId, SinkError> {
        self.messages.lock().push(Captured {
            message: message.to_owned(),
            code: None,
            context: Vec::new(),
            tags: context.tags().clone(),
            level: context.get_level(),
        });
        Ok(self.next_id())
    }

    fn set_user(&self, user: Option<TelemetryUser>) {
        *self.user.lock() = user;
    }
}

/// Sink that panics on every call.
#[derive(Debug, Default)]
pub struct PanickingSink;

impl TelemetrySink for PanickingSink {
    fn capture_exception(&self, _: &Failure, _: &ReportContext) -> Result<EventId, SinkError> {
        panic!("sink exploded");
    }

    fn capture_message(&self, _: &str, _: &ReportContext) -> Result<EventId, SinkError> {
        panic!("sink exploded");
    }

    fn set_user(&self, _: Option<TelemetryUser>) {
        panic!("sink exploded");
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub toasts: Mutex<Vec<(String, ToastKind)>>,
    pub alerts: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn toast(&self, message: &str, kind: ToastKind) {
        self.toasts.lock().push((message.to_owned(), kind));
    }

    fn alert(&self, message: &str) {
        self.alerts.lock().push(message.to_owned());
    }
}

#[derive(Debug, Default)]
pub struct RecordingNavigator {
    pub visits: Mutex<Vec<(String, NavigateOptions)>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str, options: NavigateOptions) {
        self.visits.lock().push((route.to_owned(), options));
    }
}

/// A rail reporting into a fresh [`RecordingSink`].
pub fn recording_rail() -> (Rail, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let telemetry = Telemetry::with_sink(sink.clone());
    (Rail::new(telemetry, SuppressionPolicy::with_builtin()), sink)
}

pub struct HandlerFixture {
    pub handler: ErrorHandler,
    pub sink: Arc<RecordingSink>,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn handler_fixture() -> HandlerFixture {
    let (rail, sink) = recording_rail();
    let notifier = Arc::new(RecordingNotifier::default());
    let navigator = Arc::new(RecordingNavigator::default());
    let handler = ErrorHandler::new(rail, notifier.clone(), navigator.clone());
    HandlerFixture { handler, sink, notifier, navigator }
}

/// Backend client pointed at a mock server.
pub fn backend(uri: &str, rail: Rail) -> BackendClient {
    let url = uri.parse().expect("mock server uri");
    BackendClient::new(BackendConfig::new(url, "anon-key"), rail).expect("backend client")
}
