//! Error normalization and resilience layer for the Voisin Solidaire client.
//!
//! Every call that can fail resolves to an [`Outcome`]: either a value or a
//! [`Failure`] that has already been logged, labelled with its context and
//! reported to telemetry once. On top of that sit a pure classifier that
//! turns failures into French user messages and stable codes, a global
//! capture for failures nobody consumed, and the services of the application
//! built on the backend client.
//!
//! # Layout
//!
//! - [`types`]: [`Failure`], [`RemoteError`], [`Envelope`] and report metadata.
//! - [`rail`]: the [`Rail`] composition root and the result wrappers.
//! - [`async_ext`]: timeouts, cancellation and the loading watchdog.
//! - [`classify`]: failure classification and the UI side effects.
//! - [`capture`]: unhandled rejections and panics.
//! - [`telemetry`]: the sink adapter and its HTTP transport.
//! - [`backend`] / [`services`]: the backend client and domain services.
//! - [`fallback`] / [`operation`]: presentation-facing state models.
//!
//! # Examples
//!
//! ```
//! use voisin_rail::classify::{classify, ErrorCode};
//! use voisin_rail::{Envelope, Failure, Rail, ServiceError};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let rail = Rail::default();
//! let expired = ServiceError::new("JWT expired").with_code("PGRST301");
//! let call = async move { Ok::<_, Failure>(Envelope::<()>::Error(expired)) };
//! let outcome = rail.safe_call(call, "récupération des missions").await;
//!
//! let failure = outcome.unwrap_err();
//! let verdict = classify(&failure, None, rail.policy());
//! assert_eq!(verdict.code(), Some(&ErrorCode::AuthSessionExpired));
//! # });
//! ```

pub mod async_ext;
pub mod backend;
pub mod capture;
pub mod classify;
pub mod config;
pub mod fallback;
pub mod logging;
pub mod notify;
pub mod operation;
/// Convenience re-exports for async call sites.
pub mod prelude;
pub mod rail;
pub mod services;
pub mod suppression;
pub mod telemetry;
pub mod types;

/// Tower integration - Layer and Service implementations (requires `tower` feature)
#[cfg(feature = "tower")]
pub mod tower;

pub use rail::Rail;
pub use suppression::SuppressionPolicy;
pub use telemetry::{EventId, Telemetry, TelemetrySink};
pub use types::{
    Envelope, ErrorVec, Failure, HandledMarker, Level, Outcome, RemoteError, ReportContext,
    ServiceError,
};
