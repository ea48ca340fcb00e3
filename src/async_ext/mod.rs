//! Async building blocks of the resilience layer.
//!
//! - [`SafeFuture`] / [`SafeCallFuture`]: the result-tuple and backend-call
//!   wrappers, also reachable through [`FutureRailExt`] and [`EnvelopeFutureExt`].
//! - [`with_timeout`]: races a call against a fixed delay.
//! - [`with_cancel`] / [`commit`]: discard results once the caller is gone.
//! - [`LoadingWatchdog`] / [`watch_loading`]: bound how long a loading state
//!   stays silent.
//!
//! # Examples
//!
//! ```ignore
//! use voisin_rail::prelude::*;
//!
//! async fn load(rail: &Rail, token: &CancellationToken) -> Outcome<Vec<Mission>> {
//!     with_cancel(token, with_timeout(DEFAULT_TIMEOUT, fetch_missions()))
//!         .safe(rail, "récupération des missions")
//!         .await
//! }
//! ```

mod cancel;
mod safe_future;
mod timeout;
mod watchdog;

pub use cancel::{commit, with_cancel};
pub use safe_future::{EnvelopeFutureExt, FutureRailExt, SafeCallFuture, SafeFuture};
pub use timeout::{with_timeout, DEFAULT_TIMEOUT};
pub use watchdog::{
    watch_loading, LoadingState, LoadingWatchdog, RELOAD_LABEL, SLOW_LOADING_AFTER,
    SLOW_LOADING_MESSAGE,
};
