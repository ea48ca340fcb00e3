//! Fixed-delay timeouts for remote calls.

use core::future::Future;
use core::time::Duration;

use crate::types::{Failure, Outcome, RemoteError};

/// Upper bound applied to backend requests and category loading.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Races `future` against a fixed delay.
///
/// Losing the race yields [`RemoteError::Timeout`], which then flows through
/// the wrappers like any other failure. The losing future is dropped.
///
/// # Example
///
/// ```rust,ignore
/// use voisin_rail::async_ext::{with_timeout, DEFAULT_TIMEOUT};
///
/// let categories = with_timeout(DEFAULT_TIMEOUT, client.from("categories").fetch()).await;
/// ```
pub async fn with_timeout<Fut, T, E>(duration: Duration, future: Fut) -> Outcome<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result.map_err(Into::into),
        Err(_elapsed) => Err(Failure::new(RemoteError::Timeout(duration))),
    }
}
