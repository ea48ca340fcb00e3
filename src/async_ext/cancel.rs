//! Cancellation checks before results are committed.
//!
//! Every fetch started on behalf of a UI context carries a
//! [`CancellationToken`] owned by that context. When the context goes away it
//! cancels the token, and whatever the fetch produced afterwards is discarded
//! as [`RemoteError::Cancelled`].

use core::future::Future;

use tokio_util::sync::CancellationToken;

use crate::types::{Failure, Outcome, RemoteError};

/// Runs `future` unless `token` is cancelled first.
///
/// The token is checked again after completion, so a result that arrives
/// after cancellation is never returned.
pub async fn with_cancel<Fut, T, E>(token: &CancellationToken, future: Fut) -> Outcome<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    if token.is_cancelled() {
        return Err(cancelled());
    }

    tokio::select! {
        biased;
        () = token.cancelled() => Err(cancelled()),
        result = future => commit(token, result.map_err(Into::into)),
    }
}

/// Drops `outcome` in favour of a cancellation failure when `token` is cancelled.
pub fn commit<T>(token: &CancellationToken, outcome: Outcome<T>) -> Outcome<T> {
    if token.is_cancelled() {
        Err(cancelled())
    } else {
        outcome
    }
}

#[inline]
fn cancelled() -> Failure {
    Failure::new(RemoteError::Cancelled)
}
