//! Future wrappers that turn a failing call into a reported `Outcome`.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::future::FusedFuture;
use pin_project_lite::pin_project;

use crate::rail::{FailureOrigin, Rail};
use crate::types::{Envelope, Failure, Outcome};

pin_project! {
    /// Future returned by [`Rail::safe`] and [`FutureRailExt::safe`].
    ///
    /// Resolves to `Ok(value)` or to `Err(failure)` after the failure has been
    /// logged and reported with the context label.
    #[must_use = "futures do nothing unless polled"]
    pub struct SafeFuture<Fut> {
        #[pin]
        future: Fut,
        rail: Rail,
        context: Option<String>,
    }
}

impl<Fut> SafeFuture<Fut> {
    #[inline]
    pub(crate) fn new(future: Fut, rail: Rail, context: String) -> Self {
        Self { future, rail, context: Some(context) }
    }
}

impl<Fut, T, E> Future for SafeFuture<Fut>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match this.future.poll(cx) {
            Poll::Ready(Ok(value)) => {
                this.context.take();
                Poll::Ready(Ok(value))
            },
            Poll::Ready(Err(err)) => {
                let context = this.context.take().unwrap_or_default();
                let failure = err.into().with_context(context.as_str());
                this.rail.record_failure(&failure, &context, FailureOrigin::Operation);
                Poll::Ready(Err(failure))
            },
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<Fut, T, E> FusedFuture for SafeFuture<Fut>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    #[inline]
    fn is_terminated(&self) -> bool {
        self.context.is_none()
    }
}

pin_project! {
    /// Future returned by [`Rail::safe_call`] and [`EnvelopeFutureExt::safe_call`].
    ///
    /// Collapses a transport failure and a service-reported error into the same
    /// `Err(failure)` shape, tagging each differently for telemetry.
    #[must_use = "futures do nothing unless polled"]
    pub struct SafeCallFuture<Fut> {
        #[pin]
        future: Fut,
        rail: Rail,
        context: Option<String>,
    }
}

impl<Fut> SafeCallFuture<Fut> {
    #[inline]
    pub(crate) fn new(future: Fut, rail: Rail, context: String) -> Self {
        Self { future, rail, context: Some(context) }
    }
}

impl<Fut, T, E> Future for SafeCallFuture<Fut>
where
    Fut: Future<Output = Result<Envelope<T>, E>>,
    E: Into<Failure>,
{
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        let (failure, origin) = match this.future.poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(Envelope::Data(data))) => {
                this.context.take();
                return Poll::Ready(Ok(data));
            },
            Poll::Ready(Ok(Envelope::Error(err))) => (Failure::from(err), FailureOrigin::Service),
            Poll::Ready(Err(err)) => (err.into(), FailureOrigin::Unhandled),
        };

        let context = this.context.take().unwrap_or_default();
        let failure = failure.with_context(context.as_str());
        this.rail.record_failure(&failure, &context, origin);
        Poll::Ready(Err(failure))
    }
}

impl<Fut, T, E> FusedFuture for SafeCallFuture<Fut>
where
    Fut: Future<Output = Result<Envelope<T>, E>>,
    E: Into<Failure>,
{
    #[inline]
    fn is_terminated(&self) -> bool {
        self.context.is_none()
    }
}

/// Extension trait wrapping `Result`-returning futures with [`Rail::safe`].
///
/// # Examples
///
/// ```rust,no_run
/// use voisin_rail::prelude::*;
///
/// async fn load(rail: &Rail) -> Outcome<String> {
///     async { Ok::<_, Failure>("missions".to_owned()) }
///         .safe(rail, "chargement des missions")
///         .await
/// }
/// ```
pub trait FutureRailExt<T, E>: Future<Output = Result<T, E>> + Sized {
    fn safe(self, rail: &Rail, context: impl Into<String>) -> SafeFuture<Self>
    where
        E: Into<Failure>,
    {
        SafeFuture::new(self, rail.clone(), context.into())
    }
}

impl<Fut, T, E> FutureRailExt<T, E> for Fut where Fut: Future<Output = Result<T, E>> {}

/// Extension trait wrapping envelope-returning futures with [`Rail::safe_call`].
pub trait EnvelopeFutureExt<T, E>: Future<Output = Result<Envelope<T>, E>> + Sized {
    fn safe_call(self, rail: &Rail, context: impl Into<String>) -> SafeCallFuture<Self>
    where
        E: Into<Failure>,
    {
        SafeCallFuture::new(self, rail.clone(), context.into())
    }
}

impl<Fut, T, E> EnvelopeFutureExt<T, E> for Fut where
    Fut: Future<Output = Result<Envelope<T>, E>>
{
}
