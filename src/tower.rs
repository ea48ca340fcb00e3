//! Tower integration for the resilience layer.
//!
//! [`RailLayer`] wraps a service so that every error it produces is
//! normalized into a [`Failure`], labelled with the layer context and reported
//! through the [`Rail`], exactly as [`Rail::safe`] does for a single future.
//!
//! # Feature Flag
//!
//! Requires the `tower` feature (enabled by default).
//!
//! # Example
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use voisin_rail::tower::RailLayer;
//!
//! let service = ServiceBuilder::new()
//!     .layer(RailLayer::new(rail, "missions"))
//!     .service(missions_service);
//! ```

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::future::FusedFuture;
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::rail::{FailureOrigin, Rail};
use crate::types::Failure;

/// A [`Layer`] that reports service errors through a [`Rail`].
#[derive(Clone, Debug)]
pub struct RailLayer {
    rail: Rail,
    context: String,
}

impl RailLayer {
    #[inline]
    pub fn new(rail: Rail, context: impl Into<String>) -> Self {
        Self { rail, context: context.into() }
    }

    #[inline]
    pub fn context(&self) -> &str {
        &self.context
    }
}

impl<S> Layer<S> for RailLayer {
    type Service = RailService<S>;

    #[inline]
    fn layer(&self, inner: S) -> Self::Service {
        RailService { inner, rail: self.rail.clone(), context: self.context.clone() }
    }
}

/// A [`Service`] whose errors come back as reported [`Failure`]s.
#[derive(Clone, Debug)]
pub struct RailService<S> {
    inner: S,
    rail: Rail,
    context: String,
}

impl<S> RailService<S> {
    #[inline]
    pub fn new(inner: S, rail: Rail, context: impl Into<String>) -> Self {
        Self { inner, rail, context: context.into() }
    }

    #[inline]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    #[inline]
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, Request> Service<Request> for RailService<S>
where
    S: Service<Request>,
    S::Error: Into<Failure>,
{
    type Response = S::Response;
    type Error = Failure;
    type Future = RailFuture<S::Future>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(|e| {
            let failure = e.into().with_context(self.context.as_str());
            self.rail.record_failure(&failure, &self.context, FailureOrigin::Unhandled);
            failure
        })
    }

    #[inline]
    fn call(&mut self, request: Request) -> Self::Future {
        RailFuture {
            inner: self.inner.call(request),
            rail: self.rail.clone(),
            context: Some(self.context.clone()),
        }
    }
}

pin_project! {
    /// Future returned by [`RailService`].
    #[must_use = "futures do nothing unless polled"]
    pub struct RailFuture<F> {
        #[pin]
        inner: F,
        rail: Rail,
        context: Option<String>,
    }
}

impl<F, T, E> Future for RailFuture<F>
where
    F: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    type Output = Result<T, Failure>;

    #[inline]
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match this.inner.poll(cx) {
            Poll::Ready(Ok(response)) => {
                this.context.take();
                Poll::Ready(Ok(response))
            },
            Poll::Ready(Err(error)) => {
                let context = this.context.take().unwrap_or_default();
                let failure = error.into().with_context(context.as_str());
                this.rail.record_failure(&failure, &context, FailureOrigin::Operation);
                Poll::Ready(Err(failure))
            },
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<F, T, E> FusedFuture for RailFuture<F>
where
    F: FusedFuture<Output = Result<T, E>>,
    E: Into<Failure>,
{
    #[inline]
    fn is_terminated(&self) -> bool {
        self.context.is_none() || self.inner.is_terminated()
    }
}

/// Extension trait for wrapping a service with a [`RailLayer`].
pub trait ServiceRailExt<Request>: Service<Request> + Sized {
    fn with_rail(self, rail: &Rail, context: impl Into<String>) -> RailService<Self> {
        RailService::new(self, rail.clone(), context)
    }
}

impl<S, Request> ServiceRailExt<Request> for S where S: Service<Request> {}
