//! Executors perform a single try of an operation
//!
//! The pool never looks inside requests or outputs; it only forwards them.

use std::future::Future;

use async_trait::async_trait;

mod http;

pub use http::{HttpError, HttpExecutor, HttpOutcome, HttpRequest, HttpResponse, StatusClassifier};

/// Performs one attempt of an operation
#[async_trait]
pub trait Executor<Req>: Send + Sync + 'static
where
    Req: Send + Sync + 'static,
{
    /// Raw result of a try, forwarded to the classifier and then the caller
    type Output: Send + Sync + 'static;

    /// Execute one try; called again with the same request on every retry
    async fn execute(&self, request: &Req) -> Self::Output;
}

/// Executor backed by an async closure
pub struct FnExecutor<F> {
    f: F,
}

/// Build an executor from a closure taking an owned copy of the request
pub fn executor_fn<Req, F, Fut>(f: F) -> FnExecutor<F>
where
    Req: Clone,
    F: Fn(Req) -> Fut,
    Fut: Future,
{
    FnExecutor { f }
}

#[async_trait]
impl<Req, F, Fut> Executor<Req> for FnExecutor<F>
where
    Req: Clone + Send + Sync + 'static,
    F: Fn(Req) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: Send + Sync + 'static,
{
    type Output = Fut::Output;

    async fn execute(&self, request: &Req) -> Self::Output {
        (self.f)(request.clone()).await
    }
}
