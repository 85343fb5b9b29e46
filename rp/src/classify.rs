//! Outcome classification
//!
//! A [`Classifier`] looks at the raw output of one executor call and decides
//! whether the attempt is done or has to be retried.

use std::fmt::Display;

use async_trait::async_trait;
use tracing::debug;

/// Decision for one executor output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The output is final, hand it to the caller
    Accept,

    /// The try failed; record the reason and retry if budget remains
    Retry(String),
}

impl Verdict {
    pub fn retry(reason: impl Into<String>) -> Self {
        Verdict::Retry(reason.into())
    }
}

/// Decides whether an executor output counts as success
///
/// Async so implementations can inspect payload bodies or consult other services.
#[async_trait]
pub trait Classifier<O>: Send + Sync
where
    O: Send + Sync + 'static,
{
    async fn classify(&self, output: &O) -> Verdict;
}

/// Outputs that can report a transport-level failure on their own
pub trait Outcome {
    /// Failure reason, or `None` when the call itself succeeded
    fn failure(&self) -> Option<String>;
}

impl<T, E: Display> Outcome for Result<T, E> {
    fn failure(&self) -> Option<String> {
        self.as_ref().err().map(|e| e.to_string())
    }
}

/// Default classifier: any reported error is a failure, anything else succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptUnlessError;

#[async_trait]
impl<O> Classifier<O> for AcceptUnlessError
where
    O: Outcome + Send + Sync + 'static,
{
    async fn classify(&self, output: &O) -> Verdict {
        match output.failure() {
            Some(reason) => {
                debug!(%reason, "AcceptUnlessError::classify: error reported");
                Verdict::Retry(reason)
            }
            None => Verdict::Accept,
        }
    }
}

/// Classifier backed by a synchronous closure
pub struct FnClassifier<F> {
    f: F,
}

/// Build a classifier from a closure
pub fn classifier_fn<O, F>(f: F) -> FnClassifier<F>
where
    F: Fn(&O) -> Verdict + Send + Sync,
{
    FnClassifier { f }
}

#[async_trait]
impl<O, F> Classifier<O> for FnClassifier<F>
where
    O: Send + Sync + 'static,
    F: Fn(&O) -> Verdict + Send + Sync,
{
    async fn classify(&self, output: &O) -> Verdict {
        (self.f)(output)
    }
}
