//! Message types for the pool actor

use super::queue::{Attempt, OnComplete};

/// Requests sent from handles to the pool task
pub(crate) enum PoolRequest<Req, O> {
    /// Queue a new operation
    Submit { request: Req, on_complete: OnComplete<O> },

    /// Stop immediately, dropping queued work
    Shutdown,
}

/// Progress of one try, reported back by its execution task
///
/// Every try sends `Executed` and then `Classified`, in that order.
pub(crate) enum Report<Req, O> {
    /// The executor returned; its slot can be reused
    Executed { id: u64 },

    /// The classifier judged the output
    Classified {
        attempt: Attempt<Req, O>,
        settlement: Settlement<O>,
    },
}

/// Classifier decision together with the output it judged
pub(crate) enum Settlement<O> {
    Accepted(O),
    Rejected(String),
}
