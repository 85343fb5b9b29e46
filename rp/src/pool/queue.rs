//! Attempt records and the admission queue state machine

use std::collections::VecDeque;
use std::fmt;

use tracing::debug;

use crate::error::Exhausted;

/// Caller's completion, invoked exactly once per submission
pub type OnComplete<O> = Box<dyn FnOnce(Result<O, Exhausted>) + Send + 'static>;

/// One submitted operation, carried across all of its tries
pub struct Attempt<Req, O> {
    pub id: u64,
    pub request: Req,
    /// Tries already made
    pub attempt_number: u32,
    pub errors: Vec<String>,
    on_complete: OnComplete<O>,
}

impl<Req, O> fmt::Debug for Attempt<Req, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attempt")
            .field("id", &self.id)
            .field("attempt_number", &self.attempt_number)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl<Req, O> Attempt<Req, O> {
    pub fn new(id: u64, request: Req, on_complete: OnComplete<O>) -> Self {
        Self {
            id,
            request,
            attempt_number: 0,
            errors: Vec::new(),
            on_complete,
        }
    }

    /// Record a failed try
    pub fn record_failure(&mut self, reason: String) {
        self.errors.push(reason);
        self.attempt_number += 1;
    }

    /// Deliver the accepted output to the caller
    pub fn succeed(self, output: O) {
        (self.on_complete)(Ok(output));
    }

    /// Deliver the accumulated error history to the caller
    pub fn exhaust(self) {
        (self.on_complete)(Err(Exhausted { errors: self.errors }));
    }
}

/// What the admission step decided for the head of the queue
#[derive(Debug)]
pub enum Admission<Req, O> {
    /// A slot was taken; run this attempt
    Dispatch(Attempt<Req, O>),

    /// Retry budget spent; no slot taken
    Exhausted(Attempt<Req, O>),
}

/// Counters reported when the pool stops
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub total_submitted: u64,
    pub total_succeeded: u64,
    pub total_exhausted: u64,
    pub total_tries: u64,
    pub total_retries: u64,
    pub peak_in_flight: usize,
    pub peak_queue_depth: usize,
}

/// Pending attempts plus the in-flight slot count
///
/// New work joins the back, retries jump to the front. A try holds its slot
/// only while executing; it then waits for a verdict without one.
pub struct AdmissionQueue<Req, O> {
    pending: VecDeque<Attempt<Req, O>>,
    in_flight: usize,
    awaiting_verdict: usize,
    capacity: Option<usize>,
    max_retries: u32,
    stats: PoolStats,
}

impl<Req, O> AdmissionQueue<Req, O> {
    /// `capacity` of `None` means unbounded
    pub fn new(capacity: Option<usize>, max_retries: u32) -> Self {
        debug!(?capacity, max_retries, "AdmissionQueue::new: called");
        Self {
            pending: VecDeque::new(),
            in_flight: 0,
            awaiting_verdict: 0,
            capacity,
            max_retries,
            stats: PoolStats::default(),
        }
    }

    /// Append newly submitted work
    pub fn enqueue(&mut self, attempt: Attempt<Req, O>) {
        self.stats.total_submitted += 1;
        self.pending.push_back(attempt);
        self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(self.pending.len());
    }

    /// Put a rejected attempt back at the front
    pub fn requeue(&mut self, attempt: Attempt<Req, O>) {
        self.awaiting_verdict = self.awaiting_verdict.saturating_sub(1);
        self.pending.push_front(attempt);
        self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(self.pending.len());
    }

    /// Admit the head of the queue if a slot is free
    pub fn next_admission(&mut self) -> Option<Admission<Req, O>> {
        if self.is_full() {
            return None;
        }
        let attempt = self.pending.pop_front()?;

        if attempt.attempt_number > self.max_retries {
            debug!(id = attempt.id, tries = attempt.attempt_number, "AdmissionQueue::next_admission: exhausted");
            self.stats.total_exhausted += 1;
            return Some(Admission::Exhausted(attempt));
        }

        self.in_flight += 1;
        self.stats.total_tries += 1;
        if attempt.attempt_number > 0 {
            self.stats.total_retries += 1;
        }
        self.stats.peak_in_flight = self.stats.peak_in_flight.max(self.in_flight);
        debug!(
            id = attempt.id,
            attempt = attempt.attempt_number,
            in_flight = self.in_flight,
            "AdmissionQueue::next_admission: dispatch"
        );
        Some(Admission::Dispatch(attempt))
    }

    /// Free the slot held by a finished execution; its verdict is still due
    pub fn release(&mut self) {
        debug_assert!(self.in_flight > 0, "release without a dispatched attempt");
        self.in_flight = self.in_flight.saturating_sub(1);
        self.awaiting_verdict += 1;
    }

    /// Count an accepted attempt
    pub fn record_success(&mut self) {
        self.awaiting_verdict = self.awaiting_verdict.saturating_sub(1);
        self.stats.total_succeeded += 1;
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Executed tries whose classification has not come back yet
    pub fn awaiting_verdict(&self) -> usize {
        self.awaiting_verdict
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight == 0 && self.awaiting_verdict == 0 && self.pending.is_empty()
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.in_flight >= cap)
    }
}
