//! Pool task implementation

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::PoolConfig;
use super::delay::DelayPolicy;
use super::handle::PoolHandle;
use super::messages::{PoolRequest, Report, Settlement};
use super::queue::{Admission, AdmissionQueue, Attempt, PoolStats};
use crate::classify::{AcceptUnlessError, Classifier, Outcome, Verdict};
use crate::error::PoolError;
use crate::executor::Executor;

/// The Pool admits at most `size` operations at once and retries failures
/// with backoff and jitter.
///
/// All scheduling state lives in the task started by [`Pool::run`]; callers
/// talk to it through [`PoolHandle`].
pub struct Pool<Req, E>
where
    Req: Send + Sync + 'static,
    E: Executor<Req>,
{
    config: PoolConfig,
    executor: Arc<E>,
    classifier: Arc<dyn Classifier<E::Output>>,
    delay: DelayPolicy,
    tx: mpsc::Sender<PoolRequest<Req, E::Output>>,
    rx: mpsc::Receiver<PoolRequest<Req, E::Output>>,
}

impl<Req, E> Pool<Req, E>
where
    Req: Send + Sync + 'static,
    E: Executor<Req>,
{
    /// Create a pool with the default classifier
    pub fn new(config: PoolConfig, executor: E) -> Result<Self, PoolError>
    where
        E::Output: Outcome,
    {
        Self::with_classifier(config, executor, AcceptUnlessError)
    }

    /// Create a pool with a custom classifier
    pub fn with_classifier<C>(config: PoolConfig, executor: E, classifier: C) -> Result<Self, PoolError>
    where
        C: Classifier<E::Output> + 'static,
    {
        debug!(?config, "Pool::with_classifier: called");
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.channel_buffer);
        let delay = DelayPolicy::from_config(&config);
        Ok(Self {
            config,
            executor: Arc::new(executor),
            classifier: Arc::new(classifier),
            delay,
            tx,
            rx,
        })
    }

    /// Replace the configured backoff with an arbitrary delay function
    pub fn with_interval<F>(mut self, interval: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        debug!("Pool::with_interval: called");
        self.delay = self.delay.with_interval(Arc::new(interval));
        self
    }

    /// Get a handle for submitting work
    pub fn handle(&self) -> PoolHandle<Req, E::Output> {
        PoolHandle::new(self.tx.clone())
    }

    /// Spawn the pool task and return a handle plus its join handle
    pub fn spawn(self) -> (PoolHandle<Req, E::Output>, JoinHandle<PoolStats>) {
        let handle = self.handle();
        (handle, tokio::spawn(self.run()))
    }

    /// Run the pool task
    ///
    /// Runs until shutdown is requested, or until every handle is dropped and
    /// the remaining work has finished. Returns the final counters.
    pub async fn run(self) -> PoolStats {
        let Pool {
            config,
            executor,
            classifier,
            delay,
            tx,
            mut rx,
        } = self;
        // Only handles keep the request channel open
        drop(tx);

        let (report_tx, mut report_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher {
            executor,
            classifier,
            delay,
            report_tx,
        };
        let mut queue = AdmissionQueue::new(config.capacity(), config.tries);
        let mut next_id: u64 = 0;
        let mut accepting = true;

        info!(size = config.size, tries = config.tries, jitter_ms = config.jitter_ms, "Pool started");

        loop {
            if !accepting && queue.is_idle() {
                debug!("Pool::run: drained after last handle dropped");
                break;
            }

            tokio::select! {
                req = rx.recv(), if accepting => match req {
                    Some(PoolRequest::Submit { request, on_complete }) => {
                        debug!(id = next_id, "Pool::run: submit");
                        queue.enqueue(Attempt::new(next_id, request, on_complete));
                        next_id += 1;
                        dispatcher.pump(&mut queue);
                    }
                    Some(PoolRequest::Shutdown) => {
                        info!(
                            pending = queue.pending(),
                            in_flight = queue.in_flight(),
                            awaiting_verdict = queue.awaiting_verdict(),
                            "Pool shutdown requested"
                        );
                        break;
                    }
                    None => {
                        debug!("Pool::run: all handles dropped");
                        accepting = false;
                    }
                },
                Some(report) = report_rx.recv() => dispatcher.handle_report(&mut queue, report),
                else => break,
            }
        }

        let stats = queue.stats().clone();
        info!(?stats, "Pool stopped");
        stats
    }
}

/// Owns the capabilities needed to start executions and handle their results
struct Dispatcher<Req, E>
where
    Req: Send + Sync + 'static,
    E: Executor<Req>,
{
    executor: Arc<E>,
    classifier: Arc<dyn Classifier<E::Output>>,
    delay: DelayPolicy,
    report_tx: mpsc::UnboundedSender<Report<Req, E::Output>>,
}

impl<Req, E> Dispatcher<Req, E>
where
    Req: Send + Sync + 'static,
    E: Executor<Req>,
{
    /// Admission loop: fill free slots from the head of the queue
    fn pump(&self, queue: &mut AdmissionQueue<Req, E::Output>) {
        let mut exhausted = Vec::new();
        while let Some(admission) = queue.next_admission() {
            match admission {
                Admission::Dispatch(attempt) => self.dispatch(attempt),
                Admission::Exhausted(attempt) => exhausted.push(attempt),
            }
        }

        // Admission finishes before any exhaustion callback runs
        for attempt in exhausted {
            warn!(id = attempt.id, errors = ?attempt.errors, "Retries exhausted");
            attempt.exhaust();
        }
    }

    /// Start one try in its own task
    fn dispatch(&self, attempt: Attempt<Req, E::Output>) {
        let delay = self.delay.delay_for(attempt.attempt_number);
        debug!(id = attempt.id, attempt = attempt.attempt_number, ?delay, "Dispatcher::dispatch: called");

        let executor = Arc::clone(&self.executor);
        let classifier = Arc::clone(&self.classifier);
        let report_tx = self.report_tx.clone();

        // Sends fail only after shutdown, when reports have nowhere to go
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let request = &attempt.request;
            let executed = AssertUnwindSafe(executor.execute(request)).catch_unwind().await;
            let _ = report_tx.send(Report::Executed { id: attempt.id });

            let settlement = match executed {
                Ok(output) => {
                    let verdict = AssertUnwindSafe(classifier.classify(&output)).catch_unwind().await;
                    match verdict {
                        Ok(Verdict::Accept) => Settlement::Accepted(output),
                        Ok(Verdict::Retry(reason)) => Settlement::Rejected(reason),
                        Err(_) => {
                            warn!(id = attempt.id, "Classifier panicked");
                            Settlement::Rejected("classifier panicked".to_string())
                        }
                    }
                }
                Err(_) => {
                    warn!(id = attempt.id, "Executor panicked");
                    Settlement::Rejected("executor panicked".to_string())
                }
            };

            let _ = report_tx.send(Report::Classified { attempt, settlement });
        });
    }

    /// Completion handler: free the slot as soon as the executor returns, then
    /// finish or requeue the attempt once its verdict arrives
    ///
    /// Queued work is only admitted again after the verdict, so a retry keeps
    /// its place ahead of older submissions. New submissions may use the slot
    /// in between.
    fn handle_report(&self, queue: &mut AdmissionQueue<Req, E::Output>, report: Report<Req, E::Output>) {
        match report {
            Report::Executed { id } => {
                debug!(id, "Dispatcher::handle_report: executed");
                queue.release();
            }
            Report::Classified {
                attempt,
                settlement: Settlement::Accepted(output),
            } => {
                debug!(id = attempt.id, tries = attempt.attempt_number + 1, "Dispatcher::handle_report: accepted");
                queue.record_success();
                self.pump(queue);
                attempt.succeed(output);
            }
            Report::Classified {
                mut attempt,
                settlement: Settlement::Rejected(reason),
            } => {
                debug!(id = attempt.id, attempt = attempt.attempt_number, %reason, "Dispatcher::handle_report: retry");
                attempt.record_failure(reason);
                queue.requeue(attempt);
                self.pump(queue);
            }
        }
    }
}
