//! PoolHandle - Client interface for submitting work

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::messages::PoolRequest;
use crate::error::{Exhausted, PoolError};

/// Handle for submitting operations to a running pool
///
/// Cheap to clone. The pool keeps running until `shutdown` is called or every
/// handle has been dropped and the remaining work has drained.
pub struct PoolHandle<Req, O> {
    tx: mpsc::Sender<PoolRequest<Req, O>>,
}

impl<Req, O> Clone for PoolHandle<Req, O> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<Req, O> PoolHandle<Req, O>
where
    Req: Send + 'static,
    O: Send + 'static,
{
    pub(crate) fn new(tx: mpsc::Sender<PoolRequest<Req, O>>) -> Self {
        Self { tx }
    }

    /// Queue an operation; `on_complete` runs exactly once with the final result
    ///
    /// The completion runs on the pool task, so it must not block.
    pub async fn submit<F>(&self, request: Req, on_complete: F) -> Result<(), PoolError>
    where
        F: FnOnce(Result<O, Exhausted>) + Send + 'static,
    {
        debug!("PoolHandle::submit: called");
        self.tx
            .send(PoolRequest::Submit {
                request,
                on_complete: Box::new(on_complete),
            })
            .await
            .map_err(|_| PoolError::Closed)
    }

    /// Queue an operation and wait for its final result
    pub async fn call(&self, request: Req) -> Result<O, PoolError> {
        debug!("PoolHandle::call: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(request, move |result| {
            // Caller may have stopped waiting
            let _ = reply_tx.send(result);
        })
        .await?;

        reply_rx.await.map_err(|_| PoolError::Closed)?.map_err(PoolError::from)
    }

    /// Stop the pool; queued and in-flight work is abandoned
    pub async fn shutdown(&self) -> Result<(), PoolError> {
        debug!("PoolHandle::shutdown: called");
        self.tx.send(PoolRequest::Shutdown).await.map_err(|_| PoolError::Closed)
    }

    /// True once the pool task has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
