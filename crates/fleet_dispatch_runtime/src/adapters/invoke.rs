//! The asynchronous handoff seam.
//!
//! The dispatcher hands serialized job payloads to a [WorkerInvoker]; what
//! sits behind the trait (a spawned Tokio task here, a queue or function
//! invocation elsewhere) is the execution environment's business.

use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub trait WorkerInvoker: Send + Sync {
    fn invoke_worker_async(&self, payload: &[u8]) -> Result<(), String>;
}

/// Accepts every payload and drops it; stands in where no executor exists.
pub struct NoopInvoker;

impl WorkerInvoker for NoopInvoker {
    fn invoke_worker_async(&self, _payload: &[u8]) -> Result<(), String> {
        Ok(())
    }
}

/// Hands payloads to a worker task spawned on a Tokio runtime. The handoff
/// itself is fire-and-forget; the worker drains the channel in order.
pub struct TokioWorkerInvoker {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl TokioWorkerInvoker {
    /// Spawn the draining task on `handle`; `on_payload` runs once per
    /// handed-off payload.
    pub fn spawn<F>(handle: &Handle, mut on_payload: F) -> Self
    where
        F: FnMut(Vec<u8>) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        handle.spawn(async move {
            while let Some(payload) = rx.recv().await {
                on_payload(payload);
            }
        });
        Self { tx }
    }
}

impl WorkerInvoker for TokioWorkerInvoker {
    fn invoke_worker_async(&self, payload: &[u8]) -> Result<(), String> {
        self.tx
            .send(payload.to_vec())
            .map_err(|error| format!("failed to hand off job payload: {error}"))
    }
}
