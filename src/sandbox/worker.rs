//! Worker abstraction
//!
//! A worker is an isolated execution context reachable only through message
//! passing. The manager never looks inside it: it sends `WorkerRequest`s, reads
//! `WorkerResponse`s, and drops the handle to tear it down.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::protocol::{WorkerRequest, WorkerResponse};
use crate::error::Result;

/// Creates fresh workers for a `SandboxManager`
pub trait WorkerSpawner: Send + Sync + 'static {
    /// Start a new worker. Called lazily, and again after every teardown.
    fn spawn(&self) -> Result<WorkerChannel>;
}

/// Both ends of a freshly spawned worker, as seen from the manager
pub struct WorkerChannel {
    pub requests: mpsc::UnboundedSender<WorkerRequest>,
    pub responses: mpsc::UnboundedReceiver<WorkerResponse>,
    /// Task driving the worker; aborting it must release everything the worker owns
    pub task: JoinHandle<()>,
}

impl WorkerChannel {
    pub fn split(self) -> (WorkerHandle, mpsc::UnboundedReceiver<WorkerResponse>) {
        let handle = WorkerHandle {
            requests: self.requests,
            task: self.task,
        };
        (handle, self.responses)
    }
}

/// Owning handle to a live worker. Dropping it tears the worker down.
pub struct WorkerHandle {
    requests: mpsc::UnboundedSender<WorkerRequest>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Queue a request; false if the worker is already gone
    pub fn send(&self, request: WorkerRequest) -> bool {
        self.requests.send(request).is_ok()
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
