//! Sandbox manager
//!
//! Owns at most one live worker, a table of in-flight requests keyed by
//! correlation id, and the timeout/replacement policy. A worker that times out
//! or exits is never repaired: it is dropped together with everything pending
//! on it, and the next `run` starts a fresh one.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::protocol::{WorkerRequest, WorkerResponse};
use super::worker::{WorkerHandle, WorkerSpawner};
use super::{DEFAULT_GRACE_MS, TIMEOUT_MESSAGE};
use crate::core::{ExecutionResult, Status};
use crate::error::Result;

fn timeout_result() -> ExecutionResult {
    ExecutionResult::new(Status::RuntimeError, TIMEOUT_MESSAGE)
}

#[derive(Default)]
struct ManagerState {
    worker: Option<ActiveWorker>,
    /// Number of workers started so far; tags each worker instance
    generation: u64,
}

struct ActiveWorker {
    generation: u64,
    handle: WorkerHandle,
    next_id: u64,
    pending: HashMap<u64, oneshot::Sender<ExecutionResult>>,
}

impl ActiveWorker {
    /// Resolve everything still pending with the timeout result, then drop the worker
    fn abandon(mut self) {
        for (_, resolver) in self.pending.drain() {
            let _ = resolver.send(timeout_result());
        }
    }
}

/// Runs code on a reusable sandbox worker
#[derive(Clone)]
pub struct SandboxManager {
    spawner: Arc<dyn WorkerSpawner>,
    grace: Duration,
    state: Arc<Mutex<ManagerState>>,
}

impl SandboxManager {
    pub fn new(spawner: impl WorkerSpawner) -> Self {
        Self {
            spawner: Arc::new(spawner),
            grace: Duration::from_millis(DEFAULT_GRACE_MS),
            state: Arc::new(Mutex::new(ManagerState::default())),
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Execute `source` with `stdin`, giving the worker `timeout_ms` to finish.
    ///
    /// Always yields a result once a worker could be started: a worker that does
    /// not answer within `timeout_ms` plus the grace period, or that dies, turns
    /// into a runtime error carrying the timeout message.
    pub async fn run(&self, source: &str, stdin: &str, timeout_ms: u64) -> Result<ExecutionResult> {
        let (generation, id, resolved) = self.dispatch(source, stdin, timeout_ms)?;
        let limit = Duration::from_millis(timeout_ms) + self.grace;

        match tokio::time::timeout(limit, resolved).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Ok(timeout_result()),
            Err(_) => {
                warn!(
                    "Sandbox request {} timed out after {} ms, replacing worker",
                    id,
                    limit.as_millis()
                );
                teardown(&self.state, generation);
                Ok(timeout_result())
            }
        }
    }

    /// Register a pending request and hand it to the worker
    fn dispatch(
        &self,
        source: &str,
        stdin: &str,
        timeout_ms: u64,
    ) -> Result<(u64, u64, oneshot::Receiver<ExecutionResult>)> {
        let mut state = self.state.lock();

        let mut worker = match state.worker.take() {
            Some(worker) => worker,
            None => {
                state.generation += 1;
                self.start_worker(state.generation)?
            }
        };

        let id = worker.next_id;
        worker.next_id += 1;

        let (resolver, resolved) = oneshot::channel();
        worker.pending.insert(id, resolver);

        let request = WorkerRequest {
            id,
            source: source.to_string(),
            stdin: stdin.to_string(),
            timeout_ms,
        };
        let generation = worker.generation;

        if worker.handle.send(request) {
            debug!("Dispatched sandbox request {} to worker {}", id, generation);
            state.worker = Some(worker);
        } else {
            warn!("Sandbox worker {} is gone, dropping it", generation);
            worker.abandon();
        }

        Ok((generation, id, resolved))
    }

    fn start_worker(&self, generation: u64) -> Result<ActiveWorker> {
        let (handle, responses) = self.spawner.spawn()?.split();
        tokio::spawn(route_responses(
            Arc::downgrade(&self.state),
            generation,
            responses,
        ));
        info!("Started sandbox worker {}", generation);

        Ok(ActiveWorker {
            generation,
            handle,
            next_id: 1,
            pending: HashMap::new(),
        })
    }
}

/// Drop the worker of `generation` if it is still the live one
fn teardown(state: &Mutex<ManagerState>, generation: u64) {
    let worker = {
        let mut state = state.lock();
        if state.worker.as_ref().map(|w| w.generation) == Some(generation) {
            state.worker.take()
        } else {
            None
        }
    };

    if let Some(worker) = worker {
        info!(
            "Tearing down sandbox worker {} ({} pending)",
            generation,
            worker.pending.len()
        );
        worker.abandon();
    }
}

/// Deliver worker responses to their callers, matching strictly by id
async fn route_responses(
    state: Weak<Mutex<ManagerState>>,
    generation: u64,
    mut responses: mpsc::UnboundedReceiver<WorkerResponse>,
) {
    while let Some(response) = responses.recv().await {
        let Some(state) = state.upgrade() else {
            return;
        };

        let resolver = {
            let mut state = state.lock();
            state
                .worker
                .as_mut()
                .filter(|w| w.generation == generation)
                .and_then(|w| w.pending.remove(&response.id))
        };

        match resolver {
            Some(resolver) => {
                debug!("Sandbox request {} resolved ({})", response.id, response.status);
                let _ = resolver.send(response.into_result());
            }
            None => debug!("Dropping response {} with no pending request", response.id),
        }
    }

    // Channel closed: either we tore the worker down, or it died on its own
    if let Some(state) = state.upgrade() {
        if state.lock().worker.as_ref().map(|w| w.generation) == Some(generation) {
            warn!("Sandbox worker {} exited unexpectedly", generation);
        }
        teardown(&state, generation);
    }
}
