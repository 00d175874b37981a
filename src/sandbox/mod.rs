//! Sandbox module - Persistent isolated worker for local execution
//!
//! This module runs code for the sandboxed language without a network round-trip.
//! It handles:
//! - Lazy creation and reuse of one worker per manager
//! - Request/response correlation by id
//! - Timeout enforcement and worker replacement on timeout or crash
//! - Translating interpreter failures into judge-compatible results
//!
//! The sandbox module does NOT:
//! - Choose between local and remote execution (that's the executor's job)
//! - Queue or batch requests beyond what the worker channel does naturally

pub mod manager;
pub mod protocol;
pub mod python;
pub mod translate;
pub mod worker;

// Re-exports for convenience
pub use manager::SandboxManager;
pub use protocol::{WorkerRequest, WorkerResponse};
pub use python::PythonWorkerSpawner;
pub use worker::{WorkerChannel, WorkerHandle, WorkerSpawner};

/// Extra wait on top of the execution budget for message passing latency
pub const DEFAULT_GRACE_MS: u64 = 250;

/// Output of a run that hit the time limit
pub const TIMEOUT_MESSAGE: &str = "运行超时";
