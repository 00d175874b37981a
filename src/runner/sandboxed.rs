//! Sandboxed runner implementation using the local worker
//!
//! Executes code for the sandboxed language with a fixed execution budget.

use async_trait::async_trait;
use tracing::debug;

use super::{ExecutionRequest, Runner};
use crate::core::ExecutionResult;
use crate::error::Result;
use crate::sandbox::SandboxManager;

/// Execution budget handed to the worker (ms)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Runner that executes code in the sandbox worker
#[derive(Clone)]
pub struct SandboxedRunner {
    manager: SandboxManager,
    timeout_ms: u64,
}

impl SandboxedRunner {
    pub fn new(manager: SandboxManager) -> Self {
        Self {
            manager,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

#[async_trait]
impl Runner for SandboxedRunner {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        debug!(
            "Running {} code in sandbox ({} ms budget)",
            request.language, self.timeout_ms
        );
        self.manager
            .run(&request.source, &request.stdin, self.timeout_ms)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Status;
    use crate::languages::{Code, Language};
    use crate::sandbox::manager::tests::{Behavior, FakeSpawner};
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_default_budget_is_five_seconds() {
        let manager = SandboxManager::new(FakeSpawner::new(vec![Behavior::Hang]));
        let runner = SandboxedRunner::new(manager);
        let request = ExecutionRequest::new(&Code::new("while 1: pass", Language::Python), "");

        let start = Instant::now();
        let result = runner.run(&request).await.unwrap();

        assert_eq!(result.status, Status::RuntimeError);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(5250));
        assert!(elapsed < Duration::from_millis(5300));
    }
}
