//! Runner module - Execution backends
//!
//! This module provides a unified interface for running a piece of code:
//! - `SandboxedRunner`: Local sandbox worker (no network round-trip)
//! - `RemoteRunner`: Remote judge over HTTP
//!
//! The runner module does NOT:
//! - Decide which backend a language uses (that's the executor's job)
//! - Interpret outcomes beyond the shared `ExecutionResult` shape

pub mod remote;
pub mod sandboxed;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::ExecutionResult;
use crate::error::Result;
use crate::languages::{Code, Language};

/// A single execution request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub language: Language,
    pub source: String,
    pub stdin: String,
}

impl ExecutionRequest {
    pub fn new(code: &Code, stdin: impl Into<String>) -> Self {
        Self {
            language: code.language,
            source: code.source.clone(),
            stdin: stdin.into(),
        }
    }
}

/// Runner trait for executing code
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run the request and wait for its result
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult>;
}

// Re-exports
pub use remote::RemoteRunner;
pub use sandboxed::SandboxedRunner;
