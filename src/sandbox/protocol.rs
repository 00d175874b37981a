//! Messages exchanged between the manager and a sandbox worker

use serde::{Deserialize, Serialize};

use crate::core::{Diagnostic, ExecutionResult, Status};

/// Request sent to the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    pub id: u64,
    pub source: String,
    pub stdin: String,
    pub timeout_ms: u64,
}

/// Response echoed back by the worker, matched to its request by `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub id: u64,
    pub status: Status,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
}

impl WorkerResponse {
    pub fn new(id: u64, result: ExecutionResult) -> Self {
        Self {
            id,
            status: result.status,
            output: result.output,
            diagnostic: result.diagnostic,
        }
    }

    pub fn into_result(self) -> ExecutionResult {
        ExecutionResult {
            status: self.status,
            output: self.output,
            diagnostic: self.diagnostic,
        }
    }
}
