//! Remote judge runner
//!
//! Submits code to the judge synchronously (`wait=true`) with every text field
//! base64 encoded, and folds the response into an `ExecutionResult`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ExecutionRequest, Runner};
use crate::core::utils::{decode_text, encode_text};
use crate::core::{ExecutionResult, Status};
use crate::error::{Error, Result};
use crate::languages::compiler_options;

/// Body of `POST /submissions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRequest {
    pub source_code: String,
    pub language_id: u32,
    pub stdin: String,
    pub redirect_stderr_to_stdout: bool,
    pub compiler_options: String,
}

impl SubmissionRequest {
    pub fn new(language_id: u32, source: &str, stdin: &str) -> Self {
        Self {
            source_code: encode_text(source),
            language_id,
            stdin: encode_text(stdin),
            redirect_stderr_to_stdout: true,
            compiler_options: compiler_options(language_id).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionStatus {
    pub id: u32,
    #[serde(default)]
    pub description: String,
}

/// Judge response; text fields are base64 and may be null
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub stdout: Option<String>,
    pub compile_output: Option<String>,
    pub status: Option<SubmissionStatus>,
}

impl Submission {
    pub fn into_result(self) -> Result<ExecutionResult> {
        let compile_output = decode_text(self.compile_output.as_deref()).map_err(|source| {
            Error::Base64 {
                field: "compile_output",
                source,
            }
        })?;
        let stdout = decode_text(self.stdout.as_deref()).map_err(|source| Error::Base64 {
            field: "stdout",
            source,
        })?;

        let status = self
            .status
            .map(|status| Status::from_id(status.id))
            .unwrap_or_default();
        let output = format!("{}\n{}", compile_output, stdout).trim().to_string();

        Ok(ExecutionResult::new(status, output))
    }
}

/// Runner backed by the remote judge
#[derive(Debug, Clone)]
pub struct RemoteRunner {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RemoteRunner {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Submit to the judge and wait for the verdict
    pub async fn submit(&self, language_id: u32, source: &str, stdin: &str) -> Result<ExecutionResult> {
        let url = format!("{}/submissions", self.base_url.trim_end_matches('/'));
        let payload = SubmissionRequest::new(language_id, source, stdin);
        debug!("Submitting to {} (language_id={})", url, language_id);

        let submission: Submission = self
            .client
            .post(&url)
            .query(&[("base64_encoded", "true"), ("wait", "true")])
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(status) = &submission.status {
            info!(
                "Judge finished language_id={}: {} ({})",
                language_id, status.id, status.description
            );
        }
        submission.into_result()
    }
}

#[async_trait]
impl Runner for RemoteRunner {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        self.submit(request.language.judge_id(), &request.source, &request.stdin)
            .await
    }
}
