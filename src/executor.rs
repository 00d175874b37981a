//! Executor - single entry point for running code
//!
//! Routes each submission to the backend its language is bound to: the local
//! sandbox for the sandboxed language, the remote judge for everything else.
//! Both paths return the same `ExecutionResult`; judge transport failures are
//! returned as errors, never folded into a result.

use std::sync::Arc;

use tracing::debug;

use crate::config::AppConfig;
use crate::core::ExecutionResult;
use crate::error::Result;
use crate::languages::{Backend, Code};
use crate::runner::{ExecutionRequest, RemoteRunner, Runner, SandboxedRunner};
use crate::sandbox::{PythonWorkerSpawner, SandboxManager};

#[derive(Clone)]
pub struct Executor {
    sandboxed: Arc<dyn Runner>,
    remote: Arc<dyn Runner>,
}

impl Executor {
    pub fn new(sandboxed: impl Runner + 'static, remote: impl Runner + 'static) -> Self {
        Self {
            sandboxed: Arc::new(sandboxed),
            remote: Arc::new(remote),
        }
    }

    /// Build both backends from configuration. The sandbox worker starts lazily.
    pub fn from_config(config: &AppConfig) -> Self {
        let spawner =
            PythonWorkerSpawner::new(&config.python).with_memory_limit(config.worker_memory_mb);
        let manager = SandboxManager::new(spawner).with_grace(config.grace());
        let sandboxed = SandboxedRunner::new(manager).with_timeout_ms(config.sandbox_timeout_ms);
        let remote = RemoteRunner::new(&config.judge_url).with_timeout(config.request_timeout());

        Self::new(sandboxed, remote)
    }

    pub async fn submit(&self, code: &Code, stdin: &str) -> Result<ExecutionResult> {
        let request = ExecutionRequest::new(code, stdin);
        let runner = match code.language.backend() {
            Backend::Sandbox => &self.sandboxed,
            Backend::Remote(_) => &self.remote,
        };
        debug!("Submitting {} code via {:?}", code.language, code.language.backend());
        runner.run(&request).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::Status;
    use crate::error::Error;
    use crate::languages::Language;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Runner that answers from the request's stdin
    ///
    /// `transport` fails the call, `error...` gives a runtime error, anything
    /// else is echoed back as `{label}:{stdin}`.
    #[derive(Clone)]
    pub(crate) struct ScriptedRunner {
        label: &'static str,
        calls: Arc<Mutex<Vec<ExecutionRequest>>>,
    }

    impl ScriptedRunner {
        pub(crate) fn new(label: &'static str) -> Self {
            Self {
                label,
                calls: Arc::default(),
            }
        }

        pub(crate) fn calls(&self) -> Vec<ExecutionRequest> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl Runner for ScriptedRunner {
        async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
            self.calls.lock().push(request.clone());
            let stdin = request.stdin.trim();
            if stdin == "transport" {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "judge unreachable",
                )));
            }
            if stdin.starts_with("error") {
                return Ok(ExecutionResult::new(Status::RuntimeError, stdin));
            }
            Ok(ExecutionResult::new(
                Status::Accepted,
                format!("{}:{}", self.label, stdin),
            ))
        }
    }

    #[tokio::test]
    async fn test_python_goes_to_sandbox() {
        let sandboxed = ScriptedRunner::new("sandbox");
        let remote = ScriptedRunner::new("remote");
        let executor = Executor::new(sandboxed.clone(), remote.clone());

        let result = executor
            .submit(&Code::new("print(input())", Language::Python), "7")
            .await
            .unwrap();

        assert_eq!(result, ExecutionResult::new(Status::Accepted, "sandbox:7"));
        assert_eq!(sandboxed.calls().len(), 1);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_compiled_languages_go_to_judge() {
        let sandboxed = ScriptedRunner::new("sandbox");
        let remote = ScriptedRunner::new("remote");
        let executor = Executor::new(sandboxed.clone(), remote.clone());

        for language in [Language::C, Language::Cpp, Language::Java] {
            let result = executor
                .submit(&Code::new(language.template(), language), "1")
                .await
                .unwrap();
            assert_eq!(result.output, "remote:1");
        }

        let languages: Vec<Language> = remote.calls().iter().map(|r| r.language).collect();
        assert_eq!(languages, vec![Language::C, Language::Cpp, Language::Java]);
        assert!(sandboxed.calls().is_empty());
    }

    #[tokio::test]
    async fn test_judge_failure_propagates() {
        let executor = Executor::new(ScriptedRunner::new("sandbox"), ScriptedRunner::new("remote"));

        let err = executor
            .submit(&Code::new("int main(){}", Language::C), "transport")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sandbox_budget_includes_grace() {
        use crate::sandbox::manager::tests::{Behavior, FakeSpawner};

        let config = AppConfig {
            sandbox_timeout_ms: 1000,
            grace_ms: 100,
            ..AppConfig::default()
        };
        let manager = SandboxManager::new(FakeSpawner::new(vec![Behavior::Hang]))
            .with_grace(config.grace());
        let sandboxed = SandboxedRunner::new(manager).with_timeout_ms(config.sandbox_timeout_ms);
        let executor = Executor::new(sandboxed, ScriptedRunner::new("remote"));

        let start = tokio::time::Instant::now();
        let result = executor
            .submit(&Code::new("while True: pass", Language::Python), "")
            .await
            .unwrap();

        assert_eq!(result, ExecutionResult::new(Status::RuntimeError, "运行超时"));
        assert!(start.elapsed() >= std::time::Duration::from_millis(1100));
        assert!(start.elapsed() < std::time::Duration::from_millis(1200));
    }
}
