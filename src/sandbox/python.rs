//! Python sandbox worker
//!
//! The worker is a long-lived `python3` child running an embedded driver. The
//! driver reads one `WorkerRequest` JSON per line, runs it in a forked copy of
//! itself under a deadline and answers with the raw outcome; the task owning
//! the child turns that outcome into a judge-compatible `WorkerResponse`.
//! Requests are handled one at a time.
//!
//! The driver applies its own rlimits at startup (the memory limit is passed
//! as its only argument) and moves the protocol off fds 0 and 1, so nothing a
//! program prints can reach the reply stream.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::protocol::{WorkerRequest, WorkerResponse};
use super::translate;
use super::worker::{WorkerChannel, WorkerSpawner};
use crate::core::{Diagnostic, ExecutionResult};
use crate::error::{Error, Result};

const DRIVER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/driver.py"));

/// Raw outcome reported by the driver
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DriverOutcome {
    Ok {
        stdout: String,
    },
    Error {
        stdout: String,
        name: String,
        message: String,
        /// Line of the program the exception points at, when the driver found one
        #[serde(default)]
        line: Option<u32>,
    },
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: u64,
    #[serde(flatten)]
    outcome: DriverOutcome,
}

impl DriverOutcome {
    fn into_result(self) -> ExecutionResult {
        match self {
            DriverOutcome::Ok { stdout } => translate::success(&stdout),
            DriverOutcome::Error {
                stdout,
                name,
                message,
                line,
            } => translate::failure(&stdout, &name, &message)
                .with_diagnostic(Diagnostic::new(name, message, line)),
        }
    }
}

/// Spawns Python driver processes
#[derive(Debug, Clone)]
pub struct PythonWorkerSpawner {
    program: PathBuf,
    memory_mb: u64,
}

impl PythonWorkerSpawner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            memory_mb: 512,
        }
    }

    pub fn with_memory_limit(mut self, memory_mb: u64) -> Self {
        self.memory_mb = memory_mb;
        self
    }

    fn command(&self) -> Command {
        let memory_bytes = self.memory_mb.saturating_mul(1024 * 1024);

        let mut cmd = Command::new(&self.program);
        cmd.args(["-u", "-I", "-B", "-c", DRIVER])
            .arg(memory_bytes.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // The driver forks one process per run; a group lets teardown reach them all
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}

/// Kills the driver's whole process group when dropped
#[cfg(unix)]
struct ProcessGroupGuard(Option<u32>);

#[cfg(unix)]
impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let Some(pgid) = self.0.and_then(|pid| i32::try_from(pid).ok()) else {
            return;
        };
        if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            debug!("Process group {} already gone: {}", pgid, e);
        }
    }
}

impl WorkerSpawner for PythonWorkerSpawner {
    fn spawn(&self) -> Result<WorkerChannel> {
        let mut child = self.command().spawn().map_err(Error::WorkerSpawn)?;
        let missing = |what: &str| {
            Error::WorkerSpawn(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("worker {} not captured", what),
            ))
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let pid = child.id();

        let (requests, inbox) = mpsc::unbounded_channel();
        let (outbox, responses) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            // The child lives exactly as long as this task
            let _child = child;
            #[cfg(unix)]
            let _group = ProcessGroupGuard(pid);
            match serve(BufReader::new(stdout), stdin, inbox, outbox).await {
                Ok(()) => debug!("Python worker {:?} shut down", pid),
                Err(e) => warn!("Python worker {:?} failed: {}", pid, e),
            }
        });
        info!("Spawned Python worker {:?}", pid);

        Ok(WorkerChannel {
            requests,
            responses,
            task,
        })
    }
}

/// Bridge manager messages to the driver's line protocol until either side closes
pub(crate) async fn serve<R, W>(
    mut reader: R,
    mut writer: W,
    mut inbox: mpsc::UnboundedReceiver<WorkerRequest>,
    outbox: mpsc::UnboundedSender<WorkerResponse>,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(request) = inbox.recv().await {
        let id = request.id;
        let mut frame = serde_json::to_vec(&request)?;
        frame.push(b'\n');
        writer.write_all(&frame).await?;
        writer.flush().await?;

        let reply = read_reply(&mut reader, id).await?;
        let response = WorkerResponse::new(id, reply.outcome.into_result());
        if outbox.send(response).is_err() {
            break;
        }
    }
    Ok(())
}

async fn read_reply<R>(reader: &mut R, id: u64) -> io::Result<DriverReply>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "driver closed its output",
            ));
        }

        match serde_json::from_str::<DriverReply>(line.trim()) {
            Ok(reply) if reply.id == id => return Ok(reply),
            Ok(reply) => warn!("Ignoring driver reply {} while waiting for {}", reply.id, id),
            Err(e) => warn!("Ignoring malformed driver output: {}", e),
        }
    }
}
