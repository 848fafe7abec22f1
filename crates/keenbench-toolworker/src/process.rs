//! Spawns and speaks line-delimited JSON to the tool-worker subprocess.
//!
//! Adapted from `sidecar-kit`'s `SidecarProcess`: stdin/stdout piped,
//! stderr forwarded to `tracing` on a background task, one JSON value per
//! line. The worker's wire shape is a flat request/response pair rather
//! than `sidecar-kit`'s tagged `Frame` enum, so the codec step collapses
//! to plain `serde_json::to_string`/`from_str`.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};

use crate::protocol::{WorkerRequest, WorkerResponse};

/// Errors internal to process spawning and line I/O, distinct from the
/// worker-reported [`crate::protocol::WorkerErrorPayload`].
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The subprocess could not be spawned.
    #[error("failed to spawn tool worker: {0}")]
    Spawn(#[source] std::io::Error),
    /// Writing the request line to stdin failed.
    #[error("failed to write to tool worker stdin: {0}")]
    Stdin(#[source] std::io::Error),
    /// Reading a response line from stdout failed.
    #[error("failed to read from tool worker stdout: {0}")]
    Stdout(#[source] std::io::Error),
    /// The subprocess closed stdout (exited or crashed).
    #[error("tool worker process exited")]
    Exited,
    /// A line on stdout was not valid JSON for [`WorkerResponse`].
    #[error("malformed tool worker response: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The request could not be serialized.
    #[error("failed to serialize tool worker request: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// A live handle to the spawned tool-worker process.
pub struct WorkerProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl WorkerProcess {
    /// Spawn the worker binary at `path`, piping stdio and forwarding
    /// stderr lines to `tracing::warn!` under the `tool_worker.stderr`
    /// target.
    pub async fn spawn(path: &str) -> Result<Self, ProcessError> {
        let mut child = tokio::process::Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ProcessError::Spawn)?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = BufReader::new(child.stdout.take().expect("piped stdout"));
        let stderr = child.stderr.take().expect("piped stderr");

        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::warn!(target: "tool_worker.stderr", "{line}");
            }
        });

        Ok(Self {
            child,
            stdin,
            stdout,
        })
    }

    /// Write one request as a JSON line.
    pub async fn send(&mut self, request: &WorkerRequest) -> Result<(), ProcessError> {
        let mut line = serde_json::to_string(request).map_err(ProcessError::Serialize)?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(ProcessError::Stdin)?;
        self.stdin.flush().await.map_err(ProcessError::Stdin)
    }

    /// Read one response line. Returns `Err(Exited)` on EOF.
    pub async fn recv(&mut self) -> Result<WorkerResponse, ProcessError> {
        let mut line = String::new();
        let n = self
            .stdout
            .read_line(&mut line)
            .await
            .map_err(ProcessError::Stdout)?;
        if n == 0 {
            return Err(ProcessError::Exited);
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            return Err(ProcessError::Exited);
        }
        serde_json::from_str(trimmed).map_err(ProcessError::Malformed)
    }

    /// Kill the subprocess and wait for it to exit.
    pub async fn kill(&mut self) {
        let _ = self.child.kill().await;
        let _ = self.child.wait().await;
    }
}
