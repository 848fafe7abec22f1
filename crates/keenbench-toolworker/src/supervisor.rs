//! Owns the single tool-worker process: lazy spawn, request correlation,
//! per-call timeouts, and the restart policy (`spec.md` §4.4, §5).

use std::time::Duration;

use keenbench_error::{EngineError, ErrorCode};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::process::{ProcessError, WorkerProcess};
use crate::protocol::{get_info_request, WorkerRequest};
use crate::restart::RestartPolicy;

/// Default per-call timeout for non-render methods (`spec.md` §4.4).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Per-call timeout for the render family (`spec.md` §4.4).
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(300);

/// Lifecycle state of the supervised worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    /// No process has been spawned yet.
    Uninitialized,
    /// The process is running and has answered at least one request since
    /// its last (re)spawn.
    Ready,
    /// Restarts are exhausted; every call fails until [`ToolWorkerSupervisor::restart`].
    Unavailable,
}

struct State {
    process: Option<WorkerProcess>,
    lifecycle: Lifecycle,
    restart_policy: RestartPolicy,
    next_id: u64,
}

/// Supervises a single long-lived tool-worker subprocess for all
/// workbenches (`spec.md` §4.4, §5 "a single worker handles all
/// workbenches; it MUST tolerate interleaved requests").
///
/// Writes to the worker's stdin are serialized by the state mutex; there is
/// no worker-level parallelism in the contract, so a call holds the lock
/// for the duration of its request/response round trip.
pub struct ToolWorkerSupervisor {
    worker_path: String,
    state: Mutex<State>,
}

impl ToolWorkerSupervisor {
    /// Build a supervisor for the worker binary at `worker_path`. The
    /// process is not spawned until the first call.
    #[must_use]
    pub fn new(worker_path: impl Into<String>) -> Self {
        Self {
            worker_path: worker_path.into(),
            state: Mutex::new(State {
                process: None,
                lifecycle: Lifecycle::Uninitialized,
                restart_policy: RestartPolicy::new(),
                next_id: 1,
            }),
        }
    }

    /// Make a call with an explicit timeout, returning the worker's
    /// `result` payload.
    ///
    /// On crash, malformed response, or timeout: the in-flight call fails
    /// with `TOOL_WORKER_UNAVAILABLE` (`spec.md` §4.4 "in-flight requests
    /// at crash time fail with the same code"), the process is torn down,
    /// and a restart is scheduled per [`RestartPolicy`].
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, EngineError> {
        let mut state = self.state.lock().await;

        if state.lifecycle == Lifecycle::Unavailable {
            return Err(unavailable_error("tool worker restarts exhausted"));
        }

        if state.process.is_none() {
            self.ensure_ready_locked(&mut state).await?;
        }

        let id = state.next_id;
        state.next_id += 1;
        let request = WorkerRequest::new(id, method, params);

        let outcome = tokio::time::timeout(timeout, async {
            let process = state
                .process
                .as_mut()
                .expect("ensure_ready_locked populates process");
            process.send(&request).await?;
            loop {
                let response = process.recv().await?;
                if response.id == id {
                    return Ok::<_, ProcessError>(response);
                }
                tracing::warn!(
                    target: "tool_worker.supervisor",
                    expected = id,
                    got = response.id,
                    "discarding response for stale request id"
                );
            }
        })
        .await;

        match outcome {
            Ok(Ok(response)) => {
                state.restart_policy.record_success();
                state.lifecycle = Lifecycle::Ready;
                if let Some(err) = response.error {
                    Err(EngineError::new(ErrorCode::ValidationFailed, err.message))
                } else {
                    Ok(response.result.unwrap_or(Value::Null))
                }
            }
            Ok(Err(process_err)) => Err(self.handle_crash_locked(&mut state, process_err).await),
            Err(_elapsed) => {
                Err(self
                    .handle_crash_locked(&mut state, ProcessError::Exited)
                    .await)
            }
        }
    }

    /// Make a call using the default 120s timeout.
    pub async fn call_default(&self, method: &str, params: Value) -> Result<Value, EngineError> {
        self.call(method, params, DEFAULT_TIMEOUT).await
    }

    /// Make a call using the 300s render timeout.
    pub async fn call_render(&self, method: &str, params: Value) -> Result<Value, EngineError> {
        self.call(method, params, RENDER_TIMEOUT).await
    }

    /// Explicitly clear restart exhaustion and allow the next call to spawn
    /// a fresh process. The engine surfaces this as an operator action once
    /// `TOOL_WORKER_UNAVAILABLE` has been reported.
    pub async fn restart(&self) {
        let mut state = self.state.lock().await;
        if let Some(mut process) = state.process.take() {
            process.kill().await;
        }
        state.lifecycle = Lifecycle::Uninitialized;
        state.restart_policy = RestartPolicy::new();
    }

    async fn ensure_ready_locked(&self, state: &mut State) -> Result<(), EngineError> {
        let mut process = WorkerProcess::spawn(&self.worker_path).await.map_err(|e| {
            unavailable_error(format!("failed to spawn tool worker: {e}"))
        })?;

        let (method, params) = get_info_request();
        let request = WorkerRequest::new(0, method, params);
        let probe = tokio::time::timeout(DEFAULT_TIMEOUT, async {
            process.send(&request).await?;
            process.recv().await
        })
        .await;

        match probe {
            Ok(Ok(_response)) => {
                state.process = Some(process);
                state.lifecycle = Lifecycle::Ready;
                Ok(())
            }
            _ => {
                process.kill().await;
                Err(self.handle_crash_locked(state, ProcessError::Exited).await)
            }
        }
    }

    async fn handle_crash_locked(&self, state: &mut State, cause: ProcessError) -> EngineError {
        tracing::warn!(target: "tool_worker.supervisor", error = %cause, "tool worker crashed");
        if let Some(mut process) = state.process.take() {
            process.kill().await;
        }

        match state.restart_policy.record_crash() {
            Some(delay) => {
                state.lifecycle = Lifecycle::Uninitialized;
                tokio::time::sleep(delay).await;
            }
            None => {
                state.lifecycle = Lifecycle::Unavailable;
            }
        }

        unavailable_error(cause.to_string())
    }
}

fn unavailable_error(message: impl Into<String>) -> EngineError {
    EngineError::new(ErrorCode::ToolWorkerUnavailable, message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn call_against_missing_binary_fails_unavailable() {
        let supervisor = ToolWorkerSupervisor::new("/nonexistent/keenbench-tool-worker");
        let err = supervisor
            .call_default("WorkerGetInfo", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ToolWorkerUnavailable);
    }

    #[tokio::test]
    async fn three_consecutive_spawn_failures_exhaust_restarts() {
        let supervisor = ToolWorkerSupervisor::new("/nonexistent/keenbench-tool-worker");
        for _ in 0..3 {
            let _ = supervisor.call_default("WorkerGetInfo", Value::Null).await;
        }
        let err = supervisor
            .call_default("WorkerGetInfo", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ToolWorkerUnavailable);
        let state = supervisor.state.lock().await;
        assert_eq!(state.lifecycle, Lifecycle::Unavailable);
    }

    #[tokio::test]
    async fn restart_clears_unavailable_state() {
        let supervisor = ToolWorkerSupervisor::new("/nonexistent/keenbench-tool-worker");
        for _ in 0..4 {
            let _ = supervisor.call_default("WorkerGetInfo", Value::Null).await;
        }
        supervisor.restart().await;
        let state = supervisor.state.lock().await;
        assert_eq!(state.lifecycle, Lifecycle::Uninitialized);
        assert_eq!(state.restart_policy.consecutive_crashes(), 0);
    }
}
