//! The bridge between the agent loop's tool calls and whatever actually
//! executes them (tool-worker dispatch, Draft staging, recall cache, …).
//!
//! Kept as a trait so this crate never depends on `keenbench-toolworker`'s
//! process-supervision wiring directly; the engine binary implements it.

use async_trait::async_trait;
use keenbench_error::EngineError;
use serde_json::Value;

/// The result of executing one tool call.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    /// Whether the call succeeded.
    pub success: bool,
    /// Content returned to the model as the tool-result message (or the
    /// error message, on failure).
    pub content: String,
}

impl ToolOutcome {
    /// A successful outcome with the given content.
    #[must_use]
    pub fn ok(content: impl Into<String>) -> Self {
        Self { success: true, content: content.into() }
    }

    /// A failed outcome with the given message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, content: message.into() }
    }
}

/// Executes a single named tool call and returns its outcome.
///
/// Implementations never return `Err` for an ordinary tool failure (a bad
/// range, a missing sheet); that is reported as `ToolOutcome::failed` so the
/// model can see it and try again. `Err` is reserved for conditions the
/// agent loop itself must abort on (engine failure, sandbox violation).
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute `tool_name` with `arguments`, already normalized to a JSON
    /// object.
    async fn execute(&self, tool_name: &str, arguments: &Value) -> Result<ToolOutcome, EngineError>;
}
