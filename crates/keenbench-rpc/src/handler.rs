//! The dispatch seam between transport and business logic (`spec.md` §4.1:
//! "plain request/notification dispatcher; no business logic").
//!
//! Mirrors `keenbench-workshop::tool_exec::ToolExecutor`: this crate knows
//! nothing about what any method name means. `keenbench-engine` implements
//! [`RpcHandler`] to route each method to the right component.

use async_trait::async_trait;
use keenbench_error::EngineError;
use serde_json::Value;

/// Handles one dispatched JSON-RPC request and returns its `result` value.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    /// Execute `method` with `params`, returning the JSON `result` on
    /// success or a structured [`EngineError`] on failure.
    async fn handle(&self, method: &str, params: Value) -> Result<Value, EngineError>;
}
