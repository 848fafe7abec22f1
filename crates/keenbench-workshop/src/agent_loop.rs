//! The tool-calling agent loop shared by Research, Plan, and Implement
//! (`spec.md` §4.9 "Agent loop (shared across R/P/I)").

use keenbench_core::model::ReasoningEffort;
use keenbench_error::{EngineError, ErrorCode};
use keenbench_provider::{ChatMessage, ChatRole, ProviderClient, RequestProfile, ToolChoice, ToolDef};
use serde_json::Value;
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::events::{WorkshopEvent, WorkshopNotifier};
use crate::loop_detection::{LoopGuard, LoopObservation};
use crate::tool_exec::ToolExecutor;

/// Tool calls requested in a single turn beyond this count are dropped with
/// a warning (`spec.md` §4.9: "Max tool-calls/turn = 50").
pub const MAX_TOOL_CALLS_PER_TURN: usize = 50;

/// What an agent-loop run produced.
#[derive(Debug, Clone)]
pub struct AgentLoopOutcome {
    /// The full message history, including every assistant/tool turn.
    pub messages: Vec<ChatMessage>,
    /// The final assistant text (empty if the loop exhausted `max_turns`
    /// while still mid-tool-call).
    pub final_text: String,
}

/// Run the shared agent loop: call the provider, execute any requested
/// tools in order, and repeat until the model stops calling tools or
/// `max_turns` is reached.
///
/// `tools` being empty is the Summary phase's single non-tool call; the
/// loop runs exactly one turn with `tool_choice = none` and returns.
///
/// `cancel` is checked after every provider response and after every tool
/// call (`spec.md` §5 "Cancellation and timeouts"); once set, the loop
/// returns `USER_CANCELED` without executing further tool calls.
pub async fn run_agent_loop(
    provider: &dyn ProviderClient,
    tools: &[ToolDef],
    mut messages: Vec<ChatMessage>,
    reasoning_effort: ReasoningEffort,
    executor: &dyn ToolExecutor,
    notifier: &dyn WorkshopNotifier,
    max_turns: usize,
    cancel: &CancelToken,
) -> Result<AgentLoopOutcome, EngineError> {
    let mut guard = LoopGuard::default();

    for turn in 0..max_turns.max(1) {
        let profile = if tools.is_empty() {
            RequestProfile { reasoning_effort, tool_choice: ToolChoice::None, is_first_tool_turn: turn == 0 }
        } else if turn == 0 {
            RequestProfile::first_turn(reasoning_effort)
        } else {
            RequestProfile::subsequent_turn(reasoning_effort)
        };

        let result = provider.chat_with_tools(&messages, tools, &profile).await?;

        if cancel.is_canceled() {
            return Err(canceled_error());
        }

        if result.tool_calls.is_empty() {
            messages.push(ChatMessage {
                role: ChatRole::Assistant,
                content: result.content.clone(),
                tool_calls: Vec::new(),
                tool_call_id: None,
            });
            return Ok(AgentLoopOutcome { messages, final_text: result.content });
        }

        let mut tool_calls = result.tool_calls;
        if tool_calls.len() > MAX_TOOL_CALLS_PER_TURN {
            let dropped = tool_calls.len() - MAX_TOOL_CALLS_PER_TURN;
            tracing::warn!(target: "keenbench.workshop", dropped, "turn requested more than MAX_TOOL_CALLS_PER_TURN tool calls");
            tool_calls.truncate(MAX_TOOL_CALLS_PER_TURN);
        }

        messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content: result.content,
            tool_calls: tool_calls.clone(),
            tool_call_id: None,
        });

        for call in &tool_calls {
            match guard.observe(&call.name, &call.arguments) {
                LoopObservation::Stop => {
                    return Err(EngineError::new(
                        ErrorCode::AgentLoopDetected,
                        format!("tool `{}` called with identical arguments repeatedly", call.name),
                    ));
                }
                LoopObservation::Warn => {
                    tracing::warn!(target: "keenbench.workshop", tool = %call.name, "repeated identical tool call, nearing loop threshold");
                }
                LoopObservation::Clear => {}
            }

            notifier.notify(WorkshopEvent::ToolExecuting { tool_name: call.name.clone(), tool_call_id: call.id.clone() });
            let outcome = execute_one(executor, &call.name, &call.arguments).await?;
            notifier.notify(WorkshopEvent::ToolComplete {
                tool_name: call.name.clone(),
                tool_call_id: call.id.clone(),
                success: outcome.success,
            });

            messages.push(ChatMessage::tool_result(call.id.clone(), outcome.content));

            if cancel.is_canceled() {
                return Err(canceled_error());
            }
        }
    }

    tracing::warn!(target: "keenbench.workshop", max_turns, "agent loop exhausted max_turns mid tool-call");
    Ok(AgentLoopOutcome { messages, final_text: String::new() })
}

fn canceled_error() -> EngineError {
    EngineError::new(ErrorCode::UserCanceled, "run canceled")
}

async fn execute_one(
    executor: &dyn ToolExecutor,
    tool_name: &str,
    arguments: &Value,
) -> Result<crate::tool_exec::ToolOutcome, EngineError> {
    executor.execute(tool_name, arguments).await
}

/// Generate a fresh correlation id for a tool call executed outside the
/// provider's own id scheme (e.g. synthetic recall-cache lookups).
#[must_use]
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
