//! Provider-agnostic chat request/response shapes (`spec.md` §4.8).

use keenbench_core::model::ReasoningEffort;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single message in a chat history, in the order the provider should see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who produced the message.
    pub role: ChatRole,
    /// Message text. May be empty for an assistant message that only
    /// carries tool calls, or for a tool-result message (see `content` vs.
    /// `tool_call_id` usage below).
    pub content: String,
    /// Tool calls this message requests (assistant role only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Correlates a tool-role message with the originating [`ToolCall::id`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// A plain user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: text.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// A system prompt message.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: text.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// An assistant message reporting a tool's result.
    #[must_use]
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// The role a [`ChatMessage`] was authored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// Instructions to the model, not shown to the end user.
    System,
    /// A message from the end user.
    User,
    /// A message produced by the model.
    Assistant,
    /// The result of a tool call, addressed back to the model.
    Tool,
}

/// A tool the model may call, described by name, description, and a JSON
/// Schema for its arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool name, must be unique within a single request.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub parameters_schema: Value,
}

/// A single invocation of a tool requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlates with the subsequent tool-result message.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments, normalized to a JSON object even if the wire form sent a
    /// JSON string (`spec.md` §4.8: "Tool-call arguments may arrive as JSON
    /// string or object; adapters normalize").
    pub arguments: Value,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model produced a final answer with no further tool calls.
    Stop,
    /// The model requested one or more tool calls.
    ToolCalls,
    /// The response was truncated by a length limit.
    Length,
    /// Generation was stopped for content-policy reasons.
    ContentFilter,
}

/// The result of a (possibly streamed) chat-with-tools call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    /// Assistant text, if any.
    pub content: String,
    /// Tool calls the model requested, if any.
    pub tool_calls: Vec<ToolCall>,
    /// Why generation stopped.
    pub finish_reason: FinishReason,
}

/// Which tool(s), if any, the model must call this turn (`spec.md` §4.8:
/// "`tool_choice = required` on the first tool turn, `auto` afterwards").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    /// The model must call at least one tool.
    Required,
    /// The model decides whether to call a tool.
    Auto,
    /// The model must not call a tool.
    None,
}

/// Shapes a single chat-with-tools call (`spec.md` §4.8 "Request profile").
#[derive(Debug, Clone)]
pub struct RequestProfile {
    /// Reasoning effort for the active RPI phase.
    pub reasoning_effort: ReasoningEffort,
    /// Tool-choice mode for this turn.
    pub tool_choice: ToolChoice,
    /// Whether this is the first tool-calling turn of the run (affects
    /// `tool_choice` defaulting in adapters that derive it automatically).
    pub is_first_tool_turn: bool,
}

impl RequestProfile {
    /// A profile for the first turn of a tool-calling loop: tool choice is
    /// forced `required` so the model cannot simply end the turn with text.
    #[must_use]
    pub fn first_turn(reasoning_effort: ReasoningEffort) -> Self {
        Self {
            reasoning_effort,
            tool_choice: ToolChoice::Required,
            is_first_tool_turn: true,
        }
    }

    /// A profile for a subsequent turn: tool choice reverts to `auto`.
    #[must_use]
    pub fn subsequent_turn(reasoning_effort: ReasoningEffort) -> Self {
        Self {
            reasoning_effort,
            tool_choice: ToolChoice::Auto,
            is_first_tool_turn: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_message_carries_call_id() {
        let msg = ChatMessage::tool_result("call-1", "ok");
        assert_eq!(msg.role, ChatRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call-1"));
    }

    #[test]
    fn first_turn_forces_required_tool_choice() {
        let profile = RequestProfile::first_turn(ReasoningEffort::Medium);
        assert_eq!(profile.tool_choice, ToolChoice::Required);
        assert!(profile.is_first_tool_turn);
    }
}
