//! Anthropic Messages API adapter.

use async_trait::async_trait;
use keenbench_core::model::ModelId;
use keenbench_error::{EngineError, ErrorCode};
use keenbench_transport::PolicyTransport;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{DeltaSink, ProviderClient};
use crate::errors::{map_status, map_transport_error};
use crate::normalize::normalize_tool_arguments;
use crate::registry::vendor_model_name;
use crate::types::{ChatMessage, ChatResult, ChatRole, FinishReason, RequestProfile, ToolCall, ToolChoice, ToolDef};

const BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Anthropic Messages API client.
pub struct AnthropicClient {
    transport: PolicyTransport,
    model: ModelId,
    api_key: String,
}

impl AnthropicClient {
    /// Build a client for `model`, authenticating with `api_key`.
    pub fn new(model: ModelId, api_key: String) -> Result<Self, EngineError> {
        Ok(Self {
            transport: PolicyTransport::for_provider(model.provider())?,
            model,
            api_key,
        })
    }

    fn build_request(&self, messages: &[ChatMessage], tools: &[ToolDef], profile: &RequestProfile, stream: bool) -> AnthropicRequest {
        let system = messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.clone());

        let messages = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(to_anthropic_message)
            .collect();

        let tool_choice = match profile.tool_choice {
            ToolChoice::Required => Some(AnthropicToolChoice { choice_type: "any".into() }),
            ToolChoice::Auto => Some(AnthropicToolChoice { choice_type: "auto".into() }),
            ToolChoice::None => Some(AnthropicToolChoice { choice_type: "none".into() }),
        };

        AnthropicRequest {
            model: vendor_model_name(&self.model),
            max_tokens: DEFAULT_MAX_TOKENS,
            system,
            messages,
            tools: tools.iter().map(to_anthropic_tool).collect(),
            tool_choice,
            stream,
        }
    }

    async fn send(&self, request: &AnthropicRequest) -> Result<reqwest::Response, EngineError> {
        self.transport
            .post(&format!("{BASE_URL}/messages"))?
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| map_transport_error("anthropic", e))
    }
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    async fn validate_key(&self) -> Result<(), EngineError> {
        let probe = AnthropicRequest {
            model: vendor_model_name(&self.model),
            max_tokens: 1,
            system: None,
            messages: vec![AnthropicMessage {
                role: "user".into(),
                content: vec![AnthropicContentBlock::Text { text: "ping".into() }],
            }],
            tools: vec![],
            tool_choice: None,
            stream: false,
        };
        let response = self.send(&probe).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(map_status("anthropic", status, &body))
        }
    }

    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        profile: &RequestProfile,
    ) -> Result<ChatResult, EngineError> {
        let request = self.build_request(messages, tools, profile, false);
        let response = self.send(&request).await?;
        let status = response.status();
        let body = response.text().await.map_err(|e| map_transport_error("anthropic", e))?;
        if !status.is_success() {
            return Err(map_status("anthropic", status, &body));
        }
        let parsed: AnthropicResponse = serde_json::from_str(&body)
            .map_err(|e| EngineError::new(ErrorCode::ProviderUnavailable, format!("malformed anthropic response: {e}")))?;
        Ok(from_anthropic_response(&parsed))
    }

    async fn stream_chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        profile: &RequestProfile,
        on_delta: &mut DeltaSink<'_>,
    ) -> Result<ChatResult, EngineError> {
        let request = self.build_request(messages, tools, profile, true);
        let response = self.send(&request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status("anthropic", status, &body));
        }
        let body = response.text().await.map_err(|e| map_transport_error("anthropic", e))?;

        let mut content = String::new();
        for line in body.lines() {
            let Some(data) = line.strip_prefix("data: ") else { continue };
            let Ok(event) = serde_json::from_str::<Value>(data) else { continue };
            if event.get("type").and_then(Value::as_str) == Some("content_block_delta") {
                if let Some(text) = event.pointer("/delta/text").and_then(Value::as_str) {
                    on_delta(text);
                    content.push_str(text);
                }
            }
        }

        // The Messages SSE stream does not replay a single final JSON body
        // the way the Responses API does; fall back to a non-streaming call
        // to recover structured tool calls once text streaming completes.
        let final_request = self.build_request(messages, tools, profile, false);
        let final_response = self.send(&final_request).await?;
        let final_body = final_response.text().await.map_err(|e| map_transport_error("anthropic", e))?;
        let parsed: AnthropicResponse = serde_json::from_str(&final_body)
            .map_err(|e| EngineError::new(ErrorCode::ProviderUnavailable, format!("malformed anthropic response: {e}")))?;
        let mut result = from_anthropic_response(&parsed);
        if !content.is_empty() {
            result.content = content;
        }
        Ok(result)
    }
}

fn to_anthropic_message(message: &ChatMessage) -> AnthropicMessage {
    if message.role == ChatRole::Tool {
        return AnthropicMessage {
            role: "user".into(),
            content: vec![AnthropicContentBlock::ToolResult {
                tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                content: Some(message.content.clone()),
            }],
        };
    }
    AnthropicMessage {
        role: if message.role == ChatRole::Assistant { "assistant".into() } else { "user".into() },
        content: vec![AnthropicContentBlock::Text { text: message.content.clone() }],
    }
}

fn to_anthropic_tool(def: &ToolDef) -> AnthropicToolDef {
    AnthropicToolDef {
        name: def.name.clone(),
        description: def.description.clone(),
        input_schema: def.parameters_schema.clone(),
    }
}

fn from_anthropic_response(response: &AnthropicResponse) -> ChatResult {
    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for block in &response.content {
        match block {
            AnthropicContentBlock::Text { text } => content.push_str(text),
            AnthropicContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                id: id.clone(),
                name: name.clone(),
                arguments: normalize_tool_arguments(input),
            }),
            AnthropicContentBlock::ToolResult { .. } => {}
        }
    }

    let finish_reason = match response.stop_reason.as_deref() {
        Some("tool_use") => FinishReason::ToolCalls,
        Some("max_tokens") => FinishReason::Length,
        _ => FinishReason::Stop,
    };
    ChatResult { content, tool_calls, finish_reason }
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicToolDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<AnthropicToolChoice>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicToolChoice {
    #[serde(rename = "type")]
    choice_type: String,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicToolDef {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use keenbench_core::model::ProviderId;

    #[test]
    fn system_message_is_lifted_out_of_messages_array() {
        let model = ModelId::new(ProviderId::Anthropic, "claude-sonnet-4-20250514");
        let client = AnthropicClient::new(model, "sk-ant-test".into()).unwrap();
        let profile = RequestProfile::first_turn(keenbench_core::model::ReasoningEffort::Medium);
        let messages = vec![ChatMessage::system("be terse"), ChatMessage::user("hi")];
        let request = client.build_request(&messages, &[], &profile, false);
        assert_eq!(request.system.as_deref(), Some("be terse"));
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn required_tool_choice_maps_to_any() {
        let model = ModelId::new(ProviderId::Anthropic, "claude-sonnet-4-20250514");
        let client = AnthropicClient::new(model, "sk-ant-test".into()).unwrap();
        let profile = RequestProfile::first_turn(keenbench_core::model::ReasoningEffort::Medium);
        let request = client.build_request(&[ChatMessage::user("hi")], &[], &profile, false);
        assert_eq!(request.tool_choice.unwrap().choice_type, "any");
    }

    #[test]
    fn response_with_tool_use_extracts_call() {
        let response = AnthropicResponse {
            content: vec![AnthropicContentBlock::ToolUse {
                id: "call-1".into(),
                name: "read_file".into(),
                input: serde_json::json!({"path": "a.txt"}),
            }],
            stop_reason: Some("tool_use".into()),
        };
        let result = from_anthropic_response(&response);
        assert_eq!(result.finish_reason, FinishReason::ToolCalls);
        assert_eq!(result.tool_calls[0].name, "read_file");
    }
}
