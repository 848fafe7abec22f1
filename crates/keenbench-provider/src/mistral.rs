//! Mistral adapter, built against Mistral's OpenAI-Chat-Completions-compatible
//! `/v1/chat/completions` endpoint. Mistral's API has no `reasoning` or
//! `truncation` concept, so the request profile's reasoning effort is
//! dropped rather than mapped (`spec.md` §4.8 only requires those fields
//! where the provider supports them).

use async_trait::async_trait;
use keenbench_core::model::ModelId;
use keenbench_error::{EngineError, ErrorCode};
use keenbench_transport::PolicyTransport;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::{DeltaSink, ProviderClient};
use crate::errors::{map_status, map_transport_error};
use crate::normalize::normalize_tool_arguments;
use crate::registry::vendor_model_name;
use crate::types::{ChatMessage, ChatResult, ChatRole, FinishReason, RequestProfile, ToolCall, ToolChoice, ToolDef};

const BASE_URL: &str = "https://api.mistral.ai/v1";

/// Mistral client.
pub struct MistralClient {
    transport: PolicyTransport,
    model: ModelId,
    api_key: String,
}

impl MistralClient {
    /// Build a client for `model`, authenticating with `api_key`.
    pub fn new(model: ModelId, api_key: String) -> Result<Self, EngineError> {
        Ok(Self {
            transport: PolicyTransport::for_provider(model.provider())?,
            model,
            api_key,
        })
    }

    fn build_request(&self, messages: &[ChatMessage], tools: &[ToolDef], profile: &RequestProfile) -> MistralRequest {
        let tool_choice = match profile.tool_choice {
            ToolChoice::Required => "any",
            ToolChoice::Auto => "auto",
            ToolChoice::None => "none",
        }
        .to_string();

        MistralRequest {
            model: vendor_model_name(&self.model),
            messages: messages.iter().map(to_mistral_message).collect(),
            tools: tools.iter().map(to_mistral_tool).collect(),
            tool_choice,
            temperature: 0.0,
            top_p: 1.0,
            stream: false,
        }
    }

    async fn send(&self, request: &MistralRequest) -> Result<reqwest::Response, EngineError> {
        self.transport
            .post(&format!("{BASE_URL}/chat/completions"))?
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| map_transport_error("mistral", e))
    }
}

#[async_trait]
impl ProviderClient for MistralClient {
    async fn validate_key(&self) -> Result<(), EngineError> {
        let response = self
            .transport
            .get(&format!("{BASE_URL}/models"))?
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| map_transport_error("mistral", e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(map_status("mistral", status, &body))
        }
    }

    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        profile: &RequestProfile,
    ) -> Result<ChatResult, EngineError> {
        let request = self.build_request(messages, tools, profile);
        let response = self.send(&request).await?;
        let status = response.status();
        let body = response.text().await.map_err(|e| map_transport_error("mistral", e))?;
        if !status.is_success() {
            return Err(map_status("mistral", status, &body));
        }
        let parsed: MistralResponse = serde_json::from_str(&body)
            .map_err(|e| EngineError::new(ErrorCode::ProviderUnavailable, format!("malformed mistral response: {e}")))?;
        Ok(from_mistral_response(&parsed))
    }

    async fn stream_chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        profile: &RequestProfile,
        on_delta: &mut DeltaSink<'_>,
    ) -> Result<ChatResult, EngineError> {
        let mut request = self.build_request(messages, tools, profile);
        request.stream = true;

        let response = self.send(&request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status("mistral", status, &body));
        }
        let body = response.text().await.map_err(|e| map_transport_error("mistral", e))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        let mut finish_reason = FinishReason::Stop;

        for line in body.lines() {
            let Some(data) = line.strip_prefix("data: ") else { continue };
            if data == "[DONE]" {
                break;
            }
            let Ok(chunk) = serde_json::from_str::<MistralStreamChunk>(data) else { continue };
            let Some(choice) = chunk.choices.first() else { continue };
            if let Some(delta) = &choice.delta.content {
                on_delta(delta);
                content.push_str(delta);
            }
            for call in &choice.delta.tool_calls {
                tool_calls.push(ToolCall {
                    id: call.id.clone(),
                    name: call.function.name.clone(),
                    arguments: normalize_tool_arguments(&Value::String(call.function.arguments.clone())),
                });
            }
            if let Some(reason) = &choice.finish_reason {
                finish_reason = match reason.as_str() {
                    "tool_calls" => FinishReason::ToolCalls,
                    "length" => FinishReason::Length,
                    "content_filter" => FinishReason::ContentFilter,
                    _ => FinishReason::Stop,
                };
            }
        }

        Ok(ChatResult { content, tool_calls, finish_reason })
    }
}

fn to_mistral_message(message: &ChatMessage) -> MistralMessage {
    let role = match message.role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::Tool => "tool",
    }
    .to_string();

    MistralMessage {
        role,
        content: message.content.clone(),
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn to_mistral_tool(def: &ToolDef) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": def.name,
            "description": def.description,
            "parameters": def.parameters_schema,
        },
    })
}

fn from_mistral_response(response: &MistralResponse) -> ChatResult {
    let Some(choice) = response.choices.first() else {
        return ChatResult { content: String::new(), tool_calls: Vec::new(), finish_reason: FinishReason::Stop };
    };

    let tool_calls = choice
        .message
        .tool_calls
        .iter()
        .map(|call| ToolCall {
            id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: normalize_tool_arguments(&Value::String(call.function.arguments.clone())),
        })
        .collect::<Vec<_>>();

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("tool_calls") => FinishReason::ToolCalls,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        _ if !tool_calls.is_empty() => FinishReason::ToolCalls,
        _ => FinishReason::Stop,
    };

    ChatResult {
        content: choice.message.content.clone().unwrap_or_default(),
        tool_calls,
        finish_reason,
    }
}

#[derive(Debug, Clone, Serialize)]
struct MistralRequest {
    model: String,
    messages: Vec<MistralMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    tool_choice: String,
    temperature: f64,
    top_p: f64,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct MistralMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct MistralResponse {
    #[serde(default)]
    choices: Vec<MistralChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct MistralChoice {
    message: MistralResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct MistralResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<MistralToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
struct MistralToolCall {
    id: String,
    function: MistralFunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
struct MistralFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MistralStreamChunk {
    #[serde(default)]
    choices: Vec<MistralStreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct MistralStreamChoice {
    delta: MistralStreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct MistralStreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<MistralToolCall>,
}
