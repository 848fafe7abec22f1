//! OpenAI-family adapter, built against the Responses API so that
//! `reasoning_effort`, `tool_choice`, and `truncation` map directly onto
//! wire fields (`spec.md` §4.8 "Request profile").

use async_trait::async_trait;
use keenbench_core::model::{ModelId, ReasoningEffort};
use keenbench_error::{EngineError, ErrorCode};
use keenbench_transport::PolicyTransport;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::{DeltaSink, ProviderClient};
use crate::errors::{map_status, map_transport_error};
use crate::normalize::normalize_tool_arguments;
use crate::registry::vendor_model_name;
use crate::types::{ChatMessage, ChatResult, ChatRole, FinishReason, RequestProfile, ToolCall, ToolChoice, ToolDef};

const BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-family client, also used for any OpenAI-compatible endpoint that
/// needs the same strict/required-tool request shaping.
pub struct OpenAiClient {
    transport: PolicyTransport,
    model: ModelId,
    api_key: String,
}

impl OpenAiClient {
    /// Build a client for `model`, authenticating with `api_key`.
    pub fn new(model: ModelId, api_key: String) -> Result<Self, EngineError> {
        Ok(Self {
            transport: PolicyTransport::for_provider(model.provider())?,
            model,
            api_key,
        })
    }

    fn disallows_sampling_params(&self) -> bool {
        self.model.model().starts_with("gpt-5")
    }

    fn build_request(&self, messages: &[ChatMessage], tools: &[ToolDef], profile: &RequestProfile) -> OpenAiRequest {
        let input = messages.iter().map(to_responses_item).collect();
        let tools = tools.iter().map(|t| to_openai_tool(t, true)).collect();
        let tool_choice = match profile.tool_choice {
            ToolChoice::Required => "required",
            ToolChoice::Auto => "auto",
            ToolChoice::None => "none",
        }
        .to_string();

        OpenAiRequest {
            model: vendor_model_name(&self.model),
            input,
            tools,
            tool_choice,
            parallel_tool_calls: false,
            truncation: "disabled".to_string(),
            reasoning: Some(OpenAiReasoning {
                effort: effort_str(profile.reasoning_effort).to_string(),
            }),
            temperature: if self.disallows_sampling_params() { None } else { Some(0.0) },
            top_p: if self.disallows_sampling_params() { None } else { Some(1.0) },
            stream: false,
        }
    }
}

#[async_trait]
impl ProviderClient for OpenAiClient {
    async fn validate_key(&self) -> Result<(), EngineError> {
        let response = self
            .transport
            .get(&format!("{BASE_URL}/models"))?
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| map_transport_error("openai", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(map_status("openai", status, &body))
        }
    }

    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        profile: &RequestProfile,
    ) -> Result<ChatResult, EngineError> {
        let request = self.build_request(messages, tools, profile);
        let response = self
            .transport
            .post(&format!("{BASE_URL}/responses"))?
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error("openai", e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| map_transport_error("openai", e))?;
        if !status.is_success() {
            return Err(map_status("openai", status, &body));
        }

        let parsed: OpenAiResponse = serde_json::from_str(&body)
            .map_err(|e| EngineError::new(ErrorCode::ProviderUnavailable, format!("malformed openai response: {e}")))?;
        Ok(from_responses_output(&parsed))
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

        let response = self
            .transport
            .post(&format!("{BASE_URL}/responses"))?
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error("openai", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status("openai", status, &body));
        }

        let body = response.text().await.map_err(|e| map_transport_error("openai", e))?;
        let mut content = String::new();
        let mut final_event: Option<OpenAiResponse> = None;

        for line in body.lines() {
            let Some(data) = line.strip_prefix("data: ") else { continue };
            if data == "[DONE]" {
                break;
            }
            let Ok(event) = serde_json::from_str::<Value>(data) else { continue };
            match event.get("type").and_then(Value::as_str) {
                Some("response.output_text.delta") => {
                    if let Some(delta) = event.get("delta").and_then(Value::as_str) {
                        on_delta(delta);
                        content.push_str(delta);
                    }
                }
                Some("response.completed") => {
                    if let Some(response_value) = event.get("response") {
                        final_event = serde_json::from_value(response_value.clone()).ok();
                    }
                }
                _ => {}
            }
        }

        match final_event {
            Some(parsed) => Ok(from_responses_output(&parsed)),
            None => Ok(ChatResult {
                content,
                tool_calls: Vec::new(),
                finish_reason: FinishReason::Stop,
            }),
        }
    }
}

fn effort_str(effort: ReasoningEffort) -> &'static str {
    match effort {
        ReasoningEffort::None => "minimal",
        ReasoningEffort::Low => "low",
        ReasoningEffort::Medium => "medium",
        ReasoningEffort::High => "high",
        ReasoningEffort::Xhigh => "xhigh",
    }
}

fn to_responses_item(message: &ChatMessage) -> Value {
    match message.role {
        ChatRole::Tool => json!({
            "type": "function_call_output",
            "call_id": message.tool_call_id,
            "output": message.content,
        }),
        ChatRole::System => json!({"role": "system", "content": message.content}),
        ChatRole::User => json!({"role": "user", "content": message.content}),
        ChatRole::Assistant => json!({"role": "assistant", "content": message.content}),
    }
}

fn to_openai_tool(def: &ToolDef, strict: bool) -> Value {
    json!({
        "type": "function",
        "name": def.name,
        "description": def.description,
        "parameters": to_strict_schema(&def.parameters_schema),
        "strict": strict,
    })
}

/// Normalize a JSON Schema for OpenAI strict mode: every property must be
/// listed in `required` and `additionalProperties` must be `false`
/// (`spec.md` §4.8: "JSON Schemas normalized to strict-mode requirements").
fn to_strict_schema(schema: &Value) -> Value {
    let mut schema = schema.clone();
    let Value::Object(obj) = &mut schema else { return schema };

    if let Some(Value::Object(props)) = obj.get("properties") {
        let required: Vec<Value> = props.keys().map(|k| Value::String(k.clone())).collect();
        obj.insert("required".to_string(), Value::Array(required));
    }
    obj.insert("additionalProperties".to_string(), Value::Bool(false));
    schema
}

fn from_responses_output(response: &OpenAiResponse) -> ChatResult {
    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for item in &response.output {
        match item.item_type.as_str() {
            "message" => {
                for part in &item.content {
                    if let Some(text) = &part.text {
                        content.push_str(text);
                    }
                }
            }
            "function_call" => {
                if let (Some(call_id), Some(name)) = (&item.call_id, &item.name) {
                    let raw_args = item.arguments.clone().unwrap_or_else(|| Value::String(String::new()));
                    tool_calls.push(ToolCall {
                        id: call_id.clone(),
                        name: name.clone(),
                        arguments: normalize_tool_arguments(&raw_args),
                    });
                }
            }
            _ => {}
        }
    }

    let finish_reason = if tool_calls.is_empty() { FinishReason::Stop } else { FinishReason::ToolCalls };
    ChatResult {
        content,
        tool_calls,
        finish_reason,
    }
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiRequest {
    model: String,
    input: Vec<Value>,
    tools: Vec<Value>,
    tool_choice: String,
    parallel_tool_calls: bool,
    truncation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<OpenAiReasoning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiReasoning {
    effort: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    output: Vec<OpenAiOutputItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiOutputItem {
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    content: Vec<OpenAiOutputContent>,
    #[serde(default)]
    call_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiOutputContent {
    #[serde(default)]
    text: Option<String>,
}
