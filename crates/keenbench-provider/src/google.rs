//! Google Gemini `generateContent` adapter.

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

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini client.
pub struct GoogleClient {
    transport: PolicyTransport,
    model: ModelId,
    api_key: String,
}

impl GoogleClient {
    /// Build a client for `model`, authenticating with `api_key`.
    pub fn new(model: ModelId, api_key: String) -> Result<Self, EngineError> {
        Ok(Self {
            transport: PolicyTransport::for_provider(model.provider())?,
            model,
            api_key,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{BASE_URL}/models/{}:{method}?key={}", vendor_model_name(&self.model), self.api_key)
    }

    fn build_request(&self, messages: &[ChatMessage], tools: &[ToolDef], profile: &RequestProfile) -> GeminiRequest {
        let system_instruction = messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text { text: m.content.clone() }],
            });

        let contents = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(to_gemini_content)
            .collect();

        let tools = if tools.is_empty() {
            vec![]
        } else {
            vec![GeminiToolGroup {
                function_declarations: tools.iter().map(to_gemini_function).collect(),
            }]
        };

        let mode = match profile.tool_choice {
            ToolChoice::Required => "ANY",
            ToolChoice::Auto => "AUTO",
            ToolChoice::None => "NONE",
        };

        GeminiRequest {
            contents,
            system_instruction,
            tools,
            tool_config: GeminiToolConfig {
                function_calling_config: GeminiFunctionCallingConfig { mode: mode.to_string() },
            },
        }
    }
}

#[async_trait]
impl ProviderClient for GoogleClient {
    async fn validate_key(&self) -> Result<(), EngineError> {
        let response = self
            .transport
            .get(&format!("{BASE_URL}/models?key={}", self.api_key))?
            .send()
            .await
            .map_err(|e| map_transport_error("google", e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(map_status("google", status, &body))
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
            .post(&self.endpoint("generateContent"))?
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error("google", e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| map_transport_error("google", e))?;
        if !status.is_success() {
            return Err(map_status("google", status, &body));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| EngineError::new(ErrorCode::ProviderUnavailable, format!("malformed gemini response: {e}")))?;
        Ok(from_gemini_response(&parsed))
    }

    async fn stream_chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        profile: &RequestProfile,
        on_delta: &mut DeltaSink<'_>,
    ) -> Result<ChatResult, EngineError> {
        // Gemini's streamGenerateContent returns a JSON array of partial
        // GenerateContentResponse objects rather than SSE; read the whole
        // body and replay each element's text parts as a delta.
        let request = self.build_request(messages, tools, profile);
        let response = self
            .transport
            .post(&self.endpoint("streamGenerateContent"))?
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error("google", e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| map_transport_error("google", e))?;
        if !status.is_success() {
            return Err(map_status("google", status, &body));
        }

        let chunks: Vec<GeminiResponse> = serde_json::from_str(&body)
            .map_err(|e| EngineError::new(ErrorCode::ProviderUnavailable, format!("malformed gemini stream: {e}")))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        let mut finish_reason = FinishReason::Stop;
        for chunk in &chunks {
            let result = from_gemini_response(chunk);
            if !result.content.is_empty() {
                on_delta(&result.content);
            }
            content.push_str(&result.content);
            tool_calls.extend(result.tool_calls);
            finish_reason = result.finish_reason;
        }

        Ok(ChatResult { content, tool_calls, finish_reason })
    }
}

fn to_gemini_content(message: &ChatMessage) -> GeminiContent {
    if message.role == ChatRole::Tool {
        return GeminiContent {
            role: Some("function".into()),
            parts: vec![GeminiPart::FunctionResponse {
                function_response: GeminiFunctionResponse {
                    name: message.tool_call_id.clone().unwrap_or_default(),
                    response: serde_json::json!({"result": message.content}),
                },
            }],
        };
    }
    GeminiContent {
        role: Some(if message.role == ChatRole::Assistant { "model".into() } else { "user".into() }),
        parts: vec![GeminiPart::Text { text: message.content.clone() }],
    }
}

fn to_gemini_function(def: &ToolDef) -> GeminiFunctionDeclaration {
    GeminiFunctionDeclaration {
        name: def.name.clone(),
        description: def.description.clone(),
        parameters: def.parameters_schema.clone(),
    }
}

fn from_gemini_response(response: &GeminiResponse) -> ChatResult {
    let mut content = String::new();
    let mut tool_calls = Vec::new();
    let mut call_index = 0usize;

    if let Some(candidate) = response.candidates.first() {
        for part in &candidate.content.parts {
            match part {
                GeminiPart::Text { text } => content.push_str(text),
                GeminiPart::FunctionCall { function_call } => {
                    tool_calls.push(ToolCall {
                        id: format!("gemini-call-{call_index}"),
                        name: function_call.name.clone(),
                        arguments: normalize_tool_arguments(&function_call.args),
                    });
                    call_index += 1;
                }
                GeminiPart::FunctionResponse { .. } => {}
            }
        }
    }

    let finish_reason = if tool_calls.is_empty() { FinishReason::Stop } else { FinishReason::ToolCalls };
    ChatResult { content, tool_calls, finish_reason }
}

#[derive(Debug, Clone, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiToolGroup>,
    tool_config: GeminiToolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiToolGroup {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiToolConfig {
    #[serde(rename = "functionCallingConfig")]
    function_calling_config: GeminiFunctionCallingConfig,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiFunctionCallingConfig {
    mode: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use keenbench_core::model::ProviderId;

    #[test]
    fn required_tool_choice_maps_to_any_mode() {
        let model = ModelId::new(ProviderId::Google, "gemini-pro");
        let client = GoogleClient::new(model, "key".into()).unwrap();
        let profile = RequestProfile::first_turn(keenbench_core::model::ReasoningEffort::Medium);
        let request = client.build_request(&[ChatMessage::user("hi")], &[], &profile);
        assert_eq!(request.tool_config.function_calling_config.mode, "ANY");
    }

    #[test]
    fn system_message_becomes_system_instruction() {
        let model = ModelId::new(ProviderId::Google, "gemini-pro");
        let client = GoogleClient::new(model, "key".into()).unwrap();
        let profile = RequestProfile::first_turn(keenbench_core::model::ReasoningEffort::Medium);
        let messages = vec![ChatMessage::system("be terse"), ChatMessage::user("hi")];
        let request = client.build_request(&messages, &[], &profile);
        assert!(request.system_instruction.is_some());
        assert_eq!(request.contents.len(), 1);
    }

    #[test]
    fn response_with_function_call_extracts_tool_call() {
        let response = GeminiResponse {
            candidates: vec![GeminiCandidate {
                content: GeminiContent {
                    role: Some("model".into()),
                    parts: vec![GeminiPart::FunctionCall {
                        function_call: GeminiFunctionCall {
                            name: "read_file".into(),
                            args: serde_json::json!({"path": "a.txt"}),
                        },
                    }],
                },
            }],
        };
        let result = from_gemini_response(&response);
        assert_eq!(result.finish_reason, FinishReason::ToolCalls);
        assert_eq!(result.tool_calls[0].name, "read_file");
    }
}
