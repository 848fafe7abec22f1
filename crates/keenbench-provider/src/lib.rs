//! Unified provider client adapters over OpenAI, Anthropic, Google, and
//! Mistral's heterogeneous wire protocols, plus the OAuth login flow shared
//! across providers that support it (`spec.md` §4.8).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod anthropic;
pub mod client;
pub mod errors;
pub mod google;
pub mod mistral;
pub mod normalize;
pub mod oauth;
pub mod openai;
pub mod registry;
pub mod types;

pub use anthropic::AnthropicClient;
pub use client::{DeltaSink, ProviderClient};
pub use errors::{map_status, map_transport_error};
pub use google::GoogleClient;
pub use mistral::MistralClient;
pub use normalize::normalize_tool_arguments;
pub use oauth::{start as oauth_start, FlowState, OAuthProviderConfig, PendingAuthorization};
pub use openai::OpenAiClient;
pub use registry::{supported_models, vendor_model_name, SupportedModel};
pub use types::{
    ChatMessage, ChatResult, ChatRole, FinishReason, RequestProfile, ToolCall, ToolChoice, ToolDef,
};

use keenbench_core::model::ModelId;
use keenbench_error::EngineError;

/// Build the concrete [`ProviderClient`] for `model`, authenticating with
/// `api_key`.
///
/// Callers that need OAuth credentials instead of a static API key resolve
/// the current access token themselves (refreshing via [`oauth::refresh_if_needed`]
/// if necessary) and pass it through as `api_key` here; every adapter takes
/// a bearer-style credential string regardless of how it was obtained.
pub fn build_client(model: ModelId, api_key: String) -> Result<Box<dyn ProviderClient>, EngineError> {
    use keenbench_core::model::ProviderId;

    Ok(match model.provider() {
        ProviderId::OpenAi => Box::new(OpenAiClient::new(model, api_key)?),
        ProviderId::Anthropic => Box::new(AnthropicClient::new(model, api_key)?),
        ProviderId::Google => Box::new(GoogleClient::new(model, api_key)?),
        ProviderId::Mistral => Box::new(MistralClient::new(model, api_key)?),
    })
}
