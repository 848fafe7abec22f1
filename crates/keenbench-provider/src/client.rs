//! The unified provider client contract (`spec.md` §4.8).

use async_trait::async_trait;
use keenbench_error::EngineError;

use crate::types::{ChatMessage, ChatResult, RequestProfile, ToolDef};

/// A callback invoked with each streamed text delta as it arrives.
///
/// `spec.md` §5 "Provider streaming": the adapter presents a single delta
/// callback per streaming call; the orchestrator decides whether to
/// forward deltas to the UI (Summary phase) or capture them silently
/// (Research/Plan/Implement).
pub type DeltaSink<'a> = dyn FnMut(&str) + Send + 'a;

/// Unified contract every provider adapter implements (`spec.md` §4.8).
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Validate that the configured credential is accepted by the
    /// provider, without making a billed call where the provider's API
    /// allows a cheap validation path.
    async fn validate_key(&self) -> Result<(), EngineError>;

    /// Run one non-streaming chat-with-tools turn.
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        profile: &RequestProfile,
    ) -> Result<ChatResult, EngineError>;

    /// Run one streaming chat-with-tools turn, invoking `on_delta` for each
    /// text fragment as it arrives. Returns the same aggregate result shape
    /// as [`ProviderClient::chat_with_tools`] once the stream completes.
    async fn stream_chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        profile: &RequestProfile,
        on_delta: &mut DeltaSink<'_>,
    ) -> Result<ChatResult, EngineError>;
}
