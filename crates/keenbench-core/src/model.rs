//! Provider and model identifiers, and per-phase reasoning effort
//! (`spec.md` §3 "Provider profile", §4.2 "RPI loop", §4.8 "Provider request
//! shaping").

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A supported LLM provider family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// OpenAI and OpenAI-compatible endpoints.
    OpenAi,
    /// Anthropic.
    Anthropic,
    /// Google (Gemini).
    Google,
    /// Mistral.
    Mistral,
}

impl ProviderId {
    /// Stable lowercase identifier, as used in [`ModelId`] strings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Mistral => "mistral",
        }
    }

    /// Whether this provider's request profile needs OpenAI-family
    /// normalization (`parallel_tool_calls=false`, strict JSON schemas;
    /// `spec.md` §4.8).
    #[must_use]
    pub fn is_openai_family(self) -> bool {
        matches!(self, Self::OpenAi)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "google" => Ok(Self::Google),
            "mistral" => Ok(Self::Mistral),
            other => Err(format!("unknown provider id: {other}")),
        }
    }
}

/// A canonical `provider:model` identifier, e.g. `openai:gpt-4.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct ModelId {
    provider: ProviderId,
    model: String,
}

impl ModelId {
    /// Construct a `ModelId` directly from a provider and bare model name.
    #[must_use]
    pub fn new(provider: ProviderId, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// The provider component.
    #[must_use]
    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    /// The bare model name, without the provider prefix.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider.as_str(), self.model)
    }
}

impl FromStr for ModelId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, model) = s
            .split_once(':')
            .ok_or_else(|| format!("model id `{s}` is missing a `provider:` prefix"))?;
        if model.is_empty() {
            return Err(format!("model id `{s}` has an empty model name"));
        }
        Ok(Self {
            provider: provider.parse()?,
            model: model.to_string(),
        })
    }
}

impl TryFrom<String> for ModelId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelId> for String {
    fn from(value: ModelId) -> Self {
        value.to_string()
    }
}

/// Requested reasoning effort for a phase of the RPI loop (`spec.md` §4.2).
///
/// Providers that do not support a requested level fall back to
/// [`ReasoningEffort::Medium`] (`spec.md` §4.8) rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningEffort {
    /// No extended reasoning requested.
    None,
    /// Low effort.
    Low,
    /// Default effort.
    Medium,
    /// High effort.
    High,
    /// Maximum effort, where the provider supports it.
    Xhigh,
}

impl Default for ReasoningEffort {
    fn default() -> Self {
        Self::Medium
    }
}

impl ReasoningEffort {
    /// Normalize an effort level against a provider's supported set,
    /// falling back to [`ReasoningEffort::Medium`] when unsupported.
    #[must_use]
    pub fn normalize_for(self, supported: &[ReasoningEffort]) -> Self {
        if supported.contains(&self) {
            self
        } else {
            Self::Medium
        }
    }

    /// Parse a reasoning-effort string case-insensitively, falling back to
    /// [`ReasoningEffort::Medium`] for anything unrecognized rather than
    /// erroring (`spec.md` §4.2 "invalid values fall back to medium").
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "xhigh" => Self::Xhigh,
            _ => Self::Medium,
        }
    }
}

/// One of the three model-calling phases of the RPI loop that carry their
/// own reasoning-effort setting (`spec.md` §3 "settings.json", §4.9).
///
/// Summary is deliberately excluded: it is a single non-tool call and is
/// not independently configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RpiPhase {
    /// Read-only exploration phase.
    Research,
    /// Checklist-authoring phase.
    Plan,
    /// Tool-calling execution phase, run once per plan item.
    Implement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_id_round_trips_through_str() {
        for p in [
            ProviderId::OpenAi,
            ProviderId::Anthropic,
            ProviderId::Google,
            ProviderId::Mistral,
        ] {
            let s = p.as_str();
            assert_eq!(s.parse::<ProviderId>().unwrap(), p);
        }
    }

    #[test]
    fn model_id_parses_provider_and_model() {
        let id: ModelId = "openai:gpt-4.1".parse().unwrap();
        assert_eq!(id.provider(), ProviderId::OpenAi);
        assert_eq!(id.model(), "gpt-4.1");
        assert_eq!(id.to_string(), "openai:gpt-4.1");
    }

    #[test]
    fn model_id_rejects_missing_prefix() {
        assert!("gpt-4.1".parse::<ModelId>().is_err());
    }

    #[test]
    fn model_id_rejects_unknown_provider() {
        assert!("cohere:command".parse::<ModelId>().is_err());
    }

    #[test]
    fn model_id_json_round_trips_as_string() {
        let id = ModelId::new(ProviderId::Anthropic, "claude-sonnet");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"anthropic:claude-sonnet\"");
        let back: ModelId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn reasoning_effort_defaults_to_medium() {
        assert_eq!(ReasoningEffort::default(), ReasoningEffort::Medium);
    }

    #[test]
    fn reasoning_effort_falls_back_when_unsupported() {
        let supported = [ReasoningEffort::None, ReasoningEffort::Medium];
        assert_eq!(
            ReasoningEffort::Xhigh.normalize_for(&supported),
            ReasoningEffort::Medium
        );
        assert_eq!(
            ReasoningEffort::None.normalize_for(&supported),
            ReasoningEffort::None
        );
    }

    #[test]
    fn openai_family_detection() {
        assert!(ProviderId::OpenAi.is_openai_family());
        assert!(!ProviderId::Anthropic.is_openai_family());
    }

    #[test]
    fn parse_lenient_accepts_known_values_case_insensitively() {
        assert_eq!(ReasoningEffort::parse_lenient("HIGH"), ReasoningEffort::High);
        assert_eq!(ReasoningEffort::parse_lenient("none"), ReasoningEffort::None);
    }

    #[test]
    fn parse_lenient_falls_back_to_medium_for_garbage() {
        assert_eq!(
            ReasoningEffort::parse_lenient("maximum-overdrive"),
            ReasoningEffort::Medium
        );
    }

    #[test]
    fn rpi_phase_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(RpiPhase::Implement).unwrap(),
            serde_json::json!("implement")
        );
    }
}
