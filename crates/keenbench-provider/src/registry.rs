//! Canonical `provider:model` IDs to vendor API model-name aliases
//! (`spec.md` §4.8 "Model registry").
//!
//! A single centralized mapping, rather than one lookup table per adapter,
//! so a rename only needs to happen in one place.

use keenbench_core::model::{ModelId, ProviderId};
use serde::Serialize;

/// One entry of the static `ModelsListSupported` catalog (`spec.md` §6).
#[derive(Debug, Clone, Serialize)]
pub struct SupportedModel {
    /// Canonical `provider:model` id, e.g. `openai:gpt-4.1`.
    pub model_id: String,
    /// The provider family this model belongs to.
    pub provider_id: &'static str,
    /// Short human-readable name for the settings UI.
    pub display_name: &'static str,
}

/// The static catalog of models KeenBench knows how to drive, one row per
/// supported `provider:model` pair (`spec.md` §6 "ModelsListSupported").
///
/// This is a fixed list rather than a live per-provider lookup: none of
/// the four adapters expose a models-listing endpoint this crate already
/// calls, and a fixed catalog is also what keeps [`vendor_model_name`]'s
/// alias table and the settings UI's dropdown in agreement.
#[must_use]
pub fn supported_models() -> Vec<SupportedModel> {
    CATALOG
        .iter()
        .map(|&(provider, model, display_name)| SupportedModel {
            model_id: ModelId::new(provider, model).to_string(),
            provider_id: provider.as_str(),
            display_name,
        })
        .collect()
}

const CATALOG: &[(ProviderId, &str, &str)] = &[
    (ProviderId::OpenAi, "gpt-5", "GPT-5"),
    (ProviderId::OpenAi, "gpt-4.1", "GPT-4.1"),
    (ProviderId::Anthropic, "claude-sonnet-4-20250514", "Claude Sonnet 4"),
    (ProviderId::Google, "gemini-pro", "Gemini 1.5 Pro"),
    (ProviderId::Google, "gemini-flash", "Gemini 1.5 Flash"),
    (ProviderId::Mistral, "mistral-large", "Mistral Large"),
    (ProviderId::Mistral, "mistral-small", "Mistral Small"),
];

/// Resolve a canonical [`ModelId`] to the model name string the provider's
/// wire API expects, applying any known alias.
///
/// Models with no alias entry pass through unchanged: not every canonical
/// model name differs from its vendor name.
#[must_use]
pub fn vendor_model_name(model: &ModelId) -> String {
    let bare = model.model();
    ALIASES
        .iter()
        .find(|(canonical, _)| *canonical == bare)
        .map(|(_, vendor)| (*vendor).to_string())
        .unwrap_or_else(|| bare.to_string())
}

/// `(canonical bare model name, vendor API model name)` pairs.
const ALIASES: &[(&str, &str)] = &[
    ("mistral-large", "mistral-large-latest"),
    ("mistral-small", "mistral-small-latest"),
    ("gemini-pro", "gemini-1.5-pro"),
    ("gemini-flash", "gemini-1.5-flash"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use keenbench_core::model::ProviderId;

    #[test]
    fn known_alias_is_rewritten() {
        let id = ModelId::new(ProviderId::Mistral, "mistral-large");
        assert_eq!(vendor_model_name(&id), "mistral-large-latest");
    }

    #[test]
    fn unknown_model_passes_through() {
        let id = ModelId::new(ProviderId::OpenAi, "gpt-4.1");
        assert_eq!(vendor_model_name(&id), "gpt-4.1");
    }
}
