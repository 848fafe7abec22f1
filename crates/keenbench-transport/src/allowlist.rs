//! Per-provider host allowlists (`spec.md` §4.3).

use keenbench_core::model::ProviderId;

/// The hosts a provider's adapter is permitted to call.
#[must_use]
pub fn default_allowlist_for(provider: ProviderId) -> &'static [&'static str] {
    match provider {
        ProviderId::OpenAi => &["api.openai.com", "auth.openai.com"],
        ProviderId::Anthropic => &["api.anthropic.com"],
        ProviderId::Google => &["generativelanguage.googleapis.com"],
        ProviderId::Mistral => &["api.mistral.ai"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_provider_has_a_non_empty_allowlist() {
        for provider in [
            ProviderId::OpenAi,
            ProviderId::Anthropic,
            ProviderId::Google,
            ProviderId::Mistral,
        ] {
            assert!(!default_allowlist_for(provider).is_empty());
        }
    }

    #[test]
    fn openai_allowlist_includes_auth_host() {
        assert!(default_allowlist_for(ProviderId::OpenAi).contains(&"auth.openai.com"));
    }
}
