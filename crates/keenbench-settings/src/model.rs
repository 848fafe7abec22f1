//! `settings.json` schema (`spec.md` §3, §4.2).

use std::collections::BTreeMap;

use keenbench_core::model::{ModelId, ProviderId, ReasoningEffort, RpiPhase};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Current `settings.json` schema version.
pub const SCHEMA_VERSION: u32 = 1;

fn deserialize_effort_lenient<'de, D>(deserializer: D) -> Result<ReasoningEffort, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(ReasoningEffort::parse_lenient(&raw))
}

/// Per-provider settings: whether it is usable, and the reasoning effort
/// requested for each RPI phase that takes one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProviderSettings {
    /// Whether this provider is enabled for use.
    #[serde(default)]
    pub enabled: bool,
    /// Reasoning effort for the Research phase.
    #[serde(default, deserialize_with = "deserialize_effort_lenient")]
    pub rpi_research_reasoning_effort: ReasoningEffort,
    /// Reasoning effort for the Plan phase.
    #[serde(default, deserialize_with = "deserialize_effort_lenient")]
    pub rpi_plan_reasoning_effort: ReasoningEffort,
    /// Reasoning effort for the Implement phase.
    #[serde(default, deserialize_with = "deserialize_effort_lenient")]
    pub rpi_implement_reasoning_effort: ReasoningEffort,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            rpi_research_reasoning_effort: ReasoningEffort::Medium,
            rpi_plan_reasoning_effort: ReasoningEffort::Medium,
            rpi_implement_reasoning_effort: ReasoningEffort::Medium,
        }
    }
}

impl ProviderSettings {
    /// The effort configured for a given phase.
    #[must_use]
    pub fn effort_for(&self, phase: RpiPhase) -> ReasoningEffort {
        match phase {
            RpiPhase::Research => self.rpi_research_reasoning_effort,
            RpiPhase::Plan => self.rpi_plan_reasoning_effort,
            RpiPhase::Implement => self.rpi_implement_reasoning_effort,
        }
    }

    fn effort_for_mut(&mut self, phase: RpiPhase) -> &mut ReasoningEffort {
        match phase {
            RpiPhase::Research => &mut self.rpi_research_reasoning_effort,
            RpiPhase::Plan => &mut self.rpi_plan_reasoning_effort,
            RpiPhase::Implement => &mut self.rpi_implement_reasoning_effort,
        }
    }

    /// Set the effort configured for a given phase.
    pub fn set_effort_for(&mut self, phase: RpiPhase, effort: ReasoningEffort) {
        *self.effort_for_mut(phase) = effort;
    }
}

/// Whether provider calls require explicit consent per scope, or are
/// allowed unconditionally (`spec.md` §3 "user_consent_mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConsentMode {
    /// Every new (provider, model, scope) combination requires consent.
    Ask,
    /// All provider calls are allowed without a consent prompt.
    AllowAll,
}

impl Default for ConsentMode {
    fn default() -> Self {
        Self::Ask
    }
}

/// The full contents of `settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SettingsFile {
    /// Schema version, for forward migration.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Settings per provider, keyed by canonical provider id string.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderSettings>,
    /// The model the UI preselects for new workbenches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_default_model_id: Option<ModelId>,
    /// Global consent policy.
    #[serde(default)]
    pub user_consent_mode: ConsentMode,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            providers: BTreeMap::new(),
            user_default_model_id: None,
            user_consent_mode: ConsentMode::default(),
        }
    }
}

/// All known provider ids, in the canonical registry order.
pub const ALL_PROVIDERS: [ProviderId; 4] = [
    ProviderId::OpenAi,
    ProviderId::Anthropic,
    ProviderId::Google,
    ProviderId::Mistral,
];

impl SettingsFile {
    /// Insert default entries for any provider missing from `providers`
    /// (`spec.md` §4.2 "backfills missing providers to defaults").
    pub fn backfill_defaults(&mut self) {
        for provider in ALL_PROVIDERS {
            self.providers
                .entry(provider.as_str().to_string())
                .or_default();
        }
    }

    /// Settings for a provider, backfilled with defaults if absent.
    #[must_use]
    pub fn provider(&self, provider: ProviderId) -> ProviderSettings {
        self.providers
            .get(provider.as_str())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_file_has_current_schema_version() {
        assert_eq!(SettingsFile::default().schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn backfill_adds_all_known_providers() {
        let mut file = SettingsFile::default();
        file.backfill_defaults();
        assert_eq!(file.providers.len(), ALL_PROVIDERS.len());
        assert!(file.providers.contains_key("openai"));
        assert!(file.providers.contains_key("mistral"));
    }

    #[test]
    fn backfill_does_not_clobber_existing_entries() {
        let mut file = SettingsFile::default();
        let mut custom = ProviderSettings::default();
        custom.enabled = true;
        file.providers.insert("openai".into(), custom);
        file.backfill_defaults();
        assert!(file.providers["openai"].enabled);
    }

    #[test]
    fn invalid_effort_string_falls_back_to_medium() {
        let json = r#"{
            "enabled": true,
            "rpi_research_reasoning_effort": "ultra",
            "rpi_plan_reasoning_effort": "LOW",
            "rpi_implement_reasoning_effort": "medium"
        }"#;
        let settings: ProviderSettings = serde_json::from_str(json).unwrap();
        assert_eq!(
            settings.rpi_research_reasoning_effort,
            ReasoningEffort::Medium
        );
        assert_eq!(settings.rpi_plan_reasoning_effort, ReasoningEffort::Low);
    }

    #[test]
    fn effort_for_phase_get_and_set() {
        let mut settings = ProviderSettings::default();
        settings.set_effort_for(RpiPhase::Plan, ReasoningEffort::High);
        assert_eq!(settings.effort_for(RpiPhase::Plan), ReasoningEffort::High);
        assert_eq!(
            settings.effort_for(RpiPhase::Research),
            ReasoningEffort::Medium
        );
    }

    #[test]
    fn consent_mode_defaults_to_ask() {
        assert_eq!(ConsentMode::default(), ConsentMode::Ask);
    }
}
