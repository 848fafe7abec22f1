//! Loading and atomically persisting `settings.json` (`spec.md` §5).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use keenbench_core::model::{ModelId, ProviderId, ReasoningEffort, RpiPhase};
use keenbench_error::{EngineError, ErrorCode};

use crate::model::{ConsentMode, ProviderSettings, SettingsFile};

/// Guards `settings.json` behind a mutex and writes through temp+rename.
pub struct SettingsStore {
    path: PathBuf,
    state: Mutex<SettingsFile>,
}

impl SettingsStore {
    /// Load settings from `path`, or start from defaults if it does not
    /// exist. Either way, missing providers are backfilled and the
    /// normalized result is persisted immediately.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        let mut file = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                EngineError::new(
                    ErrorCode::InvariantViolation,
                    format!("settings.json is malformed: {e}"),
                )
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SettingsFile::default(),
            Err(e) => {
                return Err(EngineError::new(
                    ErrorCode::FileReadFailed,
                    format!("failed to read {}: {e}", path.display()),
                )
                .with_source(e));
            }
        };
        file.backfill_defaults();

        let store = Self {
            path,
            state: Mutex::new(file),
        };
        store.persist_locked(&store.state.lock().expect("settings mutex poisoned"))?;
        Ok(store)
    }

    /// Settings for a single provider.
    #[must_use]
    pub fn provider(&self, provider: ProviderId) -> ProviderSettings {
        self.state
            .lock()
            .expect("settings mutex poisoned")
            .provider(provider)
    }

    /// Enable or disable a provider.
    pub fn set_enabled(&self, provider: ProviderId, enabled: bool) -> Result<(), EngineError> {
        self.mutate(|file| {
            file.providers
                .entry(provider.as_str().to_string())
                .or_default()
                .enabled = enabled;
        })
    }

    /// Set the reasoning effort a provider uses for one RPI phase.
    pub fn set_reasoning_effort(
        &self,
        provider: ProviderId,
        phase: RpiPhase,
        effort: ReasoningEffort,
    ) -> Result<(), EngineError> {
        self.mutate(|file| {
            file.providers
                .entry(provider.as_str().to_string())
                .or_default()
                .set_effort_for(phase, effort);
        })
    }

    /// The user's preselected default model, if any.
    #[must_use]
    pub fn user_default_model(&self) -> Option<ModelId> {
        self.state
            .lock()
            .expect("settings mutex poisoned")
            .user_default_model_id
            .clone()
    }

    /// Set the user's preselected default model.
    pub fn set_user_default_model(&self, model: Option<ModelId>) -> Result<(), EngineError> {
        self.mutate(|file| file.user_default_model_id = model.clone())
    }

    /// The current global consent mode.
    #[must_use]
    pub fn consent_mode(&self) -> ConsentMode {
        self.state.lock().expect("settings mutex poisoned").user_consent_mode
    }

    /// Set the global consent mode.
    pub fn set_consent_mode(&self, mode: ConsentMode) -> Result<(), EngineError> {
        self.mutate(|file| file.user_consent_mode = mode)
    }

    fn mutate(&self, f: impl FnOnce(&mut SettingsFile)) -> Result<(), EngineError> {
        let mut state = self.state.lock().expect("settings mutex poisoned");
        f(&mut state);
        self.persist_locked(&state)
    }

    fn persist_locked(&self, state: &SettingsFile) -> Result<(), EngineError> {
        let json = serde_json::to_vec_pretty(state).map_err(|e| {
            EngineError::new(
                ErrorCode::InvariantViolation,
                format!("failed to serialize settings: {e}"),
            )
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::new(
                    ErrorCode::FileWriteFailed,
                    format!("failed to create {}: {e}", parent.display()),
                )
                .with_source(e)
            })?;
        }

        let tmp_path = tmp_path_for(&self.path);
        fs::write(&tmp_path, &json).map_err(|e| {
            EngineError::new(
                ErrorCode::FileWriteFailed,
                format!("failed to write {}: {e}", tmp_path.display()),
            )
            .with_source(e)
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            EngineError::new(
                ErrorCode::FileWriteFailed,
                format!(
                    "failed to rename {} to {}: {e}",
                    tmp_path.display(),
                    self.path.display()
                ),
            )
            .with_source(e)
        })
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_file_creates_defaults_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::load(&path).unwrap();
        assert!(path.exists());
        assert!(!store.provider(ProviderId::OpenAi).enabled);
    }

    #[test]
    fn set_enabled_persists_across_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        {
            let store = SettingsStore::load(&path).unwrap();
            store.set_enabled(ProviderId::Anthropic, true).unwrap();
        }
        let reopened = SettingsStore::load(&path).unwrap();
        assert!(reopened.provider(ProviderId::Anthropic).enabled);
    }

    #[test]
    fn set_reasoning_effort_only_touches_requested_phase() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.json")).unwrap();
        store
            .set_reasoning_effort(ProviderId::OpenAi, RpiPhase::Implement, ReasoningEffort::High)
            .unwrap();
        let settings = store.provider(ProviderId::OpenAi);
        assert_eq!(settings.rpi_implement_reasoning_effort, ReasoningEffort::High);
        assert_eq!(settings.rpi_research_reasoning_effort, ReasoningEffort::Medium);
    }

    #[test]
    fn user_default_model_round_trips() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.json")).unwrap();
        assert!(store.user_default_model().is_none());

        let model = ModelId::new(ProviderId::Anthropic, "claude-sonnet");
        store.set_user_default_model(Some(model.clone())).unwrap();
        assert_eq!(store.user_default_model(), Some(model));
    }

    #[test]
    fn consent_mode_round_trips() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.consent_mode(), ConsentMode::Ask);
        store.set_consent_mode(ConsentMode::AllowAll).unwrap();
        assert_eq!(store.consent_mode(), ConsentMode::AllowAll);
    }

    #[test]
    fn loading_a_file_missing_some_providers_backfills_them() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"schema_version":1,"providers":{"openai":{"enabled":true,"rpi_research_reasoning_effort":"high","rpi_plan_reasoning_effort":"medium","rpi_implement_reasoning_effort":"medium"}}}"#,
        )
        .unwrap();

        let store = SettingsStore::load(&path).unwrap();
        assert!(store.provider(ProviderId::OpenAi).enabled);
        assert!(!store.provider(ProviderId::Mistral).enabled);
    }
}
