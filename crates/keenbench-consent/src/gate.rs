//! Provider-call gating (`spec.md` §4.7).

use std::fs;

use keenbench_core::manifest::Manifest;
use keenbench_error::{EngineError, ErrorCode};
use keenbench_settings::ConsentMode;
use keenbench_workbench::WorkbenchPaths;
use tracing::info;

use crate::record::{ConsentRecord, EgressConsentFile};

/// Per-workbench consent state: an optional session-only grant plus
/// whatever is durably recorded in `meta/egress_consent.json`.
///
/// The session grant is held in memory only and is lost on restart; the
/// persisted grant survives restarts. Both are checked against the live
/// scope hash on every call, so neither needs explicit invalidation when
/// the manifest changes.
#[derive(Debug, Default)]
pub struct ConsentGate {
    session_grant: Option<ConsentRecord>,
}

impl ConsentGate {
    /// A gate with no session grant yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a provider call is authorized.
    ///
    /// Returns `Ok(())` if the call may proceed, or an `EGRESS_CONSENT_REQUIRED`
    /// error carrying `provider_id`/`model_id`/`scope_hash` for the UI to
    /// render a consent dialog.
    pub fn check(
        &self,
        paths: &WorkbenchPaths,
        consent_mode: ConsentMode,
        provider_configured: bool,
        provider_enabled: bool,
        provider_id: &str,
        model_id: &str,
        manifest: &Manifest,
    ) -> Result<(), EngineError> {
        if !provider_configured {
            return Err(EngineError::new(ErrorCode::ProviderNotConfigured, format!("provider '{provider_id}' is not configured")));
        }
        if !provider_enabled {
            return Err(EngineError::new(ErrorCode::ProviderNotConfigured, format!("provider '{provider_id}' is disabled")));
        }
        if consent_mode == ConsentMode::AllowAll {
            return Ok(());
        }

        let scope_hash = manifest.scope_hash();
        let matches_session = self
            .session_grant
            .as_ref()
            .is_some_and(|r| r.matches(provider_id, model_id, &scope_hash));
        let matches_persisted = load_persisted(paths)?.is_some_and(|r| r.matches(provider_id, model_id, &scope_hash));

        if matches_session || matches_persisted {
            return Ok(());
        }

        Err(consent_required(provider_id, model_id, &scope_hash))
    }

    /// Record a grant for the given (provider, model, current scope) triple.
    ///
    /// If `persist` is true, writes `meta/egress_consent.json`; otherwise
    /// the grant lives only in this `ConsentGate` for the remainder of the
    /// process's lifetime.
    pub fn grant(
        &mut self,
        paths: &WorkbenchPaths,
        provider_id: &str,
        model_id: &str,
        manifest: &Manifest,
        persist: bool,
    ) -> Result<(), EngineError> {
        let record = ConsentRecord {
            provider_id: provider_id.to_string(),
            model_id: model_id.to_string(),
            scope_hash: manifest.scope_hash(),
        };

        if persist {
            save_persisted(paths, &EgressConsentFile::granted(record.clone()))?;
        }
        self.session_grant = Some(record);

        info!(provider_id, model_id, persist, "granted egress consent");
        Ok(())
    }

    /// Revoke both the in-memory session grant and any persisted grant.
    pub fn revoke(&mut self, paths: &WorkbenchPaths) -> Result<(), EngineError> {
        self.session_grant = None;
        save_persisted(paths, &EgressConsentFile::none())
    }
}

fn consent_required(provider_id: &str, model_id: &str, scope_hash: &str) -> EngineError {
    EngineError::new(ErrorCode::EgressConsentRequired, "consent required for this provider/model/scope")
        .with_provider(provider_id)
        .with_model(model_id)
        .with_scope_hash(scope_hash)
}

fn load_persisted(paths: &WorkbenchPaths) -> Result<Option<ConsentRecord>, EngineError> {
    let path = paths.egress_consent_json();
    match fs::read(&path) {
        Ok(bytes) => {
            let file: EgressConsentFile = serde_json::from_slice(&bytes)
                .map_err(|e| EngineError::new(ErrorCode::InvariantViolation, format!("malformed egress_consent.json: {e}")))?;
            Ok(if file.consented { file.record } else { None })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EngineError::new(ErrorCode::FileReadFailed, format!("read egress_consent.json: {e}")).with_source(e)),
    }
}

fn save_persisted(paths: &WorkbenchPaths, file: &EgressConsentFile) -> Result<(), EngineError> {
    let bytes = serde_json::to_vec_pretty(file)
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("serialize egress_consent.json: {e}")))?;
    fs::create_dir_all(paths.meta())
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("create meta/: {e}")).with_source(e))?;
    let tmp = paths.meta().join("egress_consent.json.tmp");
    fs::write(&tmp, &bytes)
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("write {}: {e}", tmp.display())).with_source(e))?;
    fs::rename(&tmp, paths.egress_consent_json())
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("rename egress_consent.json: {e}")).with_source(e))
}
