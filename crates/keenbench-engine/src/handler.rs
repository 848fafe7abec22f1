//! Routes every dispatched JSON-RPC method (`spec.md` §6) to the component
//! that implements it. One [`EngineHandler`] per process, wrapping a single
//! [`AppState`]; every call borrows it through an `Arc`.
//!
//! Mirrors the teacher's own top-level dispatcher: this file is pure
//! routing and param/result marshalling, same as `keenbench_rpc::RpcHandler`
//! documents its own seam to be — no component reaches into another
//! component's internals except through the trait seams `tool_bridge.rs`
//! and `notify_bridge.rs` already establish.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use keenbench_core::events::ConversationEventKind;
use keenbench_core::manifest::{Manifest, ManifestEntry};
use keenbench_core::model::{ModelId, ProviderId, ReasoningEffort, RpiPhase};
use keenbench_draft::{
    create_checkpoint, create_draft_if_needed, current_state, discard_draft, list_checkpoints, publish, read_draft_info,
    restore_checkpoint, CheckpointReason, DraftState,
};
use keenbench_error::{EngineError, ErrorCode};
use keenbench_provider::{oauth, ProviderClient};
use keenbench_review::{docx_content_diff, get_change_set, get_preview, get_text_diff, pptx_content_diff, ContentRoot};
use keenbench_rpc::RpcHandler;
use keenbench_settings::ConsentMode;
use keenbench_workbench::{add_files, extract_files, manifest_store, remove_files, ForkMode, WorkbenchHandle, WorkbenchPaths};
use keenbench_workshop::conversation as workshop_conversation;
use keenbench_workshop::{run_cycle, workshop_state, ChatMode, PhaseEfforts};
use serde_json::{json, Value};

use crate::notify_bridge::{notify_draft_state_changed, WorkshopNotifierBridge};
use crate::state::{AppState, PendingOAuthFlow};
use crate::tool_bridge::WorkbenchToolBridge;

/// Implements the full RPC surface over a shared [`AppState`].
pub struct EngineHandler {
    state: Arc<AppState>,
}

impl EngineHandler {
    /// Build a handler over `state`.
    #[must_use]
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn workbench_id(params: &Value) -> Result<String, EngineError> {
        required_str(params, "workbench_id").map(str::to_string)
    }

    fn open(&self, workbench_id: &str) -> Result<WorkbenchHandle, EngineError> {
        self.state.workbenches.open(workbench_id)
    }

    fn model_id(params: &Value, field: &str) -> Result<ModelId, EngineError> {
        let raw = required_str(params, field)?;
        ModelId::from_str(raw).map_err(|e| EngineError::new(ErrorCode::ValidationFailed, format!("invalid {field} '{raw}': {e}")))
    }

    fn provider_id(params: &Value, field: &str) -> Result<ProviderId, EngineError> {
        let raw = required_str(params, field)?;
        ProviderId::from_str(raw).map_err(|e| EngineError::new(ErrorCode::ValidationFailed, format!("invalid {field} '{raw}': {e}")))
    }

    /// Build a [`ProviderClient`] for `model`, resolving an API key or a
    /// (refreshed) OAuth access token from the secret store.
    async fn build_client(&self, model: &ModelId) -> Result<Box<dyn ProviderClient>, EngineError> {
        let provider = model.provider();
        let creds = self.state.secrets.get(provider).unwrap_or_default();

        if let Some(api_key) = creds.api_key {
            return keenbench_provider::build_client(model.clone(), api_key);
        }
        if let Some(oauth_creds) = creds.oauth {
            let refreshed = oauth::refresh_if_needed(provider, oauth_creds, chrono::Duration::minutes(5)).await?;
            self.state.secrets.set_oauth(provider, refreshed.clone())?;
            return keenbench_provider::build_client(model.clone(), refreshed.access_token);
        }
        Err(EngineError::new(ErrorCode::ProviderNotConfigured, format!("provider '{}' has no credentials configured", provider.as_str()))
            .with_provider(provider.as_str()))
    }

    async fn ensure_consent(&self, workbench_id: &str, handle: &WorkbenchHandle, model: &ModelId) -> Result<(), EngineError> {
        let provider = model.provider();
        let settings = self.state.settings.provider(provider);
        let creds = self.state.secrets.get(provider);
        let configured = creds.is_some_and(|c| !c.is_empty());
        let consent_mode = self.state.settings.consent_mode();

        let gate = self.state.consent_gate(workbench_id);
        let gate = gate.lock().expect("consent gate mutex poisoned");
        gate.check(&handle.paths, consent_mode, configured, settings.enabled, provider.as_str(), &model.to_string(), &handle.manifest)
    }

    /// Snapshot every manifest file's current `published/` bytes into
    /// `meta/review/<draft_id>/baseline/`, so later Review calls can
    /// extract content from it exactly like any other workbench file.
    /// `create_draft_if_needed` only creates the empty directory; filling
    /// it is explicitly left to the caller (see `lifecycle.rs`).
    fn populate_baseline(paths: &WorkbenchPaths, draft_id: &str, manifest: &Manifest) -> Result<(), EngineError> {
        let baseline_dir = paths.baseline_dir(draft_id);
        std::fs::create_dir_all(&baseline_dir)
            .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("create baseline dir: {e}")).with_source(e))?;
        for path in manifest.sorted_paths() {
            let src = paths.published().join(path);
            if src.is_file() {
                std::fs::copy(&src, baseline_dir.join(path))
                    .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("snapshot baseline file '{path}': {e}")).with_source(e))?;
            }
        }
        Ok(())
    }

    /// Recompute `meta/files.json` from a flat listing of `published/`,
    /// the `manifest = build(listdir(published/))` invariant. Neither
    /// `publish` nor `restore_checkpoint` update the manifest themselves —
    /// both swap `published/` wholesale without visibility into the
    /// manifest file — so the engine re-derives it here immediately after
    /// either call returns.
    fn rebuild_manifest(paths: &WorkbenchPaths) -> Result<(), EngineError> {
        let mut entries = Vec::new();
        let dir = match std::fs::read_dir(paths.published()) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return manifest_store::save(&paths.meta(), &Manifest::new(entries));
            }
            Err(e) => return Err(EngineError::new(ErrorCode::FileReadFailed, format!("reading published/: {e}")).with_source(e)),
        };
        for entry in dir {
            let entry = entry.map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("reading published/: {e}")).with_source(e))?;
            let file_type = entry.file_type().map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("reading published/: {e}")).with_source(e))?;
            if !file_type.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else { continue };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            entries.push(ManifestEntry::from_path(name, size));
        }
        manifest_store::save(&paths.meta(), &Manifest::new(entries))
    }

    fn tool_bridge(&self, paths: WorkbenchPaths) -> WorkbenchToolBridge {
        WorkbenchToolBridge::new(Arc::clone(&self.state.tool_worker), paths)
    }

    fn tool_bridge_for_draft(&self, paths: WorkbenchPaths, draft_id: String) -> WorkbenchToolBridge {
        WorkbenchToolBridge::for_draft(Arc::clone(&self.state.tool_worker), paths, draft_id)
    }

    fn active_draft_id(paths: &WorkbenchPaths) -> Result<String, EngineError> {
        read_draft_info(paths)?.map(|info| info.draft_id).ok_or_else(|| EngineError::new(ErrorCode::NotFound, "no active draft"))
    }

    // -- Engine -----------------------------------------------------------

    fn engine_get_info(&self) -> Result<Value, EngineError> {
        Ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": self.state.data_dir().display().to_string(),
        }))
    }

    // -- Providers ----------------------------------------------------------

    fn providers_list(&self) -> Result<Value, EngineError> {
        let list: Vec<Value> = keenbench_settings::ALL_PROVIDERS
            .iter()
            .map(|&provider| {
                let settings = self.state.settings.provider(provider);
                let creds = self.state.secrets.get(provider).unwrap_or_default();
                json!({
                    "provider_id": provider.as_str(),
                    "enabled": settings.enabled,
                    "has_api_key": creds.api_key.is_some(),
                    "oauth_account_label": creds.oauth.map(|o| o.account_label),
                    "rpi_research_reasoning_effort": settings.rpi_research_reasoning_effort,
                    "rpi_plan_reasoning_effort": settings.rpi_plan_reasoning_effort,
                    "rpi_implement_reasoning_effort": settings.rpi_implement_reasoning_effort,
                })
            })
            .collect();
        Ok(json!({"providers": list}))
    }

    fn provider_set_api_key(&self, params: Value) -> Result<Value, EngineError> {
        let provider = Self::provider_id(&params, "provider_id")?;
        let api_key = required_str(&params, "api_key")?.to_string();
        self.state.secrets.set_api_key(provider, api_key)?;
        Ok(json!({}))
    }

    fn provider_clear_api_key(&self, params: Value) -> Result<Value, EngineError> {
        let provider = Self::provider_id(&params, "provider_id")?;
        self.state.secrets.clear_api_key(provider)?;
        Ok(json!({}))
    }

    fn provider_set_enabled(&self, params: Value) -> Result<Value, EngineError> {
        let provider = Self::provider_id(&params, "provider_id")?;
        let enabled = required_bool(&params, "enabled")?;
        self.state.settings.set_enabled(provider, enabled)?;
        Ok(json!({}))
    }

    fn provider_oauth_start(&self, params: Value) -> Result<Value, EngineError> {
        let provider = Self::provider_id(&params, "provider_id")?;
        let pending = oauth::start(provider)?;
        let authorize_url = pending.authorize_url().to_string();
        let (listener, flow_state, mode) = match pending {
            oauth::PendingAuthorization::Listening { state, listener, .. } => (Some(listener), state, "listening"),
            oauth::PendingAuthorization::ManualPaste { state, .. } => (None, state, "manual"),
        };
        self.state.store_pending_oauth(provider.as_str(), PendingOAuthFlow { listener, flow_state, mode });
        Ok(json!({"authorize_url": authorize_url, "mode": mode}))
    }

    fn provider_oauth_status(&self, params: Value) -> Result<Value, EngineError> {
        let provider = Self::provider_id(&params, "provider_id")?;
        match self.state.pending_oauth_mode(provider.as_str()) {
            Some(mode) => Ok(json!({"pending": true, "mode": mode})),
            None => Ok(json!({"pending": false, "mode": Value::Null})),
        }
    }

    async fn provider_oauth_complete_listening(&self, params: Value) -> Result<Value, EngineError> {
        let provider = Self::provider_id(&params, "provider_id")?;
        let flow = self
            .state
            .take_pending_oauth(provider.as_str())
            .ok_or_else(|| EngineError::new(ErrorCode::InvariantViolation, "no pending oauth flow for this provider"))?;
        let listener = flow
            .listener
            .ok_or_else(|| EngineError::new(ErrorCode::InvariantViolation, "pending flow has no listener to complete"))?;
        let credentials = oauth::complete_listening(listener, flow.flow_state).await?;
        let account_label = credentials.account_label.clone();
        self.state.secrets.set_oauth(provider, credentials)?;
        Ok(json!({"account_label": account_label}))
    }

    async fn provider_oauth_complete_manual(&self, params: Value) -> Result<Value, EngineError> {
        let provider = Self::provider_id(&params, "provider_id")?;
        let redirect_url = required_str(&params, "redirect_url")?;
        let flow = self
            .state
            .take_pending_oauth(provider.as_str())
            .ok_or_else(|| EngineError::new(ErrorCode::InvariantViolation, "no pending oauth flow for this provider"))?;
        let credentials = oauth::complete_manual(redirect_url, flow.flow_state).await?;
        let account_label = credentials.account_label.clone();
        self.state.secrets.set_oauth(provider, credentials)?;
        Ok(json!({"account_label": account_label}))
    }

    fn provider_disconnect_oauth(&self, params: Value) -> Result<Value, EngineError> {
        let provider = Self::provider_id(&params, "provider_id")?;
        self.state.secrets.disconnect_oauth(provider)?;
        Ok(json!({}))
    }

    async fn provider_validate_key(&self, params: Value) -> Result<Value, EngineError> {
        let model = Self::model_id(&params, "model_id")?;
        let client = self.build_client(&model).await?;
        client.validate_key().await?;
        Ok(json!({"valid": true}))
    }

    // -- Engine: Shutdown -----------------------------------------------------

    /// Return immediately so the response reaches the client, then exit the
    /// process shortly after. `keenbench_rpc::serve`'s read loop has no
    /// built-in shutdown signal; it only stops when stdin closes, so this is
    /// the one RPC that ends the process itself rather than through the
    /// request loop.
    fn shutdown(&self) -> Result<Value, EngineError> {
        tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            std::process::exit(0);
        });
        Ok(json!({}))
    }

    // -- Models ---------------------------------------------------------------

    fn models_list_supported(&self) -> Result<Value, EngineError> {
        Ok(json!({"models": keenbench_provider::supported_models()}))
    }

    // -- Settings -----------------------------------------------------------

    fn settings_get(&self) -> Result<Value, EngineError> {
        let mut providers = serde_json::Map::new();
        for provider in keenbench_settings::ALL_PROVIDERS {
            providers.insert(provider.as_str().to_string(), serde_json::to_value(self.state.settings.provider(provider))?);
        }
        Ok(json!({
            "providers": providers,
            "user_default_model_id": self.state.settings.user_default_model(),
            "user_consent_mode": self.state.settings.consent_mode(),
        }))
    }

    fn settings_set_reasoning_effort(&self, params: Value) -> Result<Value, EngineError> {
        let provider = Self::provider_id(&params, "provider_id")?;
        let phase = parse_rpi_phase(required_str(&params, "phase")?)?;
        let effort = ReasoningEffort::parse_lenient(required_str(&params, "effort")?);
        self.state.settings.set_reasoning_effort(provider, phase, effort)?;
        Ok(json!({}))
    }

    fn settings_set_default_model(&self, params: Value) -> Result<Value, EngineError> {
        let model = match params.get("model_id").and_then(Value::as_str) {
            Some(raw) => Some(
                ModelId::from_str(raw).map_err(|e| EngineError::new(ErrorCode::ValidationFailed, format!("invalid model_id '{raw}': {e}")))?,
            ),
            None => None,
        };
        self.state.settings.set_user_default_model(model)?;
        Ok(json!({}))
    }

    fn settings_set_consent_mode(&self, params: Value) -> Result<Value, EngineError> {
        let mode = parse_consent_mode(required_str(&params, "mode")?)?;
        self.state.settings.set_consent_mode(mode)?;
        Ok(json!({}))
    }

    // -- Workbench ------------------------------------------------------------

    fn workbench_create(&self, params: Value) -> Result<Value, EngineError> {
        let display_name = required_str(&params, "display_name")?;
        let handle = self.state.workbenches.create(display_name)?;
        Ok(json!({"workbench": handle.meta, "manifest": handle.manifest}))
    }

    fn workbench_open(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        Ok(json!({"workbench": handle.meta, "manifest": handle.manifest, "draft_state": draft_state_str(current_state(&handle.paths))}))
    }

    fn workbench_list(&self) -> Result<Value, EngineError> {
        let summaries = self.state.workbenches.list();
        let rows: Vec<Value> = summaries
            .into_iter()
            .map(|s| json!({"id": s.id, "display_name": s.display_name, "created_at": s.created_at, "file_count": s.file_count}))
            .collect();
        Ok(json!({"workbenches": rows}))
    }

    fn workbench_delete(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let _lock = self.state.locks.acquire_exclusive(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let draft_exists = current_state(&handle.paths) != DraftState::Idle;
        self.state.workbenches.delete(&workbench_id, draft_exists)?;
        Ok(json!({}))
    }

    fn workbench_fork(&self, params: Value) -> Result<Value, EngineError> {
        let source_id = Self::workbench_id(&params)?;
        let mode = parse_fork_mode(required_str(&params, "mode")?)?;
        let display_name = required_str(&params, "display_name")?;
        let _lock = self.state.locks.acquire_shared(&source_id)?;
        let source = self.open(&source_id)?;
        let draft_exists = current_state(&source.paths) != DraftState::Idle;
        let handle = self.state.workbenches.fork(&source_id, mode, display_name, draft_exists)?;
        Ok(json!({"workbench": handle.meta, "manifest": handle.manifest}))
    }

    // -- Files ------------------------------------------------------------------

    fn files_add(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let sources = required_str_array(&params, "source_paths")?.into_iter().map(std::path::PathBuf::from).collect::<Vec<_>>();
        let _lock = self.state.locks.acquire_exclusive(&workbench_id)?;
        let mut handle = self.open(&workbench_id)?;
        let results = add_files(&handle.paths, &mut handle.manifest, &sources)?;
        Ok(json!({"results": results.into_iter().map(|r| json!({"filename": r.filename, "status": add_status_str(&r.status)})).collect::<Vec<_>>()}))
    }

    fn files_remove(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let filenames = required_str_array(&params, "filenames")?;
        let _lock = self.state.locks.acquire_exclusive(&workbench_id)?;
        let mut handle = self.open(&workbench_id)?;
        remove_files(&handle.paths, &mut handle.manifest, &filenames)?;
        Ok(json!({}))
    }

    fn files_extract(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let filenames = required_str_array(&params, "filenames")?;
        let dest_dir = std::path::PathBuf::from(required_str(&params, "dest_dir")?);
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let extracted = extract_files(&handle.paths, &filenames, &dest_dir)?;
        Ok(json!({"paths": extracted.into_iter().map(|p| p.display().to_string()).collect::<Vec<_>>()}))
    }

    // -- Consent ------------------------------------------------------------

    async fn consent_check(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let model = Self::model_id(&params, "model_id")?;
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        self.ensure_consent(&workbench_id, &handle, &model).await?;
        Ok(json!({"authorized": true}))
    }

    fn consent_grant(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let model = Self::model_id(&params, "model_id")?;
        let persist = params.get("persist").and_then(Value::as_bool).unwrap_or(false);
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let gate = self.state.consent_gate(&workbench_id);
        let mut gate = gate.lock().expect("consent gate mutex poisoned");
        gate.grant(&handle.paths, model.provider().as_str(), &model.to_string(), &handle.manifest, persist)?;
        Ok(json!({}))
    }

    fn consent_revoke(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let gate = self.state.consent_gate(&workbench_id);
        let mut gate = gate.lock().expect("consent gate mutex poisoned");
        gate.revoke(&handle.paths)?;
        Ok(json!({}))
    }

    // -- Context --------------------------------------------------------------

    fn context_list(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        Ok(json!({"categories": keenbench_context::store::list(&handle.paths)}))
    }

    fn context_get(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let category = parse_category(required_str(&params, "category")?)?;
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let artifact = keenbench_context::store::get(&handle.paths, category)?;
        Ok(json!({"artifact": artifact}))
    }

    async fn context_process(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let category = parse_category(required_str(&params, "category")?)?;
        let description = required_str(&params, "description")?;
        let model = Self::model_id(&params, "model_id")?;
        let _lock = self.state.locks.acquire_exclusive(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        self.ensure_consent(&workbench_id, &handle, &model).await?;
        let draft_exists = current_state(&handle.paths) != DraftState::Idle;
        let provider = self.build_client(&model).await?;
        let artifact = keenbench_context::process::process(&handle.paths, provider.as_ref(), category, description, draft_exists).await?;
        self.state.notifications().send(
            "ContextChanged",
            json!({"workbench_id": workbench_id, "category": category.dir_name()}),
        );
        Ok(json!({"artifact": artifact}))
    }

    fn context_update_direct(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let category = parse_category(required_str(&params, "category")?)?;
        let content = required_str(&params, "content")?;
        let _lock = self.state.locks.acquire_exclusive(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let draft_exists = current_state(&handle.paths) != DraftState::Idle;
        keenbench_context::store::update_direct(&handle.paths, category, content, draft_exists)?;
        notify_draft_state_changed(self.state.notifications(), &workbench_id, draft_exists);
        Ok(json!({}))
    }

    fn context_delete(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let category = parse_category(required_str(&params, "category")?)?;
        let _lock = self.state.locks.acquire_exclusive(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let draft_exists = current_state(&handle.paths) != DraftState::Idle;
        keenbench_context::store::delete(&handle.paths, category, draft_exists)?;
        Ok(json!({}))
    }

    fn context_estimate_clutter(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let budget_tokens = params.get("budget_tokens").and_then(Value::as_u64).unwrap_or(100_000);
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let files_text = handle.manifest.sorted_paths().join("\n");
        let report = keenbench_context::clutter::estimate(&handle.paths, &files_text, "", budget_tokens)?;
        Ok(serde_json::to_value(report)?)
    }

    // -- Workshop -----------------------------------------------------------

    async fn workshop_run(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let message = required_str(&params, "message")?.to_string();
        let model = Self::model_id(&params, "model_id")?;

        let _lock = self.state.locks.acquire_exclusive(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        self.ensure_consent(&workbench_id, &handle, &model).await?;

        if let Some(draft_id) = create_draft_if_needed(&handle.paths, "workshop_run")? {
            Self::populate_baseline(&handle.paths, &draft_id, &handle.manifest)?;
            notify_draft_state_changed(self.state.notifications(), &workbench_id, true);
        }

        let provider = self.build_client(&model).await?;
        let executor = self.tool_bridge(handle.paths.clone());
        let notifier = WorkshopNotifierBridge::new(self.state.notifications().clone(), workbench_id.clone());
        let context_block = keenbench_context::inject::render_injection_blocks(&handle.paths)?;
        let settings = self.state.settings.provider(model.provider());
        let implement_effort = settings.effort_for(RpiPhase::Implement);
        let efforts = PhaseEfforts {
            research: settings.effort_for(RpiPhase::Research),
            plan: settings.effort_for(RpiPhase::Plan),
            implement: implement_effort,
            summary: implement_effort,
        };

        let user_event = workshop_conversation::append_event(&handle.paths, ConversationEventKind::UserMessage { text: message.clone() }).await?;
        workshop_state::set_head(&handle.paths, user_event.id).await?;
        workshop_state::set_active_model(&handle.paths, &model.to_string()).await?;

        let cancel = self.state.begin_run(&workbench_id);
        let outcome = run_cycle(&handle.paths, provider.as_ref(), &executor, &notifier, &message, &context_block, efforts, &cancel).await;
        self.state.end_run(&workbench_id);
        let outcome = outcome?;

        let assistant_event = workshop_conversation::append_event(&handle.paths, ConversationEventKind::AssistantMessage { text: outcome.summary_text.clone(), tool_calls: vec![] }).await?;
        workshop_state::set_head(&handle.paths, assistant_event.id).await?;

        Ok(json!({
            "plan": outcome.plan,
            "summary_text": outcome.summary_text,
            "implement_results": outcome.implement_results.into_iter().map(|r| json!({
                "index": r.index, "label": r.label, "failed": r.failed, "reason": r.reason,
            })).collect::<Vec<_>>(),
        }))
    }

    fn workshop_cancel_run(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let canceled = self.state.cancel_run(&workbench_id);
        Ok(json!({"canceled": canceled}))
    }

    async fn workshop_get_state(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let state = workshop_state::load(&handle.paths).await?;
        Ok(json!({
            "active_model_id": state.active_model_id,
            "head": state.head,
            "chat_mode": state.chat_mode,
            "run_active": self.state.is_run_active(&workbench_id),
        }))
    }

    async fn workshop_set_active_model(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let model = Self::model_id(&params, "model_id")?;
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let state = workshop_state::set_active_model(&handle.paths, &model.to_string()).await?;
        Ok(json!({"active_model_id": state.active_model_id}))
    }

    async fn workshop_set_chat_mode(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let chat_mode = parse_chat_mode(required_str(&params, "chat_mode")?)?;
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let state = workshop_state::set_chat_mode(&handle.paths, chat_mode).await?;
        Ok(json!({"chat_mode": state.chat_mode}))
    }

    async fn workshop_undo_to_message(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let message_id = required_str(&params, "message_id")?;
        let message_id = uuid::Uuid::parse_str(message_id)
            .map_err(|e| EngineError::new(ErrorCode::ValidationFailed, format!("invalid message_id '{message_id}': {e}")))?;
        let _lock = self.state.locks.acquire_exclusive(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        keenbench_workshop::state::reset(&handle.paths).await?;
        let tombstone = workshop_conversation::undo_to(&handle.paths, message_id).await?;
        workshop_state::set_head(&handle.paths, tombstone.id).await?;
        Ok(json!({"head": tombstone.id}))
    }

    async fn workshop_regenerate(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;

        let _lock = self.state.locks.acquire_exclusive(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let last_user_message = workshop_conversation::last_user_message(&handle.paths)
            .await?
            .ok_or_else(|| EngineError::new(ErrorCode::InvariantViolation, "no prior user message to regenerate from"))?;
        let ConversationEventKind::UserMessage { text: message } = last_user_message.kind else {
            unreachable!("last_user_message only returns UserMessage events");
        };

        let state = workshop_state::load(&handle.paths).await?;
        let model_id = state
            .active_model_id
            .ok_or_else(|| EngineError::new(ErrorCode::InvariantViolation, "no active model set for this workbench"))?;
        let model = ModelId::from_str(&model_id)
            .map_err(|e| EngineError::new(ErrorCode::ValidationFailed, format!("invalid stored active_model_id '{model_id}': {e}")))?;

        self.ensure_consent(&workbench_id, &handle, &model).await?;
        let provider = self.build_client(&model).await?;
        let executor = self.tool_bridge(handle.paths.clone());
        let notifier = WorkshopNotifierBridge::new(self.state.notifications().clone(), workbench_id.clone());
        let context_block = keenbench_context::inject::render_injection_blocks(&handle.paths)?;
        let settings = self.state.settings.provider(model.provider());
        let implement_effort = settings.effort_for(RpiPhase::Implement);
        let efforts = PhaseEfforts {
            research: settings.effort_for(RpiPhase::Research),
            plan: settings.effort_for(RpiPhase::Plan),
            implement: implement_effort,
            summary: implement_effort,
        };

        let cancel = self.state.begin_run(&workbench_id);
        let outcome = run_cycle(&handle.paths, provider.as_ref(), &executor, &notifier, &message, &context_block, efforts, &cancel).await;
        self.state.end_run(&workbench_id);
        let outcome = outcome?;

        let assistant_event = workshop_conversation::append_event(&handle.paths, ConversationEventKind::AssistantMessage { text: outcome.summary_text.clone(), tool_calls: vec![] }).await?;
        workshop_state::set_head(&handle.paths, assistant_event.id).await?;

        Ok(json!({
            "plan": outcome.plan,
            "summary_text": outcome.summary_text,
            "implement_results": outcome.implement_results.into_iter().map(|r| json!({
                "index": r.index, "label": r.label, "failed": r.failed, "reason": r.reason,
            })).collect::<Vec<_>>(),
        }))
    }

    // -- Review -------------------------------------------------------------

    fn review_get_change_set(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let draft_id = Self::active_draft_id(&handle.paths)?;
        Ok(serde_json::to_value(get_change_set(&handle.paths, &draft_id)?)?)
    }

    async fn review_get_text_diff(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let relative_path = required_str(&params, "path")?.to_string();
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let draft_id = Self::active_draft_id(&handle.paths)?;
        let extractor = self.tool_bridge_for_draft(handle.paths.clone(), draft_id.clone());
        Ok(serde_json::to_value(get_text_diff(&handle.paths, &extractor, &draft_id, &relative_path).await?)?)
    }

    async fn review_get_docx_content_diff(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let relative_path = required_str(&params, "path")?.to_string();
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let draft_id = Self::active_draft_id(&handle.paths)?;
        let extractor = self.tool_bridge_for_draft(handle.paths.clone(), draft_id.clone());
        Ok(serde_json::to_value(docx_content_diff(&handle.paths, &extractor, &draft_id, &relative_path).await?)?)
    }

    async fn review_get_pptx_content_diff(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let relative_path = required_str(&params, "path")?.to_string();
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let draft_id = Self::active_draft_id(&handle.paths)?;
        let extractor = self.tool_bridge_for_draft(handle.paths.clone(), draft_id.clone());
        Ok(serde_json::to_value(pptx_content_diff(&handle.paths, &extractor, &draft_id, &relative_path).await?)?)
    }

    async fn review_get_preview(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let relative_path = required_str(&params, "path")?.to_string();
        let root = parse_content_root(required_str(&params, "root")?)?;
        let page_or_slide = params.get("page_or_slide").and_then(Value::as_u64).unwrap_or(0);
        let scale = params.get("scale").and_then(Value::as_f64).unwrap_or(1.0);

        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let draft_id = read_draft_info(&handle.paths)?.map(|info| info.draft_id).unwrap_or_default();
        let extractor = self.tool_bridge_for_draft(handle.paths.clone(), draft_id);
        Ok(serde_json::to_value(get_preview(&extractor, root, &relative_path, page_or_slide, scale).await?)?)
    }

    // -- Draft --------------------------------------------------------------

    fn draft_get_state(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        Ok(json!({"state": draft_state_str(current_state(&handle.paths))}))
    }

    fn draft_discard(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let _lock = self.state.locks.acquire_exclusive(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        discard_draft(&handle.paths)?;
        notify_draft_state_changed(self.state.notifications(), &workbench_id, false);
        Ok(json!({}))
    }

    fn draft_publish(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let _lock = self.state.locks.acquire_exclusive(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let result = publish(&handle.paths)?;
        Self::rebuild_manifest(&handle.paths)?;
        notify_draft_state_changed(self.state.notifications(), &workbench_id, false);
        Ok(json!({"checkpoint_id": result.checkpoint_id}))
    }

    // -- Checkpoints ----------------------------------------------------------

    fn checkpoints_list(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let _lock = self.state.locks.acquire_shared(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        Ok(json!({"checkpoints": list_checkpoints(&handle.paths)?}))
    }

    fn checkpoints_create(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let description = params.get("description").and_then(Value::as_str).map(str::to_string);
        let _lock = self.state.locks.acquire_exclusive(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        let meta = create_checkpoint(&handle.paths, CheckpointReason::Manual, description)?;
        Ok(serde_json::to_value(meta)?)
    }

    fn checkpoints_restore(&self, params: Value) -> Result<Value, EngineError> {
        let workbench_id = Self::workbench_id(&params)?;
        let checkpoint_id = required_str(&params, "checkpoint_id")?;
        let _lock = self.state.locks.acquire_exclusive(&workbench_id)?;
        let handle = self.open(&workbench_id)?;
        restore_checkpoint(&handle.paths, checkpoint_id)?;
        Self::rebuild_manifest(&handle.paths)?;
        Ok(json!({}))
    }
}

#[async_trait]
impl RpcHandler for EngineHandler {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, EngineError> {
        match method {
            "EngineGetInfo" => self.engine_get_info(),
            "Shutdown" => self.shutdown(),

            "ProvidersList" => self.providers_list(),
            "ProviderSetApiKey" => self.provider_set_api_key(params),
            "ProviderClearApiKey" => self.provider_clear_api_key(params),
            "ProviderSetEnabled" => self.provider_set_enabled(params),
            "ProviderOAuthStart" => self.provider_oauth_start(params),
            "ProviderOAuthStatus" => self.provider_oauth_status(params),
            "ProviderOAuthCompleteListening" => self.provider_oauth_complete_listening(params).await,
            "ProviderOAuthCompleteManual" => self.provider_oauth_complete_manual(params).await,
            "ProviderDisconnectOAuth" => self.provider_disconnect_oauth(params),
            "ProviderValidateKey" => self.provider_validate_key(params).await,

            "ModelsListSupported" => self.models_list_supported(),

            "SettingsGet" => self.settings_get(),
            "SettingsSetReasoningEffort" => self.settings_set_reasoning_effort(params),
            "SettingsSetDefaultModel" => self.settings_set_default_model(params),
            "SettingsSetConsentMode" => self.settings_set_consent_mode(params),

            "WorkbenchCreate" => self.workbench_create(params),
            "WorkbenchOpen" => self.workbench_open(params),
            "WorkbenchList" => self.workbench_list(),
            "WorkbenchDelete" => self.workbench_delete(params),
            "WorkbenchFork" => self.workbench_fork(params),

            "FilesAdd" => self.files_add(params),
            "FilesRemove" => self.files_remove(params),
            "FilesExtract" => self.files_extract(params),

            "ConsentCheck" => self.consent_check(params).await,
            "ConsentGrant" => self.consent_grant(params),
            "ConsentRevoke" => self.consent_revoke(params),

            "ContextList" => self.context_list(params),
            "ContextGet" => self.context_get(params),
            "ContextProcess" => self.context_process(params).await,
            "ContextUpdateDirect" => self.context_update_direct(params),
            "ContextDelete" => self.context_delete(params),
            "ContextEstimateClutter" => self.context_estimate_clutter(params),

            "WorkshopRun" => self.workshop_run(params).await,
            "WorkshopCancelRun" => self.workshop_cancel_run(params),
            "WorkshopGetState" => self.workshop_get_state(params).await,
            "WorkshopSetActiveModel" => self.workshop_set_active_model(params).await,
            "WorkshopSetChatMode" => self.workshop_set_chat_mode(params).await,
            "WorkshopUndoToMessage" => self.workshop_undo_to_message(params).await,
            "WorkshopRegenerate" => self.workshop_regenerate(params).await,

            "ReviewGetChangeSet" => self.review_get_change_set(params),
            "ReviewGetTextDiff" => self.review_get_text_diff(params).await,
            "ReviewGetDocxContentDiff" => self.review_get_docx_content_diff(params).await,
            "ReviewGetPptxContentDiff" => self.review_get_pptx_content_diff(params).await,
            "ReviewGetPreview" => self.review_get_preview(params).await,

            "DraftGetState" => self.draft_get_state(params),
            "DraftDiscard" => self.draft_discard(params),
            "DraftPublish" => self.draft_publish(params),

            "CheckpointsList" => self.checkpoints_list(params),
            "CheckpointsCreate" => self.checkpoints_create(params),
            "CheckpointsRestore" => self.checkpoints_restore(params),

            other => Err(EngineError::new(ErrorCode::ValidationFailed, format!("unknown method '{other}'"))),
        }
    }
}

fn required_str<'a>(params: &'a Value, field: &str) -> Result<&'a str, EngineError> {
    params
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::new(ErrorCode::ValidationFailed, format!("missing or non-string '{field}'")))
}

fn required_bool(params: &Value, field: &str) -> Result<bool, EngineError> {
    params
        .get(field)
        .and_then(Value::as_bool)
        .ok_or_else(|| EngineError::new(ErrorCode::ValidationFailed, format!("missing or non-boolean '{field}'")))
}

fn required_str_array(params: &Value, field: &str) -> Result<Vec<String>, EngineError> {
    params
        .get(field)
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .ok_or_else(|| EngineError::new(ErrorCode::ValidationFailed, format!("missing or non-array '{field}'")))
}

fn draft_state_str(state: DraftState) -> &'static str {
    match state {
        DraftState::Idle => "idle",
        DraftState::Drafting => "drafting",
        DraftState::Applying => "applying",
        DraftState::Publishing => "publishing",
    }
}

fn add_status_str(status: &keenbench_workbench::AddFileStatus) -> Value {
    match status {
        keenbench_workbench::AddFileStatus::Added => json!("added"),
        keenbench_workbench::AddFileStatus::Skipped(reason) => {
            json!({"skipped": serde_json::to_value(reason).expect("SkipReason always serializes")})
        }
    }
}

fn parse_chat_mode(s: &str) -> Result<ChatMode, EngineError> {
    match s {
        "agent" => Ok(ChatMode::Agent),
        "ask" => Ok(ChatMode::Ask),
        other => Err(EngineError::new(ErrorCode::ValidationFailed, format!("unknown chat mode '{other}'"))),
    }
}

fn parse_rpi_phase(s: &str) -> Result<RpiPhase, EngineError> {
    match s {
        "research" => Ok(RpiPhase::Research),
        "plan" => Ok(RpiPhase::Plan),
        "implement" => Ok(RpiPhase::Implement),
        other => Err(EngineError::new(ErrorCode::ValidationFailed, format!("unknown rpi phase '{other}'"))),
    }
}

fn parse_consent_mode(s: &str) -> Result<ConsentMode, EngineError> {
    match s {
        "ask" => Ok(ConsentMode::Ask),
        "allow_all" => Ok(ConsentMode::AllowAll),
        other => Err(EngineError::new(ErrorCode::ValidationFailed, format!("unknown consent mode '{other}'"))),
    }
}

fn parse_fork_mode(s: &str) -> Result<ForkMode, EngineError> {
    match s {
        "clone_files_only" => Ok(ForkMode::CloneFilesOnly),
        "clone_all" => Ok(ForkMode::CloneAll),
        other => Err(EngineError::new(ErrorCode::ValidationFailed, format!("unknown fork mode '{other}'"))),
    }
}

fn parse_category(s: &str) -> Result<keenbench_context::Category, EngineError> {
    use keenbench_context::Category;
    match s {
        "company-context" => Ok(Category::CompanyContext),
        "department-context" => Ok(Category::DepartmentContext),
        "situation" => Ok(Category::Situation),
        "document-style" => Ok(Category::DocumentStyle),
        other => Err(EngineError::new(ErrorCode::ValidationFailed, format!("unknown context category '{other}'"))),
    }
}

fn parse_content_root(s: &str) -> Result<ContentRoot, EngineError> {
    match s {
        "draft" => Ok(ContentRoot::Draft),
        "published" => Ok(ContentRoot::Published),
        "baseline" => Ok(ContentRoot::Baseline),
        other => Err(EngineError::new(ErrorCode::ValidationFailed, format!("unknown content root '{other}'"))),
    }
}
