//! Process-wide state shared by every dispatched RPC call: the component
//! stores, the tool-worker supervisor, and the per-workbench concurrency
//! primitives (`spec.md` §4.1 "one process, one set of component instances,
//! shared across every connected client").
//!
//! Mirrors the teacher's single `AppState` struct threaded through its own
//! request dispatcher: every component here is either internally
//! synchronized (`SettingsStore`, `SecretStore`, `ToolWorkerSupervisor`) or
//! wrapped in a `Mutex` keyed by workbench id the same way `LockRegistry`
//! is, so no call site needs to reach for a global lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use keenbench_consent::ConsentGate;
use keenbench_error::{EngineError, ErrorCode};
use keenbench_provider::oauth::FlowState;
use keenbench_rpc::NotificationSink;
use keenbench_secrets::{MasterKey, SecretStore};
use keenbench_settings::SettingsStore;
use keenbench_toolworker::ToolWorkerSupervisor;
use keenbench_workbench::WorkbenchManager;
use keenbench_workshop::CancelToken;
use tiny_http::Server;

use crate::lock::LockRegistry;

/// An authorization attempt started by `ProviderOAuthStart`, awaiting
/// `ProviderOAuthCompleteListening`/`ProviderOAuthCompleteManual`.
pub struct PendingOAuthFlow {
    /// The bound loopback listener, if the flow is listening rather than
    /// manual-paste.
    pub listener: Option<Server>,
    /// Opaque PKCE/CSRF bookkeeping to pass back into the `complete_*` call.
    pub flow_state: FlowState,
    /// `"listening"` or `"manual"`, echoed back by `ProvidersOAuthStatus`.
    pub mode: &'static str,
}

/// Everything a dispatched RPC call needs, shared across the process's
/// lifetime behind a single `Arc`.
pub struct AppState {
    /// Root directory holding `workbenches/`, `settings.json`,
    /// `secrets.enc`, and the master key.
    pub data_dir: PathBuf,
    /// Workbench creation/open/list/fork/delete.
    pub workbenches: WorkbenchManager,
    /// Provider/global settings.
    pub settings: SettingsStore,
    /// Encrypted provider credentials.
    pub secrets: SecretStore,
    /// The single tool-worker subprocess, shared across every workbench.
    pub tool_worker: Arc<ToolWorkerSupervisor>,
    /// Per-workbench Exclusive/Shared lock classes.
    pub locks: LockRegistry,
    /// Per-workbench consent state, keyed by workbench id. `ConsentGate`'s
    /// `grant`/`revoke` take `&mut self`, so unlike the stores above this
    /// needs an explicit per-entry mutex.
    consent_gates: Mutex<HashMap<String, Arc<Mutex<ConsentGate>>>>,
    /// One cancel flag per workbench with an in-flight Workshop run.
    /// Absence means no run is active.
    cancel_tokens: Mutex<HashMap<String, CancelToken>>,
    /// In-flight OAuth authorization attempts, keyed by provider id. Only
    /// one pending flow per provider is tracked; starting a new one drops
    /// whatever was pending before.
    pending_oauth: Mutex<HashMap<String, PendingOAuthFlow>>,
    /// Filled in once, immediately after `keenbench_rpc::serve` hands back
    /// its sink and before the request loop starts reading stdin, so every
    /// dispatched call can assume it is present.
    notifications: OnceLock<NotificationSink>,
}

impl AppState {
    /// Build process state rooted at `data_dir`, creating `workbenches/`,
    /// loading (or initializing) `settings.json` and `secrets.enc`, and
    /// wiring up a lazily-spawned tool-worker at `tool_worker_path`.
    pub fn new(data_dir: impl Into<PathBuf>, tool_worker_path: impl Into<String>) -> Result<Self, EngineError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("create data dir: {e}")).with_source(e))?;

        let workbenches = WorkbenchManager::new(data_dir.join("workbenches"))?;
        let settings = SettingsStore::load(data_dir.join("settings.json"))?;
        let master_key = MasterKey::load_or_create(&data_dir.join("master.key"))?;
        let secrets = SecretStore::open(data_dir.join("secrets.enc"), master_key)?;
        let tool_worker = Arc::new(ToolWorkerSupervisor::new(tool_worker_path));

        Ok(Self {
            data_dir,
            workbenches,
            settings,
            secrets,
            tool_worker,
            locks: LockRegistry::new(),
            consent_gates: Mutex::new(HashMap::new()),
            cancel_tokens: Mutex::new(HashMap::new()),
            pending_oauth: Mutex::new(HashMap::new()),
            notifications: OnceLock::new(),
        })
    }

    /// Record a newly started OAuth flow for `provider_id`, replacing any
    /// flow already pending for that provider.
    pub fn store_pending_oauth(&self, provider_id: &str, flow: PendingOAuthFlow) {
        self.pending_oauth.lock().expect("pending oauth registry poisoned").insert(provider_id.to_string(), flow);
    }

    /// Take the pending OAuth flow for `provider_id`, if one was started.
    /// Completing a flow (successfully or not) always consumes it.
    pub fn take_pending_oauth(&self, provider_id: &str) -> Option<PendingOAuthFlow> {
        self.pending_oauth.lock().expect("pending oauth registry poisoned").remove(provider_id)
    }

    /// Non-destructively check whether an OAuth flow is pending for
    /// `provider_id`, for `ProvidersOAuthStatus` to poll without consuming
    /// the flow the way `take_pending_oauth` does.
    #[must_use]
    pub fn pending_oauth_mode(&self, provider_id: &str) -> Option<&'static str> {
        self.pending_oauth.lock().expect("pending oauth registry poisoned").get(provider_id).map(|flow| flow.mode)
    }

    /// Root directory for all workbenches, for building a workbench's
    /// `WorkbenchPaths` directly when a handle isn't otherwise needed.
    #[must_use]
    pub fn workbenches_root(&self) -> PathBuf {
        self.data_dir.join("workbenches")
    }

    /// Record the notification sink once `keenbench_rpc::serve` has
    /// produced it. Called exactly once, before the request loop starts.
    ///
    /// # Panics
    /// Panics if called more than once.
    pub fn install_notifications(&self, sink: NotificationSink) {
        self.notifications
            .set(sink)
            .unwrap_or_else(|_| panic!("install_notifications called twice"));
    }

    /// The shared notification sink.
    ///
    /// # Panics
    /// Panics if called before [`AppState::install_notifications`], which
    /// would indicate a bug in startup ordering, not a runtime condition a
    /// caller can recover from.
    #[must_use]
    pub fn notifications(&self) -> &NotificationSink {
        self.notifications.get().expect("notifications installed before the request loop starts")
    }

    /// The consent gate for `workbench_id`, created empty on first use.
    #[must_use]
    pub fn consent_gate(&self, workbench_id: &str) -> Arc<Mutex<ConsentGate>> {
        let mut gates = self.consent_gates.lock().expect("consent gate registry poisoned");
        gates.entry(workbench_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(ConsentGate::new()))).clone()
    }

    /// Start tracking a fresh cancel token for `workbench_id`'s in-flight
    /// Workshop run, replacing any stale token left by a prior run.
    #[must_use]
    pub fn begin_run(&self, workbench_id: &str) -> CancelToken {
        let token = CancelToken::new();
        let mut tokens = self.cancel_tokens.lock().expect("cancel token registry poisoned");
        tokens.insert(workbench_id.to_string(), token.clone());
        token
    }

    /// Stop tracking `workbench_id`'s cancel token once its run has
    /// finished, successfully or not.
    pub fn end_run(&self, workbench_id: &str) {
        self.cancel_tokens.lock().expect("cancel token registry poisoned").remove(workbench_id);
    }

    /// Signal cancellation for `workbench_id`'s in-flight run, if any.
    /// Returns `false` if no run is currently tracked.
    pub fn cancel_run(&self, workbench_id: &str) -> bool {
        match self.cancel_tokens.lock().expect("cancel token registry poisoned").get(workbench_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether `workbench_id` currently has an in-flight Workshop run.
    #[must_use]
    pub fn is_run_active(&self, workbench_id: &str) -> bool {
        self.cancel_tokens.lock().expect("cancel token registry poisoned").contains_key(workbench_id)
    }

    /// Path to the tool-worker's render helper, if one is configured
    /// separately from the primary tool-worker binary (`spec.md` §4.4).
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
