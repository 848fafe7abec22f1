//! Unified error taxonomy with stable error codes for the KeenBench engine.
//!
//! Every engine error carries an [`ErrorCode`] (a machine-readable, stable
//! string tag), a human-readable message, a set of recoverable
//! [`ErrorAction`]s, and optional phase/provider/scope context. Use the
//! builder returned by [`EngineError::new`] to construct errors fluently;
//! [`EngineError::to_info`] produces the [`ErrorInfo`] DTO the JSON-RPC
//! server embeds in the `data` field of an error response (see
//! `spec.md` §4.1, §7).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code (`spec.md` §7).
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Configuration --
    /// Provider has no credentials configured.
    ProviderNotConfigured,
    /// Provider rejected the configured credentials.
    ProviderAuthFailed,

    // -- Policy --
    /// Egress consent has not been granted for this (provider, model, scope).
    EgressConsentRequired,
    /// The outbound request was blocked by transport policy before any bytes left the process.
    EgressBlockedByPolicy,

    // -- Validation --
    /// A request failed structural or semantic validation.
    ValidationFailed,
    /// A path escaped its sandbox root.
    SandboxViolation,
    /// An operation would violate a structural invariant of the data model.
    InvariantViolation,

    // -- Availability --
    /// The provider is rate-limiting requests.
    RateLimited,
    /// The provider is unavailable or the call exceeded its timeout.
    ProviderUnavailable,
    /// The tool-worker subprocess is unavailable (exhausted restarts, or mid-restart).
    ToolWorkerUnavailable,

    // -- State --
    /// The workbench lock could not be acquired for a mutating operation.
    Busy,
    /// The requested entity does not exist.
    NotFound,
    /// The operation conflicts with an existing Draft.
    ConflictDraftExists,
    /// Publish failed partway through the atomic swap.
    PublishFailed,
    /// Restore is blocked because a Draft currently exists.
    RestoreBlockedByDraft,

    // -- Control --
    /// The operation was canceled by the user.
    UserCanceled,
    /// The agent loop detected a repeated identical tool call and stopped.
    AgentLoopDetected,

    // -- Storage --
    /// Reading a file failed.
    FileReadFailed,
    /// Writing a file failed.
    FileWriteFailed,
    /// Loading a Workbench Context style skill failed.
    StyleSkillLoadFailed,
    /// Merging a document-style skill with a bundled format skill failed.
    StyleMergeFailed,
}

impl ErrorCode {
    /// Stable `&'static str` representation (e.g. `"PROVIDER_AUTH_FAILED"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProviderNotConfigured => "PROVIDER_NOT_CONFIGURED",
            Self::ProviderAuthFailed => "PROVIDER_AUTH_FAILED",
            Self::EgressConsentRequired => "EGRESS_CONSENT_REQUIRED",
            Self::EgressBlockedByPolicy => "EGRESS_BLOCKED_BY_POLICY",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::SandboxViolation => "SANDBOX_VIOLATION",
            Self::InvariantViolation => "INVARIANT_VIOLATION",
            Self::RateLimited => "RATE_LIMITED",
            Self::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            Self::ToolWorkerUnavailable => "TOOL_WORKER_UNAVAILABLE",
            Self::Busy => "BUSY",
            Self::NotFound => "NOT_FOUND",
            Self::ConflictDraftExists => "CONFLICT_DRAFT_EXISTS",
            Self::PublishFailed => "PUBLISH_FAILED",
            Self::RestoreBlockedByDraft => "RESTORE_BLOCKED_BY_DRAFT",
            Self::UserCanceled => "USER_CANCELED",
            Self::AgentLoopDetected => "AGENT_LOOP_DETECTED",
            Self::FileReadFailed => "FILE_READ_FAILED",
            Self::FileWriteFailed => "FILE_WRITE_FAILED",
            Self::StyleSkillLoadFailed => "STYLE_SKILL_LOAD_FAILED",
            Self::StyleMergeFailed => "STYLE_MERGE_FAILED",
        }
    }

    /// Default recoverable [`ErrorAction`]s for this code, per `spec.md` §7.
    ///
    /// Callers may still override with [`EngineError::with_actions`] when a
    /// more specific action set applies (e.g. `AgentLoopDetected` offers
    /// both `review_draft` and `discard_draft`, but only one may make sense
    /// in a given call site).
    #[must_use]
    pub fn default_actions(&self) -> Vec<ErrorAction> {
        use ErrorAction::{Discard, OpenSettings, Retry, Review};
        match self {
            Self::ProviderNotConfigured | Self::ProviderAuthFailed => vec![OpenSettings],
            Self::EgressConsentRequired => vec![Retry],
            Self::RateLimited | Self::ProviderUnavailable => vec![Retry],
            Self::AgentLoopDetected => vec![Review, Discard],
            _ => vec![],
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ErrorAction
// ---------------------------------------------------------------------------

/// One of the closed set of recovery actions a client may offer the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorAction {
    /// Retry the same call.
    Retry,
    /// Open the settings/provider-configuration surface.
    OpenSettings,
    /// Open the review (diff) surface for the current Draft.
    Review,
    /// Discard the current Draft.
    Discard,
}

// ---------------------------------------------------------------------------
// ErrorInfo (wire DTO)
// ---------------------------------------------------------------------------

/// The structured `data` payload of a JSON-RPC error response.
///
/// Mirrors `ErrorInfo` from `spec.md` §4.1 exactly; this is what crosses the
/// stdio boundary to the UI.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorInfo {
    /// Machine-readable error code.
    pub error_code: ErrorCode,
    /// The RPI phase active when the error occurred, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// A finer-grained subphase label, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subphase: Option<String>,
    /// Human-readable message. Never contains secret values.
    pub message: String,
    /// Recovery actions the client may offer.
    pub actions: Vec<ErrorAction>,
    /// Provider id, when the error is provider-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    /// Model id, when the error is model-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// Scope hash, when the error carries consent-scope context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Unified engine error.
///
/// # Builder usage
///
/// ```
/// use keenbench_error::{EngineError, ErrorCode};
///
/// let err = EngineError::new(ErrorCode::ProviderAuthFailed, "invalid API key")
///     .with_provider("openai")
///     .with_model("openai:gpt-5");
/// assert_eq!(err.code, ErrorCode::ProviderAuthFailed);
/// ```
pub struct EngineError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description. Must never contain secret values.
    pub message: String,
    /// RPI phase active when the error occurred.
    pub phase: Option<String>,
    /// Finer-grained subphase label.
    pub subphase: Option<String>,
    /// Recovery actions; defaults to `code.default_actions()`.
    pub actions: Vec<ErrorAction>,
    /// Provider id, when applicable.
    pub provider_id: Option<String>,
    /// Model id, when applicable.
    pub model_id: Option<String>,
    /// Scope hash, when applicable.
    pub scope_hash: Option<String>,
    /// Optional underlying cause, never serialized.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EngineError {
    /// Create a new error with the given code and message.
    ///
    /// `actions` defaults to [`ErrorCode::default_actions`]; override with
    /// [`Self::with_actions`] for call-site-specific recovery options.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let actions = code.default_actions();
        Self {
            code,
            message: message.into(),
            phase: None,
            subphase: None,
            actions,
            provider_id: None,
            model_id: None,
            scope_hash: None,
            source: None,
        }
    }

    /// Override the recovery actions.
    #[must_use]
    pub fn with_actions(mut self, actions: Vec<ErrorAction>) -> Self {
        self.actions = actions;
        self
    }

    /// Attach the RPI phase active when this error occurred.
    #[must_use]
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Attach a subphase label.
    #[must_use]
    pub fn with_subphase(mut self, subphase: impl Into<String>) -> Self {
        self.subphase = Some(subphase.into());
        self
    }

    /// Attach a provider id.
    #[must_use]
    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    /// Attach a model id.
    #[must_use]
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Attach a scope hash.
    #[must_use]
    pub fn with_scope_hash(mut self, scope_hash: impl Into<String>) -> Self {
        self.scope_hash = Some(scope_hash.into());
        self
    }

    /// Attach an underlying cause (not serialized; available for `tracing`).
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Produce the wire [`ErrorInfo`] DTO for this error.
    #[must_use]
    pub fn to_info(&self) -> ErrorInfo {
        ErrorInfo {
            error_code: self.code,
            phase: self.phase.clone(),
            subphase: self.subphase.clone(),
            message: self.message.clone(),
            actions: self.actions.clone(),
            provider_id: self.provider_id.clone(),
            model_id: self.model_id.clone(),
            scope_hash: self.scope_hash.clone(),
        }
    }
}

impl fmt::Debug for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("EngineError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref phase) = self.phase {
            d.field("phase", phase);
        }
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        d.finish()
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}
