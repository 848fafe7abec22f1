//! Persistence of `meta/workshop_state.json` (`spec.md` §3 data model:
//! `workshop_state.json {active_model_id, head, chat_mode}`).
//!
//! One small JSON document per workbench, rewritten wholesale on every
//! change — there is never enough contention or size here to warrant the
//! append-only treatment the conversation log gets.

use keenbench_error::{EngineError, ErrorCode};
use keenbench_workbench::WorkbenchPaths;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether Workshop runs tool calls autonomously or pauses for approval
/// before applying them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    /// Tool calls execute without pausing for per-call approval.
    Agent,
    /// Tool calls require explicit confirmation before executing.
    Ask,
}

impl Default for ChatMode {
    fn default() -> Self {
        Self::Agent
    }
}

/// A workbench's Workshop session state: which model is active, where the
/// conversation head sits, and which chat mode is in effect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkshopState {
    /// `provider:model` id of the currently active model, if one has been
    /// set for this workbench.
    pub active_model_id: Option<String>,
    /// Id of the most recent conversation event, for `WorkshopGetState`
    /// callers to detect whether anything changed since they last polled.
    pub head: Option<Uuid>,
    /// Agent vs. ask-before-acting.
    pub chat_mode: ChatMode,
}

/// Load `meta/workshop_state.json`, or a default state if the workbench has
/// never had one written.
pub async fn load(paths: &WorkbenchPaths) -> Result<WorkshopState, EngineError> {
    match tokio::fs::read(paths.workshop_state_json()).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("parsing workshop_state.json failed: {e}"))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(WorkshopState::default()),
        Err(e) => Err(EngineError::new(ErrorCode::FileReadFailed, format!("reading workshop_state.json failed: {e}"))),
    }
}

/// Overwrite `meta/workshop_state.json` with `state`.
pub async fn save(paths: &WorkbenchPaths, state: &WorkshopState) -> Result<(), EngineError> {
    tokio::fs::create_dir_all(paths.meta())
        .await
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("creating meta/ failed: {e}")))?;
    let bytes = serde_json::to_vec_pretty(state)
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("serializing workshop_state.json failed: {e}")))?;
    tokio::fs::write(paths.workshop_state_json(), bytes)
        .await
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("writing workshop_state.json failed: {e}")))
}

/// Set the active model, leaving `head`/`chat_mode` unchanged.
pub async fn set_active_model(paths: &WorkbenchPaths, model_id: &str) -> Result<WorkshopState, EngineError> {
    let mut state = load(paths).await?;
    state.active_model_id = Some(model_id.to_string());
    save(paths, &state).await?;
    Ok(state)
}

/// Set the chat mode, leaving `active_model_id`/`head` unchanged.
pub async fn set_chat_mode(paths: &WorkbenchPaths, chat_mode: ChatMode) -> Result<WorkshopState, EngineError> {
    let mut state = load(paths).await?;
    state.chat_mode = chat_mode;
    save(paths, &state).await?;
    Ok(state)
}

/// Advance `head` to `event_id`, leaving the rest of the state unchanged.
/// Called after every conversation-log append or truncation.
pub async fn set_head(paths: &WorkbenchPaths, event_id: Uuid) -> Result<WorkshopState, EngineError> {
    let mut state = load(paths).await?;
    state.head = Some(event_id);
    save(paths, &state).await?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_defaults_when_no_file_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let state = load(&paths).await.unwrap();
        assert_eq!(state.active_model_id, None);
        assert_eq!(state.head, None);
        assert_eq!(state.chat_mode, ChatMode::Agent);
    }

    #[tokio::test]
    async fn set_active_model_persists_and_preserves_other_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        set_chat_mode(&paths, ChatMode::Ask).await.unwrap();
        let state = set_active_model(&paths, "openai:gpt-4.1").await.unwrap();
        assert_eq!(state.active_model_id.as_deref(), Some("openai:gpt-4.1"));
        assert_eq!(state.chat_mode, ChatMode::Ask);

        let reloaded = load(&paths).await.unwrap();
        assert_eq!(reloaded.active_model_id.as_deref(), Some("openai:gpt-4.1"));
    }

    #[tokio::test]
    async fn set_head_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let id = Uuid::new_v4();
        set_head(&paths, id).await.unwrap();
        assert_eq!(load(&paths).await.unwrap().head, Some(id));
    }
}
