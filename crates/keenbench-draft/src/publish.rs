//! Publish: checkpoint the current `published/`, then atomically swap
//! `draft/` into its place (`spec.md` §4.6 "Publish").

use std::fs::OpenOptions;
use std::io::Write as _;

use keenbench_core::events::{ConversationEvent, ConversationEventKind};
use keenbench_error::{EngineError, ErrorCode};
use keenbench_workbench::WorkbenchPaths;
use tracing::info;
use uuid::Uuid;

use crate::atomic::{remove_if_exists, two_rename_swap};
use crate::checkpoint::{create_checkpoint, CheckpointReason};
use crate::state;

/// Result of a successful publish.
#[derive(Debug, Clone)]
pub struct PublishResult {
    /// Id of the checkpoint created from the pre-publish `published/` state.
    pub checkpoint_id: String,
}

/// Publish the current Draft: checkpoint `published/` as it stands, then
/// swap `draft/` into `published/`, and clear Draft state.
///
/// Order matters for crash safety: the checkpoint is durable *before* the
/// swap begins, so [`crate::recovery::recover_workbench`] can always fall
/// back to `published.prev/` if the swap is interrupted.
pub fn publish(paths: &WorkbenchPaths) -> Result<PublishResult, EngineError> {
    if !paths.draft().exists() {
        return Err(EngineError::new(ErrorCode::InvariantViolation, "no draft to publish"));
    }

    let checkpoint = create_checkpoint(paths, CheckpointReason::Publish, None)?;

    two_rename_swap(&paths.draft(), &paths.published(), &paths.published_prev())
        .map_err(|e| EngineError::new(ErrorCode::PublishFailed, format!("publish swap failed: {}", e.message)).with_source(e))?;
    remove_if_exists(&paths.published_prev())?;

    let draft_info = state::read_draft_info(paths)?;
    state::remove_draft_info(paths)?;
    if let Some(info) = draft_info {
        remove_if_exists(&paths.review_dir(&info.draft_id))?;
    }

    append_conversation_event(
        paths,
        ConversationEventKind::PublishCheckpoint {
            checkpoint_id: checkpoint.id.clone(),
        },
    )?;

    info!(checkpoint_id = %checkpoint.id, "published draft");
    Ok(PublishResult {
        checkpoint_id: checkpoint.id,
    })
}

fn append_conversation_event(paths: &WorkbenchPaths, kind: ConversationEventKind) -> Result<(), EngineError> {
    let event = ConversationEvent::new(Uuid::new_v4(), chrono::Utc::now(), kind);
    let line = serde_json::to_string(&event)
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("serialize conversation event: {e}")))?;

    std::fs::create_dir_all(paths.meta())
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("create meta/: {e}")).with_source(e))?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths.conversation_jsonl())
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("open conversation.jsonl: {e}")).with_source(e))?;
    writeln!(file, "{line}")
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("append conversation.jsonl: {e}")).with_source(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn publish_swaps_draft_into_published_and_clears_draft_state() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        fs::create_dir_all(paths.published()).unwrap();
        fs::write(paths.published().join("a.txt"), b"old").unwrap();
        crate::lifecycle::create_draft_if_needed(&paths, "manual_edit").unwrap();
        fs::write(paths.draft().join("a.txt"), b"new").unwrap();

        let result = publish(&paths).unwrap();
        assert_eq!(fs::read(paths.published().join("a.txt")).unwrap(), b"new");
        assert!(!paths.draft().exists());
        assert!(!paths.draft_json().exists());
        assert!(paths.checkpoint_dir(&result.checkpoint_id).join("files/a.txt").exists());

        let log = fs::read_to_string(paths.conversation_jsonl()).unwrap();
        assert!(log.contains("publish_checkpoint"));
    }

    #[test]
    fn publish_without_draft_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        fs::create_dir_all(paths.published()).unwrap();
        let err = publish(&paths).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvariantViolation);
    }
}
