//! Checkpoints: immutable snapshots of `published/` taken at publish time
//! or on manual request, restorable while the workbench is Idle
//! (`spec.md` §3 "Checkpoint", §4.6).

use std::fs;

use chrono::{DateTime, Utc};
use keenbench_error::{EngineError, ErrorCode};
use keenbench_workbench::WorkbenchPaths;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::atomic::{copy_tree, remove_if_exists, two_rename_swap};
use crate::state::{current_state, DraftState};

/// Why a checkpoint was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointReason {
    /// Created automatically as part of a publish.
    Publish,
    /// Created on explicit user request.
    Manual,
}

/// `meta/checkpoints/<id>/checkpoint.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Stable checkpoint id (also the directory name under `checkpoints/`).
    pub id: String,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Why this checkpoint exists.
    pub reason: CheckpointReason,
    /// Optional free-form note, e.g. a publish summary.
    pub description: Option<String>,
}

/// Snapshot `published/` into a new checkpoint directory and record its
/// metadata. Does not touch `published/` itself.
pub fn create_checkpoint(
    paths: &WorkbenchPaths,
    reason: CheckpointReason,
    description: Option<String>,
) -> Result<CheckpointMeta, EngineError> {
    let id = Uuid::new_v4().to_string();
    let dir = paths.checkpoint_dir(&id);
    copy_tree(&paths.published(), &dir.join("files"))?;

    let meta = CheckpointMeta {
        id: id.clone(),
        timestamp: Utc::now(),
        reason,
        description,
    };
    let bytes = serde_json::to_vec_pretty(&meta)
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("serialize checkpoint meta: {e}")))?;
    fs::write(dir.join("checkpoint.json"), &bytes)
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("write checkpoint meta: {e}")).with_source(e))?;

    info!(checkpoint_id = %id, ?reason, "created checkpoint");
    Ok(meta)
}

/// List all checkpoints, most recent first.
pub fn list_checkpoints(paths: &WorkbenchPaths) -> Result<Vec<CheckpointMeta>, EngineError> {
    let dir = paths.checkpoints_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(&dir)
        .map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("read checkpoints dir: {e}")).with_source(e))?
    {
        let entry = entry.map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("read checkpoints entry: {e}")).with_source(e))?;
        let meta_path = entry.path().join("checkpoint.json");
        let Ok(bytes) = fs::read(&meta_path) else { continue };
        let Ok(meta) = serde_json::from_slice::<CheckpointMeta>(&bytes) else { continue };
        out.push(meta);
    }
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(out)
}

/// Restore `published/` from a checkpoint. Only permitted while the
/// workbench is Idle (no Draft), since restoring over an active Draft
/// would silently discard in-progress work.
pub fn restore_checkpoint(paths: &WorkbenchPaths, checkpoint_id: &str) -> Result<(), EngineError> {
    if current_state(paths) != DraftState::Idle {
        return Err(EngineError::new(
            ErrorCode::RestoreBlockedByDraft,
            "cannot restore a checkpoint while a draft is active",
        ));
    }
    let files_dir = paths.checkpoint_dir(checkpoint_id).join("files");
    if !files_dir.exists() {
        return Err(EngineError::new(ErrorCode::NotFound, format!("checkpoint {checkpoint_id} not found")));
    }
    two_rename_swap(&files_dir, &paths.published(), &paths.published_prev())?;
    remove_if_exists(&paths.published_prev())?;

    info!(checkpoint_id, "restored checkpoint");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_list_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        fs::create_dir_all(paths.published()).unwrap();
        fs::write(paths.published().join("a.txt"), b"v1").unwrap();

        let meta = create_checkpoint(&paths, CheckpointReason::Manual, Some("snap".into())).unwrap();
        let listed = list_checkpoints(&paths).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, meta.id);
    }

    #[test]
    fn restore_replaces_published_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        fs::create_dir_all(paths.published()).unwrap();
        fs::write(paths.published().join("a.txt"), b"v1").unwrap();
        let meta = create_checkpoint(&paths, CheckpointReason::Manual, None).unwrap();

        fs::write(paths.published().join("a.txt"), b"v2").unwrap();
        restore_checkpoint(&paths, &meta.id).unwrap();

        assert_eq!(fs::read(paths.published().join("a.txt")).unwrap(), b"v1");
    }

    #[test]
    fn restore_blocked_while_drafting() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        fs::create_dir_all(paths.published()).unwrap();
        let meta = create_checkpoint(&paths, CheckpointReason::Manual, None).unwrap();
        fs::create_dir_all(paths.draft()).unwrap();

        let err = restore_checkpoint(&paths, &meta.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::RestoreBlockedByDraft);
    }
}
