//! Draft state and `meta/draft.json` (`spec.md` §3, §4.6).

use std::fs;

use chrono::{DateTime, Utc};
use keenbench_error::{EngineError, ErrorCode};
use keenbench_workbench::WorkbenchPaths;
use serde::{Deserialize, Serialize};

/// The four states a workbench may be in with respect to Draft/Publish.
///
/// Only [`DraftState::Idle`] and [`DraftState::Drafting`] are durable;
/// `Applying` and `Publishing` exist only for the duration of an in-flight
/// operation and are never read back from disk — a crash mid-transition
/// is instead resolved by [`crate::recovery::recover_workbench`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    /// No Draft exists.
    Idle,
    /// `draft/` exists.
    Drafting,
    /// A proposal is being staged (transient, in-process only).
    Applying,
    /// A publish swap is in progress (transient, in-process only).
    Publishing,
}

/// `meta/draft.json`, present iff a Draft exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftInfo {
    /// Stable id for this Draft, used to namespace `meta/review/<draft_id>/`.
    pub draft_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Free-form description of what created the Draft (e.g. a tool name
    /// or `"manual_edit"`); not interpreted by this crate.
    pub source: String,
}

/// Read the durable Draft state for a workbench: `Idle` if no Draft
/// exists, `Drafting` otherwise. Never returns `Applying`/`Publishing`.
#[must_use]
pub fn current_state(paths: &WorkbenchPaths) -> DraftState {
    if paths.draft().exists() {
        DraftState::Drafting
    } else {
        DraftState::Idle
    }
}

/// Read `meta/draft.json`, if present.
pub fn read_draft_info(paths: &WorkbenchPaths) -> Result<Option<DraftInfo>, EngineError> {
    let path = paths.draft_json();
    match fs::read(&path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| EngineError::new(ErrorCode::InvariantViolation, format!("malformed draft.json: {e}"))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EngineError::new(ErrorCode::FileReadFailed, format!("read draft.json: {e}")).with_source(e)),
    }
}

/// Atomically write `meta/draft.json`.
pub fn write_draft_info(paths: &WorkbenchPaths, info: &DraftInfo) -> Result<(), EngineError> {
    let bytes = serde_json::to_vec_pretty(info)
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("serialize draft.json: {e}")))?;
    let tmp = paths.meta().join("draft.json.tmp");
    fs::create_dir_all(paths.meta())
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("create meta/: {e}")).with_source(e))?;
    fs::write(&tmp, &bytes)
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("write {}: {e}", tmp.display())).with_source(e))?;
    fs::rename(&tmp, paths.draft_json())
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("rename draft.json: {e}")).with_source(e))
}

/// Remove `meta/draft.json`, if present.
pub fn remove_draft_info(paths: &WorkbenchPaths) -> Result<(), EngineError> {
    match fs::remove_file(paths.draft_json()) {
        Ok(()) | Err(_) if !paths.draft_json().exists() => Ok(()),
        Err(e) => Err(EngineError::new(ErrorCode::FileWriteFailed, format!("remove draft.json: {e}")).with_source(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_when_no_draft_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        assert_eq!(current_state(&paths), DraftState::Idle);
    }

    #[test]
    fn drafting_when_draft_dir_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        std::fs::create_dir_all(paths.draft()).unwrap();
        assert_eq!(current_state(&paths), DraftState::Drafting);
    }

    #[test]
    fn draft_info_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let info = DraftInfo {
            draft_id: "d1".into(),
            created_at: Utc::now(),
            source: "workshop_apply".into(),
        };
        write_draft_info(&paths, &info).unwrap();
        let loaded = read_draft_info(&paths).unwrap().unwrap();
        assert_eq!(loaded.draft_id, "d1");
    }
}
