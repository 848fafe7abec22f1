//! Lazy draft creation, proposal staging, and discard (`spec.md` §4.6).
//!
//! Populating `meta/review/<draft_id>/baseline/` with extracted text is out
//! of scope here: it requires calling the tool-worker (C4), which this crate
//! does not depend on. `create_draft_if_needed` creates the directory
//! skeleton only; the caller (the workshop/engine wiring layer) is
//! responsible for filling in baseline content before treating the draft as
//! fully initialized.

use std::fs;
use std::process;

use keenbench_error::{EngineError, ErrorCode};
use keenbench_workbench::WorkbenchPaths;
use tracing::info;
use uuid::Uuid;

use crate::atomic::{copy_tree, remove_if_exists, two_rename_swap};
use crate::state::{self, DraftInfo};

/// Outcome of a single file operation attempted during a staged proposal.
#[derive(Debug, Clone)]
pub struct FileApplyOutcome {
    /// Filename (flat, relative to the draft root) the operation targeted.
    pub path: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Failure detail, present iff `success` is false.
    pub failure_reason: Option<String>,
}

/// Per-proposal report: a proposal commits even if some per-file operations
/// failed, since `spec.md` §4.6 treats a proposal as best-effort.
#[derive(Debug, Clone, Default)]
pub struct ProposalReport {
    /// Outcome of every file operation the proposal attempted.
    pub file_results: Vec<FileApplyOutcome>,
}

impl ProposalReport {
    /// True if every file operation in this report succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.file_results.iter().all(|r| r.success)
    }
}

/// Ensure a Draft exists, creating one lazily from `published/` if not.
///
/// Returns `Some(draft_id)` if a new Draft was created, `None` if one
/// already existed. Also creates the (empty) `meta/review/<draft_id>/`
/// skeleton directories for a freshly created draft.
pub fn create_draft_if_needed(paths: &WorkbenchPaths, source: &str) -> Result<Option<String>, EngineError> {
    if paths.draft().exists() {
        return Ok(None);
    }
    copy_tree(&paths.published(), &paths.draft())?;

    let draft_id = Uuid::new_v4().to_string();
    fs::create_dir_all(paths.baseline_dir(&draft_id))
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("create baseline dir: {e}")).with_source(e))?;
    fs::create_dir_all(paths.summaries_dir(&draft_id))
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("create summaries dir: {e}")).with_source(e))?;
    fs::create_dir_all(paths.focus_dir(&draft_id))
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("create focus dir: {e}")).with_source(e))?;

    state::write_draft_info(
        paths,
        &DraftInfo {
            draft_id: draft_id.clone(),
            created_at: chrono::Utc::now(),
            source: source.to_string(),
        },
    )?;

    info!(draft_id = %draft_id, source, "created draft");
    Ok(Some(draft_id))
}

/// Begin staging a proposal: copy the current `draft/` into a
/// process-scoped staging directory the caller mutates freely.
///
/// Returns the staging directory path. Call [`commit_staging`] to swap it
/// in, or [`abort_staging`] to discard it, leaving `draft/` untouched
/// either way until commit.
pub fn begin_staging(paths: &WorkbenchPaths) -> Result<std::path::PathBuf, EngineError> {
    if !paths.draft().exists() {
        return Err(EngineError::new(ErrorCode::InvariantViolation, "no draft to stage a proposal against"));
    }
    let staging = paths.draft_staging(process::id());
    remove_if_exists(&staging)?;
    copy_tree(&paths.draft(), &staging)?;
    Ok(staging)
}

/// Commit a staged proposal: swap `staging` into `draft/` atomically.
///
/// Commits unconditionally once staging mechanics succeed — individual
/// file-operation failures recorded in `report` do not block the swap,
/// matching the best-effort-per-proposal semantics of `spec.md` §4.6.
pub fn commit_staging(
    paths: &WorkbenchPaths,
    staging: &std::path::Path,
    report: &ProposalReport,
) -> Result<(), EngineError> {
    two_rename_swap(staging, &paths.draft(), &paths.draft_prev())?;
    info!(
        files_attempted = report.file_results.len(),
        all_succeeded = report.all_succeeded(),
        "committed staged proposal"
    );
    Ok(())
}

/// Abort a staged proposal: delete the staging directory, leaving `draft/`
/// untouched.
pub fn abort_staging(staging: &std::path::Path) -> Result<(), EngineError> {
    remove_if_exists(staging)
}

/// Discard the current Draft entirely: delete `draft/`, `meta/draft.json`,
/// and its review directory, leaving `published/` untouched.
pub fn discard_draft(paths: &WorkbenchPaths) -> Result<(), EngineError> {
    let draft_info = state::read_draft_info(paths)?;
    remove_if_exists(&paths.draft())?;
    state::remove_draft_info(paths)?;
    if let Some(info) = draft_info {
        remove_if_exists(&paths.review_dir(&info.draft_id))?;
    }
    info!("discarded draft");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths_in(tmp: &std::path::Path) -> WorkbenchPaths {
        WorkbenchPaths::new(tmp)
    }

    #[test]
    fn create_draft_copies_published_and_writes_meta() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_in(tmp.path());
        fs::create_dir_all(paths.published()).unwrap();
        fs::write(paths.published().join("a.txt"), b"hello").unwrap();

        let created = create_draft_if_needed(&paths, "manual_edit").unwrap();
        assert!(created.is_some());
        assert_eq!(fs::read(paths.draft().join("a.txt")).unwrap(), b"hello");
        assert!(paths.baseline_dir(created.as_ref().unwrap()).exists());

        let second = create_draft_if_needed(&paths, "manual_edit").unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn staging_round_trip_commits_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_in(tmp.path());
        fs::create_dir_all(paths.published()).unwrap();
        create_draft_if_needed(&paths, "manual_edit").unwrap();

        let staging = begin_staging(&paths).unwrap();
        fs::write(staging.join("new.txt"), b"new").unwrap();
        let report = ProposalReport {
            file_results: vec![FileApplyOutcome {
                path: "new.txt".into(),
                success: true,
                failure_reason: None,
            }],
        };
        commit_staging(&paths, &staging, &report).unwrap();

        assert!(paths.draft().join("new.txt").exists());
        assert!(!staging.exists());
    }

    #[test]
    fn aborting_staging_leaves_draft_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_in(tmp.path());
        fs::create_dir_all(paths.published()).unwrap();
        create_draft_if_needed(&paths, "manual_edit").unwrap();

        let staging = begin_staging(&paths).unwrap();
        fs::write(staging.join("scratch.txt"), b"x").unwrap();
        abort_staging(&staging).unwrap();

        assert!(!staging.exists());
        assert!(!paths.draft().join("scratch.txt").exists());
    }

    #[test]
    fn discard_removes_draft_and_meta() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_in(tmp.path());
        fs::create_dir_all(paths.published()).unwrap();
        create_draft_if_needed(&paths, "manual_edit").unwrap();

        discard_draft(&paths).unwrap();
        assert!(!paths.draft().exists());
        assert!(!paths.draft_json().exists());
    }
}
