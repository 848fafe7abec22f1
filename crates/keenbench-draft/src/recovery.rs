//! Startup crash recovery (`spec.md` §4.6 "Crash recovery").
//!
//! Every mutating Draft/Publish transition leaves at most one `.prev` or
//! `.staging` directory behind if interrupted; recovery resolves each one
//! deterministically without needing to know which operation was running.

use std::fs;
use std::path::Path;

use keenbench_error::{EngineError, ErrorCode};
use keenbench_workbench::WorkbenchPaths;
use tracing::{info, warn};

use crate::atomic::remove_if_exists;
use crate::state;

/// Recover a single workbench directory to a consistent state.
///
/// Rules, applied in order:
/// 1. If `draft.prev/` exists and `draft/` does not, a publish swap was
///    interrupted after renaming `draft/` away but before renaming the
///    staging source in — promote `draft.prev/` back to `draft/`.
/// 2. If `published.prev/` exists and `published/` does not, a publish or
///    checkpoint-restore swap was interrupted after renaming `published/`
///    away — promote `published.prev/` back to `published/`.
/// 3. Any `draft.<pid>.staging/` directories are leftover proposal staging
///    areas from a process that no longer exists — remove them.
/// 4. Any `meta/review/<id>/` whose `<id>` does not match the current
///    `meta/draft.json` (or whose draft no longer exists) is an orphan from
///    a discarded or published draft — remove it.
pub fn recover_workbench(paths: &WorkbenchPaths) -> Result<(), EngineError> {
    if paths.draft_prev().exists() && !paths.draft().exists() {
        warn!("recovering interrupted draft swap from draft.prev/");
        fs::rename(paths.draft_prev(), paths.draft())
            .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("promote draft.prev: {e}")).with_source(e))?;
    }
    remove_if_exists(&paths.draft_prev())?;

    if paths.published_prev().exists() && !paths.published().exists() {
        warn!("recovering interrupted publish swap from published.prev/");
        fs::rename(paths.published_prev(), paths.published())
            .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("promote published.prev: {e}")).with_source(e))?;
    }
    remove_if_exists(&paths.published_prev())?;

    remove_stale_staging_dirs(paths.root())?;
    remove_orphan_review_dirs(paths)?;

    info!("workbench recovery complete");
    Ok(())
}

/// Run [`recover_workbench`] over every workbench under `workbenches_root`.
pub fn recover_all(workbenches_root: &Path) -> Result<(), EngineError> {
    if !workbenches_root.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(workbenches_root)
        .map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("read workbenches root: {e}")).with_source(e))?
    {
        let entry = entry.map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("read workbenches entry: {e}")).with_source(e))?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            recover_workbench(&WorkbenchPaths::new(entry.path()))?;
        }
    }
    Ok(())
}

fn remove_stale_staging_dirs(root: &Path) -> Result<(), EngineError> {
    for entry in fs::read_dir(root)
        .map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("read workbench root: {e}")).with_source(e))?
    {
        let entry = entry.map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("read entry: {e}")).with_source(e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("draft.") && name.ends_with(".staging") {
            warn!(dir = %name, "removing stale proposal staging directory");
            remove_if_exists(&entry.path())?;
        }
    }
    Ok(())
}

fn remove_orphan_review_dirs(paths: &WorkbenchPaths) -> Result<(), EngineError> {
    let review_root = paths.meta().join("review");
    if !review_root.exists() {
        return Ok(());
    }
    let current_draft_id = state::read_draft_info(paths)?.map(|info| info.draft_id);

    for entry in fs::read_dir(&review_root)
        .map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("read review dir: {e}")).with_source(e))?
    {
        let entry = entry.map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("read review entry: {e}")).with_source(e))?;
        let id = entry.file_name().to_string_lossy().to_string();
        let is_current = current_draft_id.as_deref() == Some(id.as_str());
        if !is_current {
            warn!(draft_id = %id, "removing orphan review directory");
            remove_if_exists(&entry.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotes_draft_prev_when_draft_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        fs::create_dir_all(paths.draft_prev()).unwrap();
        fs::write(paths.draft_prev().join("a.txt"), b"x").unwrap();
        fs::create_dir_all(paths.published()).unwrap();

        recover_workbench(&paths).unwrap();
        assert!(paths.draft().join("a.txt").exists());
        assert!(!paths.draft_prev().exists());
    }

    #[test]
    fn promotes_published_prev_when_published_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        fs::create_dir_all(paths.published_prev()).unwrap();
        fs::write(paths.published_prev().join("a.txt"), b"x").unwrap();

        recover_workbench(&paths).unwrap();
        assert!(paths.published().join("a.txt").exists());
        assert!(!paths.published_prev().exists());
    }

    #[test]
    fn removes_stale_staging_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        fs::create_dir_all(paths.published()).unwrap();
        fs::create_dir_all(paths.root().join("draft.12345.staging")).unwrap();

        recover_workbench(&paths).unwrap();
        assert!(!paths.root().join("draft.12345.staging").exists());
    }

    #[test]
    fn removes_orphan_review_dirs_with_no_current_draft() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        fs::create_dir_all(paths.published()).unwrap();
        fs::create_dir_all(paths.review_dir("stale-id")).unwrap();

        recover_workbench(&paths).unwrap();
        assert!(!paths.review_dir("stale-id").exists());
    }

    #[test]
    fn keeps_review_dir_matching_current_draft() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        fs::create_dir_all(paths.published()).unwrap();
        crate::lifecycle::create_draft_if_needed(&paths, "manual_edit").unwrap();
        let draft_id = state::read_draft_info(&paths).unwrap().unwrap().draft_id;

        recover_workbench(&paths).unwrap();
        assert!(paths.review_dir(&draft_id).exists());
    }
}
