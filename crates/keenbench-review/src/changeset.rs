//! `ReviewGetChangeSet` (`spec.md` §4.10): enumerate `published/` ∪
//! `draft/`, classify each path, and attach preview metadata.

use std::collections::BTreeSet;
use std::path::Path;

use keenbench_core::manifest::{mime_type_for_extension, FileKind};
use keenbench_error::{EngineError, ErrorCode};
use keenbench_workbench::WorkbenchPaths;

use crate::summaries::read_summary;
use crate::types::{ChangeItem, ChangeSet, ChangeType, preview_kind_for};

/// Build the change set for a workbench's current Draft.
///
/// `draft_id` namespaces the focus-hint and summary lookups under
/// `meta/review/<draft_id>/`. The caller is responsible for confirming a
/// Draft actually exists before calling this (an empty `draft/` directory
/// reads as an empty change set, not an error).
///
/// # Errors
///
/// Returns `INVARIANT_VIOLATION` if a path present in `published/` is
/// missing from `draft/` — deletions are not representable in the current
/// milestone (`spec.md` §4.10).
pub fn get_change_set(paths: &WorkbenchPaths, draft_id: &str) -> Result<ChangeSet, EngineError> {
    let published_names = list_flat_files(&paths.published())?;
    let draft_names = list_flat_files(&paths.draft())?;

    for name in &published_names {
        if !draft_names.contains(name) {
            return Err(EngineError::new(
                ErrorCode::InvariantViolation,
                format!("`{name}` was removed from the Draft; deletions are not supported in this milestone"),
            ));
        }
    }

    let mut items = Vec::with_capacity(draft_names.len());
    for name in &draft_names {
        let change_type = if published_names.contains(name) { ChangeType::Modified } else { ChangeType::Added };
        let ext = name.rsplit('.').next().unwrap_or("");
        let file_kind = FileKind::from_extension(ext);

        let focus_hint = read_focus_hint(paths, draft_id, name);
        let summary = read_summary(paths, draft_id, name);

        items.push(ChangeItem {
            path: name.clone(),
            change_type,
            file_kind,
            preview_kind: preview_kind_for(file_kind),
            mime_type: mime_type_for_extension(ext),
            is_opaque: file_kind.is_opaque(),
            focus_hint,
            summary,
        });
    }

    items.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(ChangeSet { items })
}

fn read_focus_hint(paths: &WorkbenchPaths, draft_id: &str, relative_path: &str) -> Option<keenbench_workshop::FocusHint> {
    let file = paths.focus_dir(draft_id).join(format!("{relative_path}.json"));
    let bytes = std::fs::read(file).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn list_flat_files(dir: &Path) -> Result<BTreeSet<String>, EngineError> {
    let mut names = BTreeSet::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(EngineError::new(ErrorCode::FileReadFailed, format!("reading {}: {e}", dir.display())).with_source(e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("reading {}: {e}", dir.display())).with_source(e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("reading {}: {e}", dir.display())).with_source(e))?;
        if file_type.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.insert(name.to_string());
            }
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(name), b"content").unwrap();
    }

    #[test]
    fn classifies_added_and_modified() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        write(&paths.published(), "report.docx");
        write(&paths.draft(), "report.docx");
        write(&paths.draft(), "new.txt");

        let set = get_change_set(&paths, "draft-1").unwrap();
        let by_path: std::collections::HashMap<_, _> = set.items.iter().map(|i| (i.path.clone(), i.change_type)).collect();
        assert_eq!(by_path["report.docx"], ChangeType::Modified);
        assert_eq!(by_path["new.txt"], ChangeType::Added);
    }

    #[test]
    fn missing_published_file_is_invariant_violation() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        write(&paths.published(), "report.docx");
        std::fs::create_dir_all(paths.draft()).unwrap();

        let err = get_change_set(&paths, "draft-1").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvariantViolation);
    }

    #[test]
    fn missing_draft_directory_with_published_files_is_also_invariant_violation() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        write(&paths.published(), "report.docx");
        // no draft/ directory at all — every published path reads as "deleted"

        let err = get_change_set(&paths, "draft-1").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvariantViolation);
    }

    #[test]
    fn empty_published_and_draft_yields_empty_change_set() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        std::fs::create_dir_all(paths.draft()).unwrap();

        let set = get_change_set(&paths, "draft-1").unwrap();
        assert!(set.items.is_empty());
    }

    #[test]
    fn preview_kind_maps_by_file_kind() {
        use crate::types::PreviewKind;
        assert_eq!(preview_kind_for(FileKind::Xlsx), PreviewKind::Grid);
        assert_eq!(preview_kind_for(FileKind::Pdf), PreviewKind::Image);
        assert_eq!(preview_kind_for(FileKind::Docx), PreviewKind::Diff);
        assert_eq!(preview_kind_for(FileKind::Binary), PreviewKind::None);
    }
}
