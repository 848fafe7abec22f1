//! On-disk storage for Context artifacts under `meta/context/<category>/`
//! (`spec.md` §3, §4.11).
//!
//! Mutating entry points take a `draft_exists: bool` computed by the
//! caller from `keenbench-draft::state::current_state`, the same
//! convention `keenbench-workbench::WorkbenchManager::delete`/`fork` use to
//! avoid this crate depending on `keenbench-draft` directly.

use std::path::Path;

use keenbench_error::{EngineError, ErrorCode};
use keenbench_workbench::WorkbenchPaths;

use crate::frontmatter;
use crate::types::{ArtifactKind, Category, ContextArtifact, ContextSummary};

const SKILL_FILE: &str = "SKILL.md";
const SITUATION_FILE: &str = "context.md";

fn artifact_file_name(category: Category) -> &'static str {
    if category.is_skill() {
        SKILL_FILE
    } else {
        SITUATION_FILE
    }
}

/// List every category and whether it currently has an artifact.
#[must_use]
pub fn list(paths: &WorkbenchPaths) -> Vec<ContextSummary> {
    Category::all()
        .into_iter()
        .map(|category| ContextSummary { category, present: artifact_path(paths, category).exists() })
        .collect()
}

/// The path to `category`'s primary artifact file (`SKILL.md`/`context.md`).
#[must_use]
pub fn artifact_path(paths: &WorkbenchPaths, category: Category) -> std::path::PathBuf {
    paths.context_dir(category.dir_name()).join(artifact_file_name(category))
}

/// Read and parse `category`'s artifact, or `None` if it doesn't exist.
pub fn get(paths: &WorkbenchPaths, category: Category) -> Result<Option<ContextArtifact>, EngineError> {
    let path = artifact_path(paths, category);
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("reading {}: {e}", path.display())))?;

    let (kind, frontmatter, body) = if category.is_skill() {
        let (fm, body) = frontmatter::parse(&raw)?;
        (ArtifactKind::Skill, Some(fm), body)
    } else {
        (ArtifactKind::Situation, None, raw)
    };

    let referenced_files = list_referenced_files(paths, category)?;
    Ok(Some(ContextArtifact { category, kind, frontmatter, body, referenced_files }))
}

/// List every file under `category`'s directory other than the primary
/// artifact file, relative to that directory.
pub fn list_referenced_files(paths: &WorkbenchPaths, category: Category) -> Result<Vec<String>, EngineError> {
    let dir = paths.context_dir(category.dir_name());
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let primary = artifact_file_name(category);
    let mut files = Vec::new();
    collect_files(&dir, &dir, primary, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(root: &Path, dir: &Path, primary: &str, out: &mut Vec<String>) -> Result<(), EngineError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("reading {}: {e}", dir.display())))?;
    for entry in entries {
        let entry =
            entry.map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("reading directory entry: {e}")))?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, primary, out)?;
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().replace('\\', "/");
        if relative != primary {
            out.push(relative);
        }
    }
    Ok(())
}

/// Delete `category`'s artifact directory entirely (`ContextDelete`).
/// Blocked while a Draft exists (`spec.md` §4.11: "All mutations blocked
/// while Draft exists").
pub fn delete(paths: &WorkbenchPaths, category: Category, draft_exists: bool) -> Result<(), EngineError> {
    if draft_exists {
        return Err(EngineError::new(ErrorCode::ConflictDraftExists, "Context mutations are blocked while a Draft exists"));
    }
    let dir = paths.context_dir(category.dir_name());
    if dir.exists() {
        std::fs::remove_dir_all(&dir)
            .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("deleting {}: {e}", dir.display())))?;
    }
    Ok(())
}

/// Overwrite `category`'s primary artifact file verbatim (`ContextUpdateDirect`),
/// bypassing hard validation by design (`spec.md` §4.11). Blocked while a
/// Draft exists.
pub fn update_direct(
    paths: &WorkbenchPaths,
    category: Category,
    content: &str,
    draft_exists: bool,
) -> Result<(), EngineError> {
    if draft_exists {
        return Err(EngineError::new(ErrorCode::ConflictDraftExists, "Context mutations are blocked while a Draft exists"));
    }
    let dir = paths.context_dir(category.dir_name());
    std::fs::create_dir_all(&dir)
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("creating {}: {e}", dir.display())))?;
    let path = artifact_path(paths, category);
    std::fs::write(&path, content)
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("writing {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_reports_absent_categories() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let summaries = list(&paths);
        assert_eq!(summaries.len(), 4);
        assert!(summaries.iter().all(|s| !s.present));
    }

    #[test]
    fn update_direct_then_list_reports_present() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        update_direct(&paths, Category::Situation, "a new situation", false).unwrap();
        let summaries = list(&paths);
        let situation = summaries.iter().find(|s| s.category == Category::Situation).unwrap();
        assert!(situation.present);
    }

    #[test]
    fn update_direct_blocked_while_draft_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let err = update_direct(&paths, Category::Situation, "x", true).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConflictDraftExists);
    }

    #[test]
    fn get_returns_none_for_absent_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        assert!(get(&paths, Category::CompanyContext).unwrap().is_none());
    }

    #[test]
    fn get_parses_skill_frontmatter_and_lists_referenced_files() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let dir = paths.context_dir("company-context");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            "---\nname: company-context\ndescription: acme\n---\n\nbody text",
        )
        .unwrap();
        std::fs::write(dir.join("reference.md"), "ref").unwrap();

        let artifact = get(&paths, Category::CompanyContext).unwrap().unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Skill);
        assert_eq!(artifact.frontmatter.unwrap().name, "company-context");
        assert_eq!(artifact.body, "body text");
        assert_eq!(artifact.referenced_files, vec!["reference.md".to_string()]);
    }

    #[test]
    fn get_situation_has_no_frontmatter() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        update_direct(&paths, Category::Situation, "plain text", false).unwrap();
        let artifact = get(&paths, Category::Situation).unwrap().unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Situation);
        assert!(artifact.frontmatter.is_none());
        assert_eq!(artifact.body, "plain text");
    }

    #[test]
    fn delete_removes_the_category_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        update_direct(&paths, Category::Situation, "x", false).unwrap();
        delete(&paths, Category::Situation, false).unwrap();
        assert!(get(&paths, Category::Situation).unwrap().is_none());
    }

    #[test]
    fn delete_blocked_while_draft_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let err = delete(&paths, Category::Situation, true).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConflictDraftExists);
    }
}
