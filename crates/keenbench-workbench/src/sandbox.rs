//! Path containment checks (`spec.md` §4.5 "Path resolution always checks
//! the resolved path has the workbench root as an ancestor").
//!
//! Grounded on the teacher's `abp-workspace::snapshot::capture`, which
//! canonicalizes its root before walking it; here the same canonicalize
//! step is used to defeat `..`/symlink tricks before the ancestor check.

use std::path::{Path, PathBuf};

use keenbench_error::{EngineError, ErrorCode};

/// Resolve `filename` as a flat child of `root`, rejecting anything that
/// is not a bare filename (no path separators, no `.`/`..` components) and
/// anything that would not resolve to a direct descendant of `root`.
///
/// `root` need not exist yet; only `filename`'s shape is checked, plus — if
/// `root` does exist — that the joined path's nearest existing ancestor
/// still canonicalizes under `root`.
pub fn resolve_flat_child(root: &Path, filename: &str) -> Result<PathBuf, EngineError> {
    if filename.is_empty() {
        return Err(violation("empty filename"));
    }
    let candidate = Path::new(filename);
    if candidate.components().count() != 1 {
        return Err(violation(format!(
            "'{filename}' is not a flat filename (workbenches have no subdirectories)"
        )));
    }
    if matches!(
        candidate.components().next(),
        Some(std::path::Component::ParentDir | std::path::Component::RootDir)
    ) {
        return Err(violation(format!("'{filename}' escapes its workbench root")));
    }

    let joined = root.join(filename);
    if let Ok(canon_root) = root.canonicalize() {
        // Only the parent need exist; the file itself may not yet.
        let check_target = if joined.exists() {
            joined.canonicalize().map_err(|e| {
                EngineError::new(ErrorCode::SandboxViolation, format!("cannot resolve '{filename}': {e}"))
            })?
        } else {
            canon_root.join(filename)
        };
        if !check_target.starts_with(&canon_root) {
            return Err(violation(format!("'{filename}' resolves outside its workbench root")));
        }
    }

    Ok(joined)
}

fn violation(message: impl Into<String>) -> EngineError {
    EngineError::new(ErrorCode::SandboxViolation, message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_filename() {
        let tmp = tempfile::tempdir().unwrap();
        let resolved = resolve_flat_child(tmp.path(), "notes.txt").unwrap();
        assert_eq!(resolved, tmp.path().join("notes.txt"));
    }

    #[test]
    fn rejects_parent_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve_flat_child(tmp.path(), "../escape.txt").unwrap_err();
        assert_eq!(err.code, ErrorCode::SandboxViolation);
    }

    #[test]
    fn rejects_nested_path() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve_flat_child(tmp.path(), "sub/file.txt").unwrap_err();
        assert_eq!(err.code, ErrorCode::SandboxViolation);
    }

    #[test]
    fn rejects_absolute_path() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve_flat_child(tmp.path(), "/etc/passwd").unwrap_err();
        assert_eq!(err.code, ErrorCode::SandboxViolation);
    }

    #[test]
    fn rejects_empty_filename() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve_flat_child(tmp.path(), "").unwrap_err();
        assert_eq!(err.code, ErrorCode::SandboxViolation);
    }
}
