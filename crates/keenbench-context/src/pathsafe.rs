//! Path-safety checks for Context artifact referenced files
//! (`spec.md` §4.11: "referenced files exist and are path-safe").
//!
//! Generalizes `keenbench-workbench::sandbox::resolve_flat_child`'s
//! canonicalize-then-ancestor-check to relative paths with subdirectories —
//! a skill's referenced files live in the same `meta/context/<category>/`
//! directory as `SKILL.md` but may be nested (e.g. `examples/sample.md`).

use std::path::{Path, PathBuf};

use keenbench_error::{EngineError, ErrorCode};

/// Resolve `relative_path` as a descendant of `root`, rejecting absolute
/// paths, `..` components, and anything that would canonicalize outside
/// `root`.
pub fn resolve_descendant(root: &Path, relative_path: &str) -> Result<PathBuf, EngineError> {
    if relative_path.is_empty() {
        return Err(violation("empty referenced-file path"));
    }
    let candidate = Path::new(relative_path);
    if candidate.is_absolute() {
        return Err(violation(format!("'{relative_path}' is an absolute path")));
    }
    if candidate.components().any(|c| matches!(c, std::path::Component::ParentDir | std::path::Component::RootDir)) {
        return Err(violation(format!("'{relative_path}' escapes its context directory")));
    }

    let joined = root.join(candidate);
    if let Ok(canon_root) = root.canonicalize() {
        let check_target = if joined.exists() {
            joined
                .canonicalize()
                .map_err(|e| EngineError::new(ErrorCode::SandboxViolation, format!("cannot resolve '{relative_path}': {e}")))?
        } else {
            canon_root.join(candidate)
        };
        if !check_target.starts_with(&canon_root) {
            return Err(violation(format!("'{relative_path}' resolves outside its context directory")));
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
    fn accepts_nested_relative_path() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("examples")).unwrap();
        let resolved = resolve_descendant(tmp.path(), "examples/sample.md").unwrap();
        assert_eq!(resolved, tmp.path().join("examples/sample.md"));
    }

    #[test]
    fn rejects_parent_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve_descendant(tmp.path(), "../escape.txt").unwrap_err();
        assert_eq!(err.code, ErrorCode::SandboxViolation);
    }

    #[test]
    fn rejects_absolute_path() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve_descendant(tmp.path(), "/etc/passwd").unwrap_err();
        assert_eq!(err.code, ErrorCode::SandboxViolation);
    }

    #[test]
    fn rejects_empty_path() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve_descendant(tmp.path(), "").unwrap_err();
        assert_eq!(err.code, ErrorCode::SandboxViolation);
    }
}
