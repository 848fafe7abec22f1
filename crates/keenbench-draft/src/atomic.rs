//! Directory-tree copy and two-rename swap primitives shared by every
//! Draft/Publish transition (`spec.md` §4.6).
//!
//! Generalizes the temp-file-then-rename idiom used elsewhere in this
//! workspace (`keenbench-settings::store`, `keenbench-secrets::store`)
//! from single files to whole directory trees, and the teacher's
//! `abp-workspace::copy_workspace` flat recursive copy to a persistent
//! (not disposable-temp-dir) destination.

use std::fs;
use std::path::Path;

use keenbench_error::{EngineError, ErrorCode};

/// Recursively copy every regular file and subdirectory from `src` to
/// `dest`, creating `dest` if needed. Symlinks are not followed or copied.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<(), EngineError> {
    fs::create_dir_all(dest).map_err(|e| write_failed(dest, e))?;
    if !src.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(src).map_err(|e| read_failed(src, e))? {
        let entry = entry.map_err(|e| read_failed(src, e))?;
        let file_type = entry.file_type().map_err(|e| read_failed(&entry.path(), e))?;
        let dest_path = dest.join(entry.file_name());
        if file_type.is_dir() {
            copy_tree(&entry.path(), &dest_path)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &dest_path).map_err(|e| write_failed(&dest_path, e))?;
        }
    }
    Ok(())
}

/// Swap `from` into `to` via the two-rename protocol: rename `to` out of
/// the way to `backup`, rename `from` into `to`, then delete `backup`.
///
/// On any failure after `to` has been moved to `backup` but before `from`
/// has landed at `to`, `backup` is left in place so the caller's recovery
/// pass can promote it back.
pub fn two_rename_swap(from: &Path, to: &Path, backup: &Path) -> Result<(), EngineError> {
    if to.exists() {
        fs::rename(to, backup).map_err(|e| write_failed(backup, e))?;
    }
    fs::rename(from, to).map_err(|e| write_failed(to, e))?;
    if backup.exists() {
        fs::remove_dir_all(backup).map_err(|e| write_failed(backup, e))?;
    }
    Ok(())
}

/// Remove a directory tree if it exists; a no-op otherwise.
pub fn remove_if_exists(path: &Path) -> Result<(), EngineError> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| write_failed(path, e))?;
    }
    Ok(())
}

fn read_failed(path: &Path, e: std::io::Error) -> EngineError {
    EngineError::new(ErrorCode::FileReadFailed, format!("read {}: {e}", path.display())).with_source(e)
}

fn write_failed(path: &Path, e: std::io::Error) -> EngineError {
    EngineError::new(ErrorCode::FileWriteFailed, format!("write {}: {e}", path.display())).with_source(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_tree_duplicates_nested_structure() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("a.txt"), b"a").unwrap();
        fs::write(src.join("sub/b.txt"), b"b").unwrap();

        let dest = tmp.path().join("dest");
        copy_tree(&src, &dest).unwrap();
        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"a");
        assert_eq!(fs::read(dest.join("sub/b.txt")).unwrap(), b"b");
    }

    #[test]
    fn two_rename_swap_replaces_destination_and_cleans_up_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let from = tmp.path().join("from");
        let to = tmp.path().join("to");
        let backup = tmp.path().join("backup");
        fs::create_dir_all(&from).unwrap();
        fs::write(from.join("new.txt"), b"new").unwrap();
        fs::create_dir_all(&to).unwrap();
        fs::write(to.join("old.txt"), b"old").unwrap();

        two_rename_swap(&from, &to, &backup).unwrap();

        assert!(to.join("new.txt").exists());
        assert!(!from.exists());
        assert!(!backup.exists());
    }

    #[test]
    fn two_rename_swap_into_nonexistent_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let from = tmp.path().join("from");
        let to = tmp.path().join("to");
        let backup = tmp.path().join("backup");
        fs::create_dir_all(&from).unwrap();

        two_rename_swap(&from, &to, &backup).unwrap();
        assert!(to.exists());
    }
}
