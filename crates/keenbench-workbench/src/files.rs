//! Add/remove/extract semantics for a workbench's `published/` file set
//! (`spec.md` §4.5).

use std::fs;
use std::path::{Path, PathBuf};

use keenbench_core::manifest::{Manifest, ManifestEntry};
use keenbench_error::{EngineError, ErrorCode};
use serde::{Deserialize, Serialize};

use crate::manifest_store;
use crate::paths::WorkbenchPaths;
use crate::sandbox::resolve_flat_child;

/// v1 limit on the number of files a single `add` batch may contain.
pub const MAX_BATCH_FILES: usize = 10;
/// Per-file size limit; larger files are skipped, not rejected outright.
pub const MAX_FILE_SIZE_BYTES: u64 = 25 * 1024 * 1024;

/// Why a single file in an add batch was skipped rather than added
/// (`spec.md` §8: "Add of a 26 MB file ⇒ skipped with `size_limit_exceeded`").
/// A fixed, machine-checkable tag rather than free text, so a caller can
/// branch on the reason without parsing a message string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The source path had no filename component to copy under.
    NoFilenameComponent,
    /// A manifest entry with the same filename already exists.
    DuplicateFilename,
    /// `fs::symlink_metadata` on the source path failed.
    StatFailed,
    /// The source path is a symlink.
    SymlinkNotPermitted,
    /// The source file is larger than [`MAX_FILE_SIZE_BYTES`].
    SizeLimitExceeded,
}

/// Outcome of adding a single file in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddFileStatus {
    /// The file was copied into `published/` and added to the manifest.
    Added,
    /// The file was not added; see the attached reason.
    Skipped(SkipReason),
}

/// Per-file result of [`add_files`].
#[derive(Debug, Clone)]
pub struct AddFileResult {
    /// The filename as it would appear (or would have appeared) in the manifest.
    pub filename: String,
    /// Whether the file was added or skipped, and why.
    pub status: AddFileStatus,
}

/// Add `sources` into `published/`, enforcing `spec.md` §4.5 add semantics:
/// whole-batch rejection above [`MAX_BATCH_FILES`]; oversize files skipped
/// rather than failing the batch; symlinks and filename duplicates
/// rejected per-file.
///
/// Requires the caller to have already verified no Draft exists for this
/// workbench (`spec.md` §3 "While a Draft exists... published/ adds... are
/// blocked"); this function does not itself check Draft state since it has
/// no visibility into `meta/draft.json`.
pub fn add_files(
    paths: &WorkbenchPaths,
    manifest: &mut Manifest,
    sources: &[PathBuf],
) -> Result<Vec<AddFileResult>, EngineError> {
    if sources.len() > MAX_BATCH_FILES {
        return Err(EngineError::new(
            ErrorCode::ValidationFailed,
            format!(
                "batch of {} files exceeds the v1 limit of {MAX_BATCH_FILES}",
                sources.len()
            ),
        ));
    }

    let published = paths.published();
    fs::create_dir_all(&published).map_err(|e| {
        EngineError::new(ErrorCode::FileWriteFailed, format!("create {}: {e}", published.display()))
            .with_source(e)
    })?;

    let mut existing: std::collections::HashSet<String> =
        manifest.entries.iter().map(|e| e.path.clone()).collect();
    let mut results = Vec::with_capacity(sources.len());

    for source in sources {
        let filename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if filename.is_empty() {
            results.push(AddFileResult {
                filename: source.to_string_lossy().into_owned(),
                status: AddFileStatus::Skipped(SkipReason::NoFilenameComponent),
            });
            continue;
        }

        if existing.contains(&filename) {
            results.push(AddFileResult {
                filename,
                status: AddFileStatus::Skipped(SkipReason::DuplicateFilename),
            });
            continue;
        }

        let metadata = match fs::symlink_metadata(source) {
            Ok(m) => m,
            Err(_) => {
                results.push(AddFileResult {
                    filename,
                    status: AddFileStatus::Skipped(SkipReason::StatFailed),
                });
                continue;
            }
        };

        if metadata.file_type().is_symlink() {
            results.push(AddFileResult {
                filename,
                status: AddFileStatus::Skipped(SkipReason::SymlinkNotPermitted),
            });
            continue;
        }

        if metadata.len() > MAX_FILE_SIZE_BYTES {
            results.push(AddFileResult {
                filename,
                status: AddFileStatus::Skipped(SkipReason::SizeLimitExceeded),
            });
            continue;
        }

        let dest = resolve_flat_child(&published, &filename)?;
        fs::copy(source, &dest).map_err(|e| {
            EngineError::new(ErrorCode::FileWriteFailed, format!("copy {}: {e}", source.display()))
                .with_source(e)
        })?;

        existing.insert(filename.clone());
        manifest.entries.push(ManifestEntry::from_path(filename.clone(), metadata.len()));
        results.push(AddFileResult {
            filename,
            status: AddFileStatus::Added,
        });
    }

    manifest.entries.sort_by(|a, b| a.path.cmp(&b.path));
    manifest_store::save(&paths.meta(), manifest)?;
    tracing::info!(
        target: "keenbench_workbench.files",
        added = results.iter().filter(|r| r.status == AddFileStatus::Added).count(),
        "processed add-files batch"
    );

    Ok(results)
}

/// Remove `filenames` from `published/` and the manifest.
///
/// Requires the caller to have already verified no Draft exists.
pub fn remove_files(
    paths: &WorkbenchPaths,
    manifest: &mut Manifest,
    filenames: &[String],
) -> Result<(), EngineError> {
    let published = paths.published();
    for filename in filenames {
        let target = resolve_flat_child(&published, filename)?;
        if target.exists() {
            fs::remove_file(&target).map_err(|e| {
                EngineError::new(ErrorCode::FileWriteFailed, format!("remove {}: {e}", target.display()))
                    .with_source(e)
            })?;
        }
        manifest.entries.retain(|e| &e.path != filename);
    }
    manifest_store::save(&paths.meta(), manifest)
}

/// Copy files out of `published/` to `dest_dir` on the user's disk. A
/// read-only operation; no Draft gating applies (`spec.md` §5 "Shared"
/// lock class).
pub fn extract_files(
    paths: &WorkbenchPaths,
    filenames: &[String],
    dest_dir: &Path,
) -> Result<Vec<PathBuf>, EngineError> {
    let published = paths.published();
    fs::create_dir_all(dest_dir).map_err(|e| {
        EngineError::new(ErrorCode::FileWriteFailed, format!("create {}: {e}", dest_dir.display()))
            .with_source(e)
    })?;

    let mut extracted = Vec::with_capacity(filenames.len());
    for filename in filenames {
        let source = resolve_flat_child(&published, filename)?;
        if !source.exists() {
            return Err(EngineError::new(
                ErrorCode::NotFound,
                format!("'{filename}' is not in this workbench"),
            ));
        }
        let dest = dest_dir.join(filename);
        fs::copy(&source, &dest).map_err(|e| {
            EngineError::new(ErrorCode::FileWriteFailed, format!("copy {}: {e}", source.display()))
                .with_source(e)
        })?;
        extracted.push(dest);
    }
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_workbench() -> (tempfile::TempDir, WorkbenchPaths) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path().join("wb"));
        fs::create_dir_all(paths.published()).unwrap();
        (tmp, paths)
    }

    fn write_source(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn adds_files_and_updates_manifest() {
        let (tmp, paths) = new_workbench();
        let src = write_source(tmp.path(), "notes.txt", b"hello");
        let mut manifest = Manifest::default();
        let results = add_files(&paths, &mut manifest, &[src]).unwrap();
        assert_eq!(results[0].status, AddFileStatus::Added);
        assert_eq!(manifest.len(), 1);
        assert!(paths.published().join("notes.txt").exists());
    }

    #[test]
    fn rejects_batches_over_the_limit() {
        let (tmp, paths) = new_workbench();
        let sources: Vec<_> = (0..11)
            .map(|i| write_source(tmp.path(), &format!("f{i}.txt"), b"x"))
            .collect();
        let mut manifest = Manifest::default();
        let err = add_files(&paths, &mut manifest, &sources).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn skips_oversize_files_without_failing_the_batch() {
        let (tmp, paths) = new_workbench();
        let big = write_source(tmp.path(), "big.bin", &vec![0u8; (MAX_FILE_SIZE_BYTES + 1) as usize]);
        let small = write_source(tmp.path(), "small.txt", b"ok");
        let mut manifest = Manifest::default();
        let results = add_files(&paths, &mut manifest, &[big, small]).unwrap();
        assert_eq!(results[0].status, AddFileStatus::Skipped(SkipReason::SizeLimitExceeded));
        assert_eq!(results[1].status, AddFileStatus::Added);
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn skips_duplicate_filenames() {
        let (tmp, paths) = new_workbench();
        let src = write_source(tmp.path(), "notes.txt", b"hello");
        let mut manifest = Manifest::new(vec![ManifestEntry::from_path("notes.txt", 5)]);
        let results = add_files(&paths, &mut manifest, &[src]).unwrap();
        assert_eq!(results[0].status, AddFileStatus::Skipped(SkipReason::DuplicateFilename));
    }

    #[test]
    fn removes_files_from_published_and_manifest() {
        let (tmp, paths) = new_workbench();
        let src = write_source(tmp.path(), "notes.txt", b"hello");
        let mut manifest = Manifest::default();
        add_files(&paths, &mut manifest, &[src]).unwrap();

        remove_files(&paths, &mut manifest, &["notes.txt".to_string()]).unwrap();
        assert!(manifest.is_empty());
        assert!(!paths.published().join("notes.txt").exists());
    }

    #[test]
    fn extracts_files_to_destination() {
        let (tmp, paths) = new_workbench();
        let src = write_source(tmp.path(), "notes.txt", b"hello");
        let mut manifest = Manifest::default();
        add_files(&paths, &mut manifest, &[src]).unwrap();

        let dest_dir = tmp.path().join("out");
        let extracted = extract_files(&paths, &["notes.txt".to_string()], &dest_dir).unwrap();
        assert_eq!(fs::read(&extracted[0]).unwrap(), b"hello");
    }
}
