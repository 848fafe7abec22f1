//! Loading, migrating, and atomically persisting `meta/files.json`
//! (`spec.md` §4.5 "Manifest v1→v2 migration").

use std::fs;
use std::path::Path;

use keenbench_core::manifest::{Manifest, ManifestEntry};
use keenbench_error::{EngineError, ErrorCode};
use serde::Deserialize;

/// A v1 manifest entry: just `path` and `size`, no derived classification.
#[derive(Debug, Deserialize)]
struct ManifestEntryV1 {
    path: String,
    size: u64,
}

/// Load `meta/files.json`, migrating a v1 manifest in place if needed.
///
/// Returns an empty manifest if the file does not exist yet (a freshly
/// created workbench).
pub fn load_or_migrate(meta_dir: &Path) -> Result<Manifest, EngineError> {
    let path = meta_dir.join("files.json");
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Manifest::default()),
        Err(e) => {
            return Err(EngineError::new(ErrorCode::FileReadFailed, format!("read {}: {e}", path.display()))
                .with_source(e))
        }
    };

    if let Ok(v2) = serde_json::from_slice::<Manifest>(&bytes) {
        return Ok(v2);
    }

    let v1: Vec<ManifestEntryV1> = serde_json::from_slice(&bytes).map_err(|e| {
        EngineError::new(
            ErrorCode::InvariantViolation,
            format!("files.json is neither a valid v1 nor v2 manifest: {e}"),
        )
    })?;

    tracing::info!(
        target: "keenbench_workbench.manifest",
        entries = v1.len(),
        "migrating manifest v1 to v2"
    );

    let migrated: Vec<ManifestEntry> = v1
        .into_iter()
        .map(|e| ManifestEntry::from_path(e.path, e.size))
        .collect();
    let manifest = Manifest::new(migrated);
    save(meta_dir, &manifest)?;
    Ok(manifest)
}

/// Atomically persist `manifest` to `meta/files.json` (temp + rename).
pub fn save(meta_dir: &Path, manifest: &Manifest) -> Result<(), EngineError> {
    fs::create_dir_all(meta_dir).map_err(|e| {
        EngineError::new(ErrorCode::FileWriteFailed, format!("create {}: {e}", meta_dir.display()))
            .with_source(e)
    })?;
    let path = meta_dir.join("files.json");
    let tmp_path = meta_dir.join("files.json.tmp");
    let bytes = serde_json::to_vec_pretty(manifest).map_err(|e| {
        EngineError::new(ErrorCode::FileWriteFailed, format!("serialize manifest: {e}"))
    })?;
    fs::write(&tmp_path, &bytes).map_err(|e| {
        EngineError::new(ErrorCode::FileWriteFailed, format!("write {}: {e}", tmp_path.display()))
            .with_source(e)
    })?;
    fs::rename(&tmp_path, &path).map_err(|e| {
        EngineError::new(ErrorCode::FileWriteFailed, format!("rename into {}: {e}", path.display()))
            .with_source(e)
    })
}
