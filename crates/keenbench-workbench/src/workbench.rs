//! Workbench lifecycle: create, open, list, fork, delete (`spec.md` §4.5).

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use keenbench_core::manifest::Manifest;
use keenbench_error::{EngineError, ErrorCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::manifest_store;
use crate::paths::WorkbenchPaths;

/// `meta/workbench.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbenchMeta {
    /// Stable workbench id.
    pub id: String,
    /// User-facing display name.
    pub display_name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Source workbench id, when this workbench was created by a fork.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_workbench_id: Option<String>,
}

/// A loaded, ready-to-use workbench: its paths, metadata, and manifest.
pub struct WorkbenchHandle {
    /// Directory layout for this workbench.
    pub paths: WorkbenchPaths,
    /// `meta/workbench.json` contents.
    pub meta: WorkbenchMeta,
    /// `meta/files.json` contents.
    pub manifest: Manifest,
}

/// Summary row for [`WorkbenchManager::list`].
#[derive(Debug, Clone)]
pub struct WorkbenchSummary {
    /// Workbench id.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Number of files currently in the manifest.
    pub file_count: usize,
}

/// Which files a fork carries over (`spec.md` §4.5 "Fork modes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkMode {
    /// New workbench, copy of `published/` only.
    CloneFilesOnly,
    /// Copy of `published/` plus the conversation log.
    CloneAll,
}

/// Creates, opens, lists, forks, and deletes workbenches under a shared
/// `workbenches/` root.
pub struct WorkbenchManager {
    root: PathBuf,
}

impl WorkbenchManager {
    /// Build a manager rooted at `workbenches_root` (created if absent).
    pub fn new(workbenches_root: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let root = workbenches_root.into();
        fs::create_dir_all(&root).map_err(|e| {
            EngineError::new(ErrorCode::FileWriteFailed, format!("create {}: {e}", root.display()))
                .with_source(e)
        })?;
        Ok(Self { root })
    }

    fn paths_for(&self, id: &str) -> WorkbenchPaths {
        WorkbenchPaths::new(self.root.join(id))
    }

    /// Create a new, empty workbench.
    pub fn create(&self, display_name: impl Into<String>) -> Result<WorkbenchHandle, EngineError> {
        let id = Uuid::new_v4().to_string();
        let paths = self.paths_for(&id);
        fs::create_dir_all(paths.published()).map_err(|e| {
            EngineError::new(ErrorCode::FileWriteFailed, format!("create published/: {e}")).with_source(e)
        })?;
        fs::create_dir_all(paths.meta()).map_err(|e| {
            EngineError::new(ErrorCode::FileWriteFailed, format!("create meta/: {e}")).with_source(e)
        })?;
        fs::write(paths.conversation_jsonl(), b"").map_err(|e| {
            EngineError::new(ErrorCode::FileWriteFailed, format!("create conversation.jsonl: {e}"))
                .with_source(e)
        })?;

        let meta = WorkbenchMeta {
            id: id.clone(),
            display_name: display_name.into(),
            created_at: Utc::now(),
            parent_workbench_id: None,
        };
        write_meta(&paths, &meta)?;

        let manifest = Manifest::default();
        manifest_store::save(&paths.meta(), &manifest)?;

        tracing::info!(target: "keenbench_workbench", %id, "created workbench");
        Ok(WorkbenchHandle { paths, meta, manifest })
    }

    /// Open an existing workbench by id.
    pub fn open(&self, id: &str) -> Result<WorkbenchHandle, EngineError> {
        let paths = self.paths_for(id);
        if !paths.root().exists() {
            return Err(EngineError::new(ErrorCode::NotFound, format!("no workbench '{id}'")));
        }
        let meta = read_meta(&paths)?;
        let manifest = manifest_store::load_or_migrate(&paths.meta())?;
        Ok(WorkbenchHandle { paths, meta, manifest })
    }

    /// List every workbench under the root, skipping any entry whose
    /// metadata cannot be read (logged, not propagated, so one corrupt
    /// directory does not break the whole listing).
    #[must_use]
    pub fn list(&self) -> Vec<WorkbenchSummary> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut summaries = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let paths = WorkbenchPaths::new(entry.path());
            let Ok(meta) = read_meta(&paths) else {
                tracing::warn!(
                    target: "keenbench_workbench",
                    path = %entry.path().display(),
                    "skipping unreadable workbench metadata"
                );
                continue;
            };
            let manifest = manifest_store::load_or_migrate(&paths.meta()).unwrap_or_default();
            summaries.push(WorkbenchSummary {
                id: meta.id,
                display_name: meta.display_name,
                created_at: meta.created_at,
                file_count: manifest.len(),
            });
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        summaries
    }

    /// Delete a workbench. The caller must confirm no Draft exists first
    /// (`spec.md` §4.5 "Delete: refuses if Draft exists"); this crate has
    /// no visibility into `meta/draft.json` ownership, which belongs to
    /// `keenbench-draft`.
    pub fn delete(&self, id: &str, draft_exists: bool) -> Result<(), EngineError> {
        if draft_exists {
            return Err(EngineError::new(
                ErrorCode::ConflictDraftExists,
                format!("workbench '{id}' has an active Draft"),
            ));
        }
        let paths = self.paths_for(id);
        if !paths.root().exists() {
            return Err(EngineError::new(ErrorCode::NotFound, format!("no workbench '{id}'")));
        }
        fs::remove_dir_all(paths.root()).map_err(|e| {
            EngineError::new(ErrorCode::FileWriteFailed, format!("delete {}: {e}", paths.root().display()))
                .with_source(e)
        })?;
        tracing::info!(target: "keenbench_workbench", %id, "deleted workbench");
        Ok(())
    }

    /// Fork `source_id` into a new workbench per `mode`. The caller must
    /// confirm no Draft exists on the source first, per the same gating
    /// rule as [`WorkbenchManager::delete`].
    pub fn fork(
        &self,
        source_id: &str,
        mode: ForkMode,
        new_display_name: impl Into<String>,
        source_draft_exists: bool,
    ) -> Result<WorkbenchHandle, EngineError> {
        if source_draft_exists {
            return Err(EngineError::new(
                ErrorCode::ConflictDraftExists,
                format!("workbench '{source_id}' has an active Draft"),
            ));
        }
        let source = self.open(source_id)?;

        let new_id = Uuid::new_v4().to_string();
        let dest_paths = self.paths_for(&new_id);
        fs::create_dir_all(dest_paths.meta()).map_err(|e| {
            EngineError::new(ErrorCode::FileWriteFailed, format!("create meta/: {e}")).with_source(e)
        })?;
        copy_dir_flat(&source.paths.published(), &dest_paths.published())?;

        let conversation = match mode {
            ForkMode::CloneAll => fs::read(source.paths.conversation_jsonl()).unwrap_or_default(),
            ForkMode::CloneFilesOnly => Vec::new(),
        };
        fs::write(dest_paths.conversation_jsonl(), conversation).map_err(|e| {
            EngineError::new(ErrorCode::FileWriteFailed, format!("write conversation.jsonl: {e}"))
                .with_source(e)
        })?;

        let meta = WorkbenchMeta {
            id: new_id.clone(),
            display_name: new_display_name.into(),
            created_at: Utc::now(),
            parent_workbench_id: Some(source_id.to_string()),
        };
        write_meta(&dest_paths, &meta)?;
        manifest_store::save(&dest_paths.meta(), &source.manifest)?;

        tracing::info!(
            target: "keenbench_workbench",
            %source_id,
            new_id = %new_id,
            ?mode,
            "forked workbench"
        );
        Ok(WorkbenchHandle {
            paths: dest_paths,
            meta,
            manifest: source.manifest,
        })
    }
}

impl std::fmt::Debug for ForkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CloneFilesOnly => "clone_files_only",
            Self::CloneAll => "clone_all",
        };
        f.write_str(s)
    }
}

fn read_meta(paths: &WorkbenchPaths) -> Result<WorkbenchMeta, EngineError> {
    let bytes = fs::read(paths.workbench_json()).map_err(|e| {
        EngineError::new(ErrorCode::FileReadFailed, format!("read workbench.json: {e}")).with_source(e)
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|e| EngineError::new(ErrorCode::InvariantViolation, format!("malformed workbench.json: {e}")))
}

fn write_meta(paths: &WorkbenchPaths, meta: &WorkbenchMeta) -> Result<(), EngineError> {
    let bytes = serde_json::to_vec_pretty(meta)
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("serialize workbench.json: {e}")))?;
    let tmp = paths.meta().join("workbench.json.tmp");
    fs::write(&tmp, &bytes).map_err(|e| {
        EngineError::new(ErrorCode::FileWriteFailed, format!("write {}: {e}", tmp.display())).with_source(e)
    })?;
    fs::rename(&tmp, paths.workbench_json()).map_err(|e| {
        EngineError::new(ErrorCode::FileWriteFailed, format!("rename workbench.json: {e}")).with_source(e)
    })
}

fn copy_dir_flat(src: &std::path::Path, dest: &std::path::Path) -> Result<(), EngineError> {
    fs::create_dir_all(dest).map_err(|e| {
        EngineError::new(ErrorCode::FileWriteFailed, format!("create {}: {e}", dest.display())).with_source(e)
    })?;
    if !src.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(src).map_err(|e| {
        EngineError::new(ErrorCode::FileReadFailed, format!("read {}: {e}", src.display())).with_source(e)
    })? {
        let entry = entry.map_err(|e| {
            EngineError::new(ErrorCode::FileReadFailed, format!("walk {}: {e}", src.display())).with_source(e)
        })?;
        if entry.path().is_file() {
            let dest_path = dest.join(entry.file_name());
            fs::copy(entry.path(), &dest_path).map_err(|e| {
                EngineError::new(ErrorCode::FileWriteFailed, format!("copy {}: {e}", entry.path().display()))
                    .with_source(e)
            })?;
        }
    }
    Ok(())
}
