//! Per-workbench directory layout (`spec.md` §3 "Per-workbench layout").

use std::path::{Path, PathBuf};

/// Resolves the fixed set of paths under a single `workbenches/<wb>/` tree.
///
/// Holds only the root path; nothing here touches the filesystem.
#[derive(Debug, Clone)]
pub struct WorkbenchPaths {
    root: PathBuf,
}

impl WorkbenchPaths {
    /// Build the path set for the workbench directory at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The workbench's own root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `published/` — authoritative files, flat namespace.
    #[must_use]
    pub fn published(&self) -> PathBuf {
        self.root.join("published")
    }

    /// `draft/` — present iff a Draft exists.
    #[must_use]
    pub fn draft(&self) -> PathBuf {
        self.root.join("draft")
    }

    /// `draft.<pid>.staging/` — transient, during proposal apply.
    #[must_use]
    pub fn draft_staging(&self, pid: u32) -> PathBuf {
        self.root.join(format!("draft.{pid}.staging"))
    }

    /// `draft.prev/` — transient, during publish swap.
    #[must_use]
    pub fn draft_prev(&self) -> PathBuf {
        self.root.join("draft.prev")
    }

    /// `published.prev/` — transient, during publish swap.
    #[must_use]
    pub fn published_prev(&self) -> PathBuf {
        self.root.join("published.prev")
    }

    /// `meta/`.
    #[must_use]
    pub fn meta(&self) -> PathBuf {
        self.root.join("meta")
    }

    /// `meta/workbench.json`.
    #[must_use]
    pub fn workbench_json(&self) -> PathBuf {
        self.meta().join("workbench.json")
    }

    /// `meta/files.json`.
    #[must_use]
    pub fn files_json(&self) -> PathBuf {
        self.meta().join("files.json")
    }

    /// `meta/conversation.jsonl`.
    #[must_use]
    pub fn conversation_jsonl(&self) -> PathBuf {
        self.meta().join("conversation.jsonl")
    }

    /// `meta/workshop_state.json`.
    #[must_use]
    pub fn workshop_state_json(&self) -> PathBuf {
        self.meta().join("workshop_state.json")
    }

    /// `meta/draft.json` — present iff a Draft exists.
    #[must_use]
    pub fn draft_json(&self) -> PathBuf {
        self.meta().join("draft.json")
    }

    /// `meta/egress_consent.json`.
    #[must_use]
    pub fn egress_consent_json(&self) -> PathBuf {
        self.meta().join("egress_consent.json")
    }

    /// `meta/checkpoints/`.
    #[must_use]
    pub fn checkpoints_dir(&self) -> PathBuf {
        self.meta().join("checkpoints")
    }

    /// `meta/checkpoints/<cid>/`.
    #[must_use]
    pub fn checkpoint_dir(&self, checkpoint_id: &str) -> PathBuf {
        self.checkpoints_dir().join(checkpoint_id)
    }

    /// `meta/review/<draft_id>/`.
    #[must_use]
    pub fn review_dir(&self, draft_id: &str) -> PathBuf {
        self.meta().join("review").join(draft_id)
    }

    /// `meta/review/<draft_id>/baseline/`.
    #[must_use]
    pub fn baseline_dir(&self, draft_id: &str) -> PathBuf {
        self.review_dir(draft_id).join("baseline")
    }

    /// `meta/review/<draft_id>/summaries/`.
    #[must_use]
    pub fn summaries_dir(&self, draft_id: &str) -> PathBuf {
        self.review_dir(draft_id).join("summaries")
    }

    /// `meta/review/<draft_id>/focus/`.
    #[must_use]
    pub fn focus_dir(&self, draft_id: &str) -> PathBuf {
        self.review_dir(draft_id).join("focus")
    }

    /// `meta/context/<category>/`.
    #[must_use]
    pub fn context_dir(&self, category: &str) -> PathBuf {
        self.meta().join("context").join(category)
    }

    /// `meta/workshop/_rpi/`.
    #[must_use]
    pub fn workshop_rpi_dir(&self) -> PathBuf {
        self.meta().join("workshop").join("_rpi")
    }
}
