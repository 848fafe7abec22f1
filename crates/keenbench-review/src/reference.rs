//! Shared baseline-resolution logic for `ReviewGetTextDiff` and the
//! structured content diffs (`spec.md` §4.10).

use keenbench_workbench::WorkbenchPaths;

/// Where a diff's reference (pre-change) side should come from.
pub enum Reference {
    /// The Draft-start snapshot under `meta/review/<draft_id>/baseline/`.
    Snapshot,
    /// No snapshot exists; fall back to the currently published file.
    PublishedFallback,
    /// Neither exists — the path was added within this Draft.
    None,
}

/// Decide which reference a changed path should diff against.
#[must_use]
pub fn resolve_reference(paths: &WorkbenchPaths, draft_id: &str, relative_path: &str) -> Reference {
    if paths.baseline_dir(draft_id).join(relative_path).exists() {
        Reference::Snapshot
    } else if paths.published().join(relative_path).exists() {
        Reference::PublishedFallback
    } else {
        Reference::None
    }
}
