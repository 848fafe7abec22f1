//! Per-file change summaries under `meta/review/<draft_id>/summaries/`.
//!
//! These are short, human-readable descriptions the engine binary may
//! record after an Implement item touches a file (e.g. "Added a totals
//! row summing column D"). This crate only reads them; nothing here
//! writes them, since the summary text is only known at the point the
//! Implement phase's tool call succeeds (`keenbench-workshop`'s domain).

use keenbench_workbench::WorkbenchPaths;

/// Read the recorded summary for `relative_path`, if one exists.
#[must_use]
pub fn read_summary(paths: &WorkbenchPaths, draft_id: &str, relative_path: &str) -> Option<String> {
    let file = paths.summaries_dir(draft_id).join(format!("{relative_path}.txt"));
    let text = std::fs::read_to_string(file).ok()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Persist a summary for `relative_path`, overwriting any previous one.
pub async fn write_summary(paths: &WorkbenchPaths, draft_id: &str, relative_path: &str, summary: &str) -> std::io::Result<()> {
    let dir = paths.summaries_dir(draft_id);
    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(dir.join(format!("{relative_path}.txt")), summary.as_bytes()).await
}
