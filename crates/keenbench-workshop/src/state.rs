//! Persistence and reset of `meta/workshop/_rpi/` (`spec.md` §4.9
//! "RPI state reset").

use keenbench_error::{EngineError, ErrorCode};
use keenbench_workbench::WorkbenchPaths;

const RESEARCH_FILE: &str = "research.md";
const PLAN_FILE: &str = "plan.md";

/// Clear all RPI scratch state.
///
/// Triggered on a new user message, a regenerate, an `undoToMessage`, or
/// the start of the next cycle after a full cycle completes (`spec.md`
/// §4.9).
pub async fn reset(paths: &WorkbenchPaths) -> Result<(), EngineError> {
    let dir = paths.workshop_rpi_dir();
    match tokio::fs::remove_dir_all(&dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(EngineError::new(ErrorCode::FileWriteFailed, format!("clearing rpi state failed: {e}"))),
    }
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("recreating rpi state dir failed: {e}")))?;
    Ok(())
}

/// Persist the Research phase's final text to `research.md`.
pub async fn write_research(paths: &WorkbenchPaths, text: &str) -> Result<(), EngineError> {
    write_scratch_file(paths, RESEARCH_FILE, text).await
}

/// Read a previously-persisted `research.md`, if any.
pub async fn read_research(paths: &WorkbenchPaths) -> Result<Option<String>, EngineError> {
    read_scratch_file(paths, RESEARCH_FILE).await
}

/// Persist the current `plan.md` rendering.
pub async fn write_plan(paths: &WorkbenchPaths, markdown: &str) -> Result<(), EngineError> {
    write_scratch_file(paths, PLAN_FILE, markdown).await
}

/// Read the current `plan.md`, if any.
pub async fn read_plan(paths: &WorkbenchPaths) -> Result<Option<String>, EngineError> {
    read_scratch_file(paths, PLAN_FILE).await
}

async fn write_scratch_file(paths: &WorkbenchPaths, name: &str, content: &str) -> Result<(), EngineError> {
    let dir = paths.workshop_rpi_dir();
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("creating rpi state dir failed: {e}")))?;
    tokio::fs::write(dir.join(name), content)
        .await
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("writing {name} failed: {e}")))
}

async fn read_scratch_file(paths: &WorkbenchPaths, name: &str) -> Result<Option<String>, EngineError> {
    match tokio::fs::read_to_string(paths.workshop_rpi_dir().join(name)).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EngineError::new(ErrorCode::FileReadFailed, format!("reading {name} failed: {e}"))),
    }
}
