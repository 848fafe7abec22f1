//! Focus-hint derivation from successful structured-file tool calls
//! (`spec.md` §4.9 "Focus hints").
//!
//! Hints are written under `meta/review/<draft_id>/focus/<path>.json` so
//! the Review surface (C10) can jump the viewer straight to the edited
//! region; last write wins per path.

use std::path::Path;

use keenbench_error::{EngineError, ErrorCode};
use keenbench_workbench::WorkbenchPaths;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A hint at where in a file a tool call landed its edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FocusHint {
    /// A spreadsheet region.
    Xlsx {
        /// Sheet name.
        sheet: String,
        /// First affected row, if known.
        #[serde(skip_serializing_if = "Option::is_none")]
        row_start: Option<u32>,
        /// First affected column, if known.
        #[serde(skip_serializing_if = "Option::is_none")]
        col_start: Option<u32>,
    },
    /// A document section.
    Docx {
        /// Index of the affected section.
        section_index: u32,
    },
    /// A presentation slide.
    Pptx {
        /// Index of the affected slide.
        slide_index: u32,
    },
}

/// Derive a focus hint from a successful `xlsx_operations` call
/// (`spec.md` §4.9: "covering `set_cells`/`set_range`/`summarize_by_category`/`ensure_sheet`").
///
/// `last_sheet_index` is the sheet count after the apply, used when the
/// tool added a new sheet without an explicit target.
#[must_use]
pub fn from_xlsx_operations(arguments: &Value) -> Option<FocusHint> {
    let sheet = arguments.get("sheet").and_then(Value::as_str)?.to_string();
    let row_start = arguments
        .get("range")
        .and_then(Value::as_str)
        .and_then(parse_row_start)
        .or_else(|| arguments.get("row_start").and_then(Value::as_u64).map(|v| v as u32));
    let col_start = arguments.get("col_start").and_then(Value::as_u64).map(|v| v as u32);
    Some(FocusHint::Xlsx { sheet, row_start, col_start })
}

/// Derive a focus hint from a successful `docx_operations` call.
#[must_use]
pub fn from_docx_operations(arguments: &Value) -> Option<FocusHint> {
    let section_index = arguments.get("section_index").and_then(Value::as_u64)?;
    Some(FocusHint::Docx { section_index: section_index as u32 })
}

/// Derive a focus hint from a successful `pptx_operations` call.
///
/// For `add_slide` without an explicit index, pass `fallback_slide_index`
/// (the last slide index after the apply, from `PptxGetMap`).
#[must_use]
pub fn from_pptx_operations(arguments: &Value, fallback_slide_index: Option<u32>) -> Option<FocusHint> {
    let slide_index = arguments
        .get("slide_index")
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .or(fallback_slide_index)?;
    Some(FocusHint::Pptx { slide_index })
}

fn parse_row_start(range: &str) -> Option<u32> {
    // A1-style range like "A5:D20" or a bare cell like "B3"; take the
    // leading cell's numeric row component.
    let first_cell = range.split(':').next()?;
    let digits: String = first_cell.chars().skip_while(|c| c.is_ascii_alphabetic()).collect();
    digits.parse().ok()
}

/// Persist `hint` for `relative_path` under the Draft's focus directory,
/// overwriting any previous hint for the same path.
pub async fn write_focus_hint(
    paths: &WorkbenchPaths,
    draft_id: &str,
    relative_path: &str,
    hint: &FocusHint,
) -> Result<(), EngineError> {
    let dir = paths.focus_dir(draft_id);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("creating focus dir failed: {e}")))?;

    let file = focus_file_path(&dir, relative_path);
    let body = serde_json::to_vec_pretty(hint)
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("serializing focus hint failed: {e}")))?;
    tokio::fs::write(&file, body)
        .await
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("writing focus hint failed: {e}")))?;
    Ok(())
}

fn focus_file_path(dir: &Path, relative_path: &str) -> std::path::PathBuf {
    dir.join(format!("{relative_path}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn xlsx_set_cells_derives_sheet_and_row() {
        let hint = from_xlsx_operations(&json!({"sheet": "Summary", "range": "B5:D5"})).unwrap();
        assert_eq!(hint, FocusHint::Xlsx { sheet: "Summary".into(), row_start: Some(5), col_start: None });
    }

    #[test]
    fn xlsx_ensure_sheet_with_no_range_has_no_row() {
        let hint = from_xlsx_operations(&json!({"sheet": "New Sheet"})).unwrap();
        assert_eq!(hint, FocusHint::Xlsx { sheet: "New Sheet".into(), row_start: None, col_start: None });
    }

    #[test]
    fn docx_operations_derives_section_index() {
        let hint = from_docx_operations(&json!({"section_index": 3})).unwrap();
        assert_eq!(hint, FocusHint::Docx { section_index: 3 });
    }

    #[test]
    fn pptx_add_slide_falls_back_to_last_slide_index() {
        let hint = from_pptx_operations(&json!({"op": "add_slide"}), Some(7)).unwrap();
        assert_eq!(hint, FocusHint::Pptx { slide_index: 7 });
    }

    #[test]
    fn pptx_explicit_slide_index_wins_over_fallback() {
        let hint = from_pptx_operations(&json!({"slide_index": 2}), Some(7)).unwrap();
        assert_eq!(hint, FocusHint::Pptx { slide_index: 2 });
    }

    #[tokio::test]
    async fn write_focus_hint_persists_json_under_focus_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let hint = FocusHint::Xlsx { sheet: "Summary".into(), row_start: Some(5), col_start: None };
        write_focus_hint(&paths, "draft-1", "report.xlsx", &hint).await.unwrap();
        let written = tokio::fs::read(paths.focus_dir("draft-1").join("report.xlsx.json")).await.unwrap();
        let parsed: FocusHint = serde_json::from_slice(&written).unwrap();
        assert_eq!(parsed, hint);
    }
}
