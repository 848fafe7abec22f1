//! Wire-shaped types for the Review surface (`spec.md` §4.10).

use keenbench_core::manifest::FileKind;
use serde::{Deserialize, Serialize};

/// How a path in the change set relates to `published/`.
///
/// Deletions never appear here: a published path missing from `draft/` is
/// an `INVARIANT_VIOLATION` in the current milestone, not a change-set
/// entry (`spec.md` §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Present in `draft/` but not in `published/`.
    Added,
    /// Present in both; treated as modified without a content comparison
    /// (the comparison itself happens in `ReviewGetTextDiff`/content-diff
    /// calls, not in change-set enumeration).
    Modified,
}

/// Which preview widget the UI should use for a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewKind {
    /// Line-based or structured content diff.
    Diff,
    /// Rendered page/slide image.
    Image,
    /// Rendered spreadsheet grid.
    Grid,
    /// No previewable representation (opaque binary).
    None,
}

/// Choose the preview widget for a file kind (`spec.md` §4.10).
#[must_use]
pub fn preview_kind_for(file_kind: FileKind) -> PreviewKind {
    match file_kind {
        FileKind::Text | FileKind::Docx | FileKind::Odt | FileKind::Pptx => PreviewKind::Diff,
        FileKind::Xlsx => PreviewKind::Grid,
        FileKind::Pdf | FileKind::Image => PreviewKind::Image,
        FileKind::Binary => PreviewKind::None,
    }
}

/// A single changed path in a workbench's change set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeItem {
    /// Flat filename.
    pub path: String,
    /// Added vs. modified.
    pub change_type: ChangeType,
    /// File kind derived from extension.
    pub file_kind: FileKind,
    /// Which preview widget applies.
    pub preview_kind: PreviewKind,
    /// MIME type.
    pub mime_type: String,
    /// Whether the file is imported but never parsed for content.
    pub is_opaque: bool,
    /// Where in the file the most recent edit landed, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_hint: Option<keenbench_workshop::FocusHint>,
    /// A short human-readable description of the change, if one was
    /// recorded under `meta/review/<draft_id>/summaries/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// The full response to `ReviewGetChangeSet`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Changed items, sorted by path.
    pub items: Vec<ChangeItem>,
}

/// Where a content-diff's reference side actually came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    /// The snapshot taken when the Draft was created.
    DraftStartSnapshot,
    /// No baseline snapshot existed; the current `published/` file was used
    /// instead (`spec.md` §4.10: "serves `published_current_fallback` with
    /// a warning").
    PublishedCurrentFallback,
    /// Neither a baseline snapshot nor a published file exists (the path
    /// was added in this Draft).
    None,
}

/// A line-based text diff (`ReviewGetTextDiff`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextDiff {
    /// Unified-style diff lines, each prefixed with ` `, `+`, or `-`.
    pub lines: Vec<DiffLine>,
    /// `true` when the diff exceeded the size cap and was truncated.
    pub too_large: bool,
    /// Where the reference (pre-change) side came from.
    pub reference_source: ReferenceSource,
}

/// A single line of a unified-style text diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffLine {
    /// `"equal"`, `"insert"`, or `"delete"`.
    pub tag: String,
    /// The line's text, without a trailing newline.
    pub text: String,
}

/// A structured content diff for DOCX (`ReviewGetDocxContentDiff`) or PPTX
/// (`ReviewGetPptxContentDiff`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDiff {
    /// Reference-side sections/slides, empty if `baseline_missing`.
    pub baseline: Vec<String>,
    /// Current draft-side sections/slides.
    pub draft: Vec<String>,
    /// Number of sections (DOCX) or slides (PPTX) on the draft side.
    pub unit_count: usize,
    /// `true` when no reference content could be produced at all.
    pub baseline_missing: bool,
    /// Where the reference side came from.
    pub reference_source: ReferenceSource,
    /// Set alongside `PublishedCurrentFallback`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_warning: Option<String>,
}

/// A base64-encoded preview image (`spec.md` §4.10: "Preview RPCs return
/// base64 bytes; UI never opens workbench files directly").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewImage {
    /// Base64-encoded PNG bytes.
    pub data_base64: String,
    /// MIME type of the decoded bytes (always `image/png`).
    pub mime_type: String,
    /// `true` when the requested scale was clamped down to stay within the
    /// max image size (`spec.md` §8: "Scale 3.0 in any render RPC is
    /// clamped to 2.0 and returns `scaled_down=true`").
    pub scaled_down: bool,
}
