//! The Review/diff engine (`spec.md` §4.10, C10).
//!
//! [`changeset::get_change_set`] enumerates `published/` ∪ `draft/` into a
//! classified, preview-annotated [`types::ChangeSet`]. [`text_diff::get_text_diff`]
//! and [`content_diff::docx_content_diff`]/[`content_diff::pptx_content_diff`]
//! produce the per-file diffs the UI renders, each resolving its reference
//! side against the Draft-start baseline snapshot with a fallback to the
//! currently published file. [`preview::get_preview`] base64-encodes
//! rendered pages/slides/grids for the RPCs that never hand the UI a raw
//! workbench path.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

/// Change-set enumeration and classification.
pub mod changeset;
/// Structured DOCX/PPTX content diffs.
pub mod content_diff;
/// The tool-worker extraction/render bridge.
pub mod extractor;
/// Base64 preview rendering.
pub mod preview;
/// Shared baseline-vs-published-fallback resolution.
pub mod reference;
/// Per-file change summaries.
pub mod summaries;
/// Line-based text diffing.
pub mod text_diff;
/// Wire-shaped request/response types.
pub mod types;

pub use changeset::get_change_set;
pub use content_diff::{docx_content_diff, pptx_content_diff};
pub use extractor::{ContentExtractor, ContentRoot};
pub use preview::get_preview;
pub use text_diff::get_text_diff;
pub use types::{ChangeItem, ChangeSet, ChangeType, ContentDiff, DiffLine, PreviewImage, PreviewKind, ReferenceSource, TextDiff};
