//! Workbench file manifest and deterministic scope hashing.
//!
//! The manifest is the invariant at the center of the data model
//! (`spec.md` §3, §8): it must always equal exactly the set of regular
//! files in `published/`, and its sorted path list is the input to the
//! consent [`scope_hash`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::sha256_hex;

/// The kind of file a manifest entry represents, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Plain text (`.txt`, `.md`, `.csv`, …).
    Text,
    /// Word-processing document.
    Docx,
    /// OpenDocument text.
    Odt,
    /// Spreadsheet.
    Xlsx,
    /// Presentation.
    Pptx,
    /// PDF (read-only; never an edit target).
    Pdf,
    /// Raster image (read-only; never an edit target).
    Image,
    /// Anything outside the supported set — imported but never parsed.
    Binary,
}

impl FileKind {
    /// Classify a file extension (case-insensitive, without the leading dot).
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "md" | "csv" | "json" | "yaml" | "yml" | "log" => Self::Text,
            "docx" => Self::Docx,
            "odt" => Self::Odt,
            "xlsx" => Self::Xlsx,
            "pptx" => Self::Pptx,
            "pdf" => Self::Pdf,
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" => Self::Image,
            _ => Self::Binary,
        }
    }

    /// Whether files of this kind are accepted but never parsed for content
    /// (`spec.md` §3 "Opaque files").
    #[must_use]
    pub fn is_opaque(self) -> bool {
        matches!(self, Self::Binary)
    }

    /// Whether this kind may ever be an edit target (PDF and images are
    /// read-only per `spec.md` §1 Non-goals).
    #[must_use]
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Docx | Self::Xlsx | Self::Pptx | Self::Text)
    }
}

/// Best-effort MIME type lookup with a safe fallback, used during manifest
/// v1→v2 migration (`spec.md` §4.5).
#[must_use]
pub fn mime_type_for_extension(ext: &str) -> String {
    match ext.to_ascii_lowercase().as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "odt" => "application/vnd.oasis.opendocument.text",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// A single entry in a workbench's file manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ManifestEntry {
    /// Flat filename (no subdirectories; `spec.md` §3 Workbench invariant).
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub mime_type: String,
    /// File kind derived from extension.
    pub file_kind: FileKind,
    /// Whether the file is imported but never parsed for content.
    pub is_opaque: bool,
}

impl ManifestEntry {
    /// Build an entry by classifying `path`'s extension.
    #[must_use]
    pub fn from_path(path: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        let ext = path.rsplit('.').next().unwrap_or("");
        let file_kind = FileKind::from_extension(ext);
        Self {
            mime_type: mime_type_for_extension(ext),
            is_opaque: file_kind.is_opaque(),
            file_kind,
            path,
            size,
        }
    }
}

/// The full manifest (`files.json`) for a workbench.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Manifest {
    /// Entries, always kept in path-sorted order for determinism.
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest from entries, sorting by path for determinism.
    #[must_use]
    pub fn new(mut entries: Vec<ManifestEntry>) -> Self {
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Self { entries }
    }

    /// Sorted list of manifest paths — the exact input to [`scope_hash`].
    #[must_use]
    pub fn sorted_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.entries.iter().map(|e| e.path.as_str()).collect();
        paths.sort_unstable();
        paths
    }

    /// Look up an entry by path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deterministic scope hash over the sorted manifest paths
    /// (`spec.md` §3 "Scope hash", §8).
    ///
    /// Size, mtime, and content never influence the hash — only the *set*
    /// of paths does, so touching a file's bytes without adding/removing it
    /// does not invalidate consent.
    #[must_use]
    pub fn scope_hash(&self) -> String {
        scope_hash(self.sorted_paths().into_iter())
    }
}

/// Compute the scope hash for an arbitrary iterator of paths.
///
/// Paths are sorted and newline-joined before hashing, so callers do not
/// need to pre-sort; see `scope_hash` scenario 2 in `spec.md` §8.
#[must_use]
pub fn scope_hash<'a>(paths: impl Iterator<Item = &'a str>) -> String {
    let mut sorted: Vec<&str> = paths.collect();
    sorted.sort_unstable();
    let joined = sorted.join("\n");
    sha256_hex(joined.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions() {
        assert_eq!(FileKind::from_extension("docx"), FileKind::Docx);
        assert_eq!(FileKind::from_extension("XLSX"), FileKind::Xlsx);
        assert_eq!(FileKind::from_extension("pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_extension("exe"), FileKind::Binary);
    }

    #[test]
    fn binary_is_opaque_others_are_not() {
        assert!(FileKind::Binary.is_opaque());
        assert!(!FileKind::Text.is_opaque());
        assert!(!FileKind::Pdf.is_opaque());
    }

    #[test]
    fn pdf_and_image_are_never_editable() {
        assert!(!FileKind::Pdf.is_editable());
        assert!(!FileKind::Image.is_editable());
        assert!(FileKind::Docx.is_editable());
        assert!(FileKind::Xlsx.is_editable());
    }

    #[test]
    fn manifest_entry_from_path_derives_kind_and_mime() {
        let entry = ManifestEntry::from_path("notes.txt", 42);
        assert_eq!(entry.file_kind, FileKind::Text);
        assert_eq!(entry.mime_type, "text/plain");
        assert!(!entry.is_opaque);
    }

    #[test]
    fn manifest_sorts_entries_by_path() {
        let m = Manifest::new(vec![
            ManifestEntry::from_path("b.txt", 1),
            ManifestEntry::from_path("a.txt", 2),
        ]);
        assert_eq!(m.entries[0].path, "a.txt");
        assert_eq!(m.entries[1].path, "b.txt");
    }

    #[test]
    fn scope_hash_is_order_independent() {
        let a = scope_hash(["notes.txt", "data.csv"].into_iter());
        let b = scope_hash(["data.csv", "notes.txt"].into_iter());
        assert_eq!(a, b);
    }

    #[test]
    fn scope_hash_changes_when_path_set_changes() {
        let a = scope_hash(["notes.txt"].into_iter());
        let b = scope_hash(["notes.txt", "data.csv"].into_iter());
        assert_ne!(a, b);
    }

    #[test]
    fn manifest_scope_hash_matches_free_function() {
        let m = Manifest::new(vec![
            ManifestEntry::from_path("notes.txt", 1),
            ManifestEntry::from_path("data.csv", 2),
        ]);
        let expected = scope_hash(["data.csv", "notes.txt"].into_iter());
        assert_eq!(m.scope_hash(), expected);
    }

    #[test]
    fn scope_hash_matches_literal_e2e_scenario() {
        // spec.md §8 scenario 2: hash(["data.csv","notes.txt"]).
        let h1 = scope_hash(["data.csv", "notes.txt"].into_iter());
        let h2 = scope_hash(["notes.txt", "data.csv"].into_iter());
        assert_eq!(h1, h2);
    }
}
