//! `ReviewGetTextDiff` (`spec.md` §4.10): a line-based diff over normalized
//! extracted text, with a size cap and baseline-fallback semantics shared
//! with the structured content diffs.

use similar::{ChangeTag, TextDiff as SimilarTextDiff};

use keenbench_error::EngineError;
use keenbench_workbench::WorkbenchPaths;

use crate::extractor::{ContentExtractor, ContentRoot};
use crate::reference::{resolve_reference, Reference};
use crate::types::{DiffLine, ReferenceSource, TextDiff};

/// Diffs beyond this many lines are reported with `too_large = true` and an
/// empty line list — the UI falls back to a size-only summary. `spec.md`
/// names a "diff size cap" without a concrete number; this implementation
/// picks 5,000 lines as a generous bound for office-document text extracts.
pub const MAX_DIFF_LINES: usize = 5_000;

/// Compute a line-based diff between `reference` (the pre-change text) and
/// `current` (the live Draft text).
#[must_use]
pub fn diff_text(reference: &str, current: &str, reference_source: ReferenceSource) -> TextDiff {
    let diff = SimilarTextDiff::from_lines(reference, current);

    let changes: Vec<_> = diff.iter_all_changes().collect();
    if changes.len() > MAX_DIFF_LINES {
        return TextDiff { lines: Vec::new(), too_large: true, reference_source };
    }

    let lines = changes
        .into_iter()
        .map(|change| DiffLine {
            tag: match change.tag() {
                ChangeTag::Equal => "equal",
                ChangeTag::Delete => "delete",
                ChangeTag::Insert => "insert",
            }
            .to_string(),
            text: change.value().trim_end_matches('\n').to_string(),
        })
        .collect();

    TextDiff { lines, too_large: false, reference_source }
}

/// `ReviewGetTextDiff`: extract the Draft-side text live, resolve the
/// reference side (baseline snapshot, falling back to `published/`, or
/// empty for a newly added file), and diff the two.
pub async fn get_text_diff(
    paths: &WorkbenchPaths,
    extractor: &dyn ContentExtractor,
    draft_id: &str,
    relative_path: &str,
) -> Result<TextDiff, EngineError> {
    let current = extractor.extract_text(ContentRoot::Draft, relative_path).await?;

    let (reference, reference_source) = match resolve_reference(paths, draft_id, relative_path) {
        Reference::Snapshot => (extractor.extract_text(ContentRoot::Baseline, relative_path).await?, ReferenceSource::DraftStartSnapshot),
        Reference::PublishedFallback => {
            (extractor.extract_text(ContentRoot::Published, relative_path).await?, ReferenceSource::PublishedCurrentFallback)
        }
        Reference::None => (String::new(), ReferenceSource::None),
    };

    Ok(diff_text(&reference, &current, reference_source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubExtractor;

    #[async_trait]
    impl ContentExtractor for StubExtractor {
        async fn extract_text(&self, root: ContentRoot, _relative_path: &str) -> Result<String, EngineError> {
            Ok(match root {
                ContentRoot::Draft => "a\nb\nc\n".to_string(),
                ContentRoot::Baseline => "a\nb\n".to_string(),
                ContentRoot::Published => "published\n".to_string(),
            })
        }

        async fn extract_docx_sections(&self, _root: ContentRoot, _relative_path: &str) -> Result<Vec<String>, EngineError> {
            Ok(vec![])
        }

        async fn extract_pptx_slides(&self, _root: ContentRoot, _relative_path: &str) -> Result<Vec<String>, EngineError> {
            Ok(vec![])
        }

        async fn render_preview(&self, _root: ContentRoot, _relative_path: &str, _page_or_slide: u64, _scale: f64) -> Result<crate::extractor::RenderedPreview, EngineError> {
            Ok(crate::extractor::RenderedPreview { bytes: vec![], scaled_down: false })
        }
    }

    #[tokio::test]
    async fn get_text_diff_uses_baseline_snapshot_when_present() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        std::fs::create_dir_all(paths.baseline_dir("draft-1")).unwrap();
        std::fs::write(paths.baseline_dir("draft-1").join("notes.txt"), b"x").unwrap();

        let diff = get_text_diff(&paths, &StubExtractor, "draft-1", "notes.txt").await.unwrap();
        assert_eq!(diff.reference_source, ReferenceSource::DraftStartSnapshot);
        assert!(diff.lines.iter().any(|l| l.tag == "insert" && l.text == "c"));
    }

    #[tokio::test]
    async fn get_text_diff_new_file_diffs_against_empty_reference() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());

        let diff = get_text_diff(&paths, &StubExtractor, "draft-1", "notes.txt").await.unwrap();
        assert_eq!(diff.reference_source, ReferenceSource::None);
        assert!(diff.lines.iter().all(|l| l.tag == "insert"));
    }

    #[test]
    fn identical_text_produces_only_equal_lines() {
        let diff = diff_text("a\nb\n", "a\nb\n", ReferenceSource::DraftStartSnapshot);
        assert!(!diff.too_large);
        assert!(diff.lines.iter().all(|l| l.tag == "equal"));
    }

    #[test]
    fn inserted_line_is_tagged_insert() {
        let diff = diff_text("a\nb\n", "a\nb\nc\n", ReferenceSource::DraftStartSnapshot);
        assert!(diff.lines.iter().any(|l| l.tag == "insert" && l.text == "c"));
    }

    #[test]
    fn removed_line_is_tagged_delete() {
        let diff = diff_text("a\nb\nc\n", "a\nc\n", ReferenceSource::DraftStartSnapshot);
        assert!(diff.lines.iter().any(|l| l.tag == "delete" && l.text == "b"));
    }

    #[test]
    fn oversized_diff_is_flagged_too_large() {
        let reference = "line\n".repeat(MAX_DIFF_LINES + 10);
        let current = "other\n".repeat(MAX_DIFF_LINES + 10);
        let diff = diff_text(&reference, &current, ReferenceSource::PublishedCurrentFallback);
        assert!(diff.too_large);
        assert!(diff.lines.is_empty());
    }
}
