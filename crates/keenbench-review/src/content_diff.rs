//! `ReviewGetDocxContentDiff` / `ReviewGetPptxContentDiff` (`spec.md`
//! §4.10): structured section/slide diffs with baseline-fallback
//! semantics.
//!
//! If the Draft-start baseline snapshot is missing but `published/` still
//! has the file, the engine serves the published copy as the reference
//! side with a warning rather than failing outright.

use keenbench_error::EngineError;
use keenbench_workbench::WorkbenchPaths;

use crate::extractor::{ContentExtractor, ContentRoot};
use crate::reference::{resolve_reference, Reference};
use crate::types::{ContentDiff, ReferenceSource};

const FALLBACK_WARNING: &str =
    "no Draft-start snapshot was found; showing the difference against the currently published file instead";

/// Build a DOCX content diff for `relative_path`.
pub async fn docx_content_diff(
    paths: &WorkbenchPaths,
    extractor: &dyn ContentExtractor,
    draft_id: &str,
    relative_path: &str,
) -> Result<ContentDiff, EngineError> {
    let draft = extractor.extract_docx_sections(ContentRoot::Draft, relative_path).await?;

    let (baseline, reference_source, reference_warning) = match resolve_reference(paths, draft_id, relative_path) {
        Reference::Snapshot => {
            let sections = extractor.extract_docx_sections(ContentRoot::Baseline, relative_path).await?;
            (sections, ReferenceSource::DraftStartSnapshot, None)
        }
        Reference::PublishedFallback => {
            let sections = extractor.extract_docx_sections(ContentRoot::Published, relative_path).await?;
            (sections, ReferenceSource::PublishedCurrentFallback, Some(FALLBACK_WARNING.to_string()))
        }
        Reference::None => (Vec::new(), ReferenceSource::None, None),
    };

    Ok(ContentDiff {
        unit_count: draft.len(),
        baseline_missing: reference_source == ReferenceSource::None,
        baseline,
        draft,
        reference_source,
        reference_warning,
    })
}

/// Build a PPTX content diff for `relative_path`.
pub async fn pptx_content_diff(
    paths: &WorkbenchPaths,
    extractor: &dyn ContentExtractor,
    draft_id: &str,
    relative_path: &str,
) -> Result<ContentDiff, EngineError> {
    let draft = extractor.extract_pptx_slides(ContentRoot::Draft, relative_path).await?;

    let (baseline, reference_source, reference_warning) = match resolve_reference(paths, draft_id, relative_path) {
        Reference::Snapshot => {
            let slides = extractor.extract_pptx_slides(ContentRoot::Baseline, relative_path).await?;
            (slides, ReferenceSource::DraftStartSnapshot, None)
        }
        Reference::PublishedFallback => {
            let slides = extractor.extract_pptx_slides(ContentRoot::Published, relative_path).await?;
            (slides, ReferenceSource::PublishedCurrentFallback, Some(FALLBACK_WARNING.to_string()))
        }
        Reference::None => (Vec::new(), ReferenceSource::None, None),
    };

    Ok(ContentDiff {
        unit_count: draft.len(),
        baseline_missing: reference_source == ReferenceSource::None,
        baseline,
        draft,
        reference_source,
        reference_warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubExtractor;

    #[async_trait]
    impl ContentExtractor for StubExtractor {
        async fn extract_text(&self, _root: ContentRoot, _relative_path: &str) -> Result<String, EngineError> {
            Ok(String::new())
        }

        async fn extract_docx_sections(&self, root: ContentRoot, _relative_path: &str) -> Result<Vec<String>, EngineError> {
            Ok(match root {
                ContentRoot::Draft => vec!["draft section".to_string()],
                ContentRoot::Baseline => vec!["baseline section".to_string()],
                ContentRoot::Published => vec!["published section".to_string()],
            })
        }

        async fn extract_pptx_slides(&self, _root: ContentRoot, _relative_path: &str) -> Result<Vec<String>, EngineError> {
            Ok(vec![])
        }

        async fn render_preview(&self, _root: ContentRoot, _relative_path: &str, _page_or_slide: u64, _scale: f64) -> Result<crate::extractor::RenderedPreview, EngineError> {
            Ok(crate::extractor::RenderedPreview { bytes: vec![], scaled_down: false })
        }
    }

    #[tokio::test]
    async fn uses_baseline_snapshot_when_present() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        std::fs::create_dir_all(paths.baseline_dir("draft-1")).unwrap();
        std::fs::write(paths.baseline_dir("draft-1").join("report.docx"), b"x").unwrap();

        let diff = docx_content_diff(&paths, &StubExtractor, "draft-1", "report.docx").await.unwrap();
        assert_eq!(diff.reference_source, ReferenceSource::DraftStartSnapshot);
        assert_eq!(diff.baseline, vec!["baseline section".to_string()]);
        assert!(!diff.baseline_missing);
        assert!(diff.reference_warning.is_none());
    }

    #[tokio::test]
    async fn falls_back_to_published_when_baseline_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        std::fs::create_dir_all(paths.published()).unwrap();
        std::fs::write(paths.published().join("report.docx"), b"x").unwrap();

        let diff = docx_content_diff(&paths, &StubExtractor, "draft-1", "report.docx").await.unwrap();
        assert_eq!(diff.reference_source, ReferenceSource::PublishedCurrentFallback);
        assert_eq!(diff.baseline, vec!["published section".to_string()]);
        assert!(diff.reference_warning.is_some());
    }

    #[tokio::test]
    async fn no_baseline_or_published_yields_none_source() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());

        let diff = docx_content_diff(&paths, &StubExtractor, "draft-1", "report.docx").await.unwrap();
        assert_eq!(diff.reference_source, ReferenceSource::None);
        assert!(diff.baseline_missing);
        assert!(diff.baseline.is_empty());
    }
}
