//! Bridge from review logic to the tool-worker's text-extraction and
//! rendering surface, mirroring `keenbench_workshop::ToolExecutor`'s role:
//! this crate knows *what* to ask for, the engine binary knows *how* to
//! reach the worker.

use async_trait::async_trait;
use keenbench_error::EngineError;

/// Which physical root a path should be resolved against when asking the
/// tool worker to extract or render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRoot {
    /// `draft/<path>` — the live, currently-edited file.
    Draft,
    /// `published/<path>` — the last-published file.
    Published,
    /// `meta/review/<draft_id>/baseline/<path>` — the draft-start snapshot.
    Baseline,
}

/// Dispatches extraction/render requests to the tool worker. Implemented by
/// the engine binary; kept as a trait here so this crate never depends on
/// `keenbench-toolworker`'s process-supervision details.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Extract normalized plain text for diffing.
    async fn extract_text(&self, root: ContentRoot, relative_path: &str) -> Result<String, EngineError>;

    /// Extract a DOCX's structured content (one string per section).
    async fn extract_docx_sections(&self, root: ContentRoot, relative_path: &str) -> Result<Vec<String>, EngineError>;

    /// Extract a PPTX's structured content (one string per slide).
    async fn extract_pptx_slides(&self, root: ContentRoot, relative_path: &str) -> Result<Vec<String>, EngineError>;

    /// Render a preview page/slide/grid to raw image bytes (PNG).
    async fn render_preview(&self, root: ContentRoot, relative_path: &str, page_or_slide: u64, scale: f64) -> Result<RenderedPreview, EngineError>;
}

/// Raw output of a render request: the PNG bytes plus whether the worker
/// clamped the requested scale down to fit the max image size (`spec.md`
/// §4.4: "bounded scale 0.25-2.0; ... responses include `scaled_down`").
#[derive(Debug, Clone)]
pub struct RenderedPreview {
    /// Raw PNG bytes.
    pub bytes: Vec<u8>,
    /// `true` when the worker reduced the requested scale to stay within
    /// the max image size/dimensions.
    pub scaled_down: bool,
}
