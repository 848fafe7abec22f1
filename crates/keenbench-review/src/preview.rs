//! Preview RPCs (`spec.md` §4.10: "Preview RPCs return base64 bytes; UI
//! never opens workbench files directly").

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use keenbench_error::EngineError;

use crate::extractor::{ContentExtractor, ContentRoot};
use crate::types::PreviewImage;

/// Render `relative_path` (PDF page, DOCX/ODT page, PPTX slide, or XLSX
/// grid) and base64-encode the result.
pub async fn get_preview(
    extractor: &dyn ContentExtractor,
    root: ContentRoot,
    relative_path: &str,
    page_or_slide: u64,
    scale: f64,
) -> Result<PreviewImage, EngineError> {
    let rendered = extractor.render_preview(root, relative_path, page_or_slide, scale).await?;
    Ok(PreviewImage {
        data_base64: BASE64.encode(rendered.bytes),
        mime_type: "image/png".to_string(),
        scaled_down: rendered.scaled_down,
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

        async fn extract_docx_sections(&self, _root: ContentRoot, _relative_path: &str) -> Result<Vec<String>, EngineError> {
            Ok(vec![])
        }

        async fn extract_pptx_slides(&self, _root: ContentRoot, _relative_path: &str) -> Result<Vec<String>, EngineError> {
            Ok(vec![])
        }

        async fn render_preview(&self, _root: ContentRoot, _relative_path: &str, _page_or_slide: u64, scale: f64) -> Result<crate::extractor::RenderedPreview, EngineError> {
            Ok(crate::extractor::RenderedPreview { bytes: vec![0x89, b'P', b'N', b'G'], scaled_down: scale > 2.0 })
        }
    }

    #[tokio::test]
    async fn encodes_rendered_bytes_as_base64() {
        let preview = get_preview(&StubExtractor, ContentRoot::Draft, "report.xlsx", 1, 1.0).await.unwrap();
        assert_eq!(preview.mime_type, "image/png");
        assert_eq!(BASE64.decode(preview.data_base64).unwrap(), vec![0x89, b'P', b'N', b'G']);
        assert!(!preview.scaled_down);
    }

    #[tokio::test]
    async fn surfaces_scaled_down_flag() {
        let preview = get_preview(&StubExtractor, ContentRoot::Draft, "report.xlsx", 1, 3.0).await.unwrap();
        assert!(preview.scaled_down);
    }
}
