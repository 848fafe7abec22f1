//! Bridges the single tool-worker supervisor into the two trait seams that
//! need it: the Workshop agent loop's [`ToolExecutor`] and the Review
//! engine's [`ContentExtractor`]. Neither `keenbench-workshop` nor
//! `keenbench-review` depends on `keenbench-toolworker` directly; this
//! module is where that decoupling gets wired back together, the same
//! pattern the teacher uses for its `abp-transport` adapters.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use keenbench_error::{EngineError, ErrorCode};
use keenbench_review::ContentExtractor;
use keenbench_toolworker::{
    apply_ops_request, extract_text_request, get_map_request, image_get_metadata_request,
    read_file_request, render_request, ApplyOpsKind, ExtractKind, MapKind, ReadFileSelectors,
    RenderKind, ToolWorkerSupervisor, WorkerRoot,
};
use keenbench_workbench::WorkbenchPaths;
use keenbench_workshop::{ToolExecutor, ToolOutcome};
use serde_json::Value;

/// Resolves model-facing tool calls and Review content requests against a
/// single workbench's `draft/`/`published/`/staging directories.
pub struct WorkbenchToolBridge {
    supervisor: Arc<ToolWorkerSupervisor>,
    paths: WorkbenchPaths,
    /// The active Draft id, needed only to resolve `ContentRoot::Baseline`
    /// for Review calls (`keenbench_review::ContentRoot` carries no id of
    /// its own — baseline snapshots are namespaced per-draft on disk).
    draft_id: Option<String>,
}

impl WorkbenchToolBridge {
    /// Build a bridge scoped to one workbench's paths, for Workshop tool
    /// calls (which only ever touch `draft/`).
    #[must_use]
    pub fn new(supervisor: Arc<ToolWorkerSupervisor>, paths: WorkbenchPaths) -> Self {
        Self { supervisor, paths, draft_id: None }
    }

    /// Build a bridge scoped to a specific Draft, for Review calls that may
    /// need to resolve `ContentRoot::Baseline`.
    #[must_use]
    pub fn for_draft(supervisor: Arc<ToolWorkerSupervisor>, paths: WorkbenchPaths, draft_id: String) -> Self {
        Self { supervisor, paths, draft_id: Some(draft_id) }
    }

    fn draft_path(&self, relative: &str) -> PathBuf {
        self.paths.draft().join(relative)
    }

    fn map_kind_for(extension: &str) -> MapKind {
        match extension {
            "xlsx" => MapKind::Xlsx,
            "docx" => MapKind::Docx,
            "pptx" => MapKind::Pptx,
            "pdf" => MapKind::Pdf,
            _ => MapKind::Text,
        }
    }

    fn extract_kind_for(extension: &str) -> Option<ExtractKind> {
        match extension {
            "docx" => Some(ExtractKind::Docx),
            "odt" => Some(ExtractKind::Odt),
            "xlsx" => Some(ExtractKind::Xlsx),
            "pptx" => Some(ExtractKind::Pptx),
            "pdf" => Some(ExtractKind::Pdf),
            _ => None,
        }
    }

    async fn call_get_map(&self, root: WorkerRoot, path: &Path) -> Result<Value, EngineError> {
        let extension = extension_of(path);
        let (method, params) = get_map_request(Self::map_kind_for(&extension), root, path);
        self.supervisor.call_default(method, params).await
    }

    async fn call_extract_text(&self, root: WorkerRoot, path: &Path) -> Result<String, EngineError> {
        let extension = extension_of(path);
        let Some(kind) = Self::extract_kind_for(&extension) else {
            return std::fs::read_to_string(path)
                .map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("read {}: {e}", path.display())).with_source(e));
        };
        let (method, params) = extract_text_request(kind, root, path, None);
        let result = self.supervisor.call_default(method, params).await?;
        Ok(result.get("text").and_then(Value::as_str).unwrap_or_default().to_string())
    }
}

fn extension_of(path: &Path) -> String {
    path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase()
}

#[async_trait]
impl ToolExecutor for WorkbenchToolBridge {
    async fn execute(&self, tool_name: &str, arguments: &Value) -> Result<ToolOutcome, EngineError> {
        let path_arg = arguments.get("path").and_then(Value::as_str).unwrap_or_default();

        match tool_name {
            "list_files" => {
                let manifest = keenbench_workbench::manifest_store::load_or_migrate(&self.paths.meta())?;
                let names: Vec<&str> = manifest.sorted_paths();
                Ok(ToolOutcome::ok(serde_json::to_string(&names).unwrap_or_default()))
            }
            "get_file_info" => {
                let manifest = keenbench_workbench::manifest_store::load_or_migrate(&self.paths.meta())?;
                match manifest.get(path_arg) {
                    Some(entry) => Ok(ToolOutcome::ok(serde_json::to_string(entry).unwrap_or_default())),
                    None => Ok(ToolOutcome::failed(format!("no such file '{path_arg}'"))),
                }
            }
            "get_file_map" => {
                let path = self.draft_path(path_arg);
                match self.call_get_map(WorkerRoot::Draft, &path).await {
                    Ok(value) => Ok(ToolOutcome::ok(value.to_string())),
                    Err(e) => Ok(ToolOutcome::failed(e.message)),
                }
            }
            "read_file" | "table_query" => {
                let path = self.draft_path(path_arg);
                let selectors = ReadFileSelectors {
                    sheet: arguments.get("sheet").and_then(Value::as_str).map(str::to_string),
                    range: arguments.get("range").and_then(Value::as_str).map(str::to_string),
                    section: arguments.get("section").and_then(Value::as_u64),
                    slide_index: arguments.get("slide_index").and_then(Value::as_u64),
                    pages: arguments.get("pages").and_then(Value::as_array).map(|a| a.iter().filter_map(Value::as_u64).collect()),
                    line_start: arguments.get("line_start").and_then(Value::as_u64),
                    line_count: arguments.get("line_count").and_then(Value::as_u64),
                };
                let (method, params) = read_file_request(WorkerRoot::Draft, &path, &selectors);
                match self.supervisor.call_default(method, params).await {
                    Ok(value) => Ok(ToolOutcome::ok(value.to_string())),
                    Err(e) => Ok(ToolOutcome::failed(e.message)),
                }
            }
            "recall_tool_result" => {
                // v1 has no persisted tool-result cache keyed by call id; a
                // recall always misses and the model falls back to re-reading.
                Ok(ToolOutcome::failed("no cached tool result for that id".to_string()))
            }
            "xlsx_get_styles" | "docx_get_styles" | "pptx_get_styles" => {
                Ok(ToolOutcome::ok(keenbench_context::style_merge::merge_style_guidance(
                    None,
                    style_kind_for(tool_name),
                    &keenbench_context::NullContextNotifier,
                )))
            }
            "xlsx_operations" | "docx_operations" | "pptx_operations" => {
                let ops = arguments.get("operations").and_then(Value::as_array).cloned().unwrap_or_default();
                let kind = match tool_name {
                    "xlsx_operations" => ApplyOpsKind::Xlsx,
                    "docx_operations" => ApplyOpsKind::Docx,
                    _ => ApplyOpsKind::Pptx,
                };
                let path = self.draft_path(path_arg);
                let (method, params) = apply_ops_request(kind, WorkerRoot::Draft, &path, ops);
                match self.supervisor.call_default(method, params).await {
                    Ok(value) => Ok(ToolOutcome::ok(value.to_string())),
                    Err(e) => Ok(ToolOutcome::failed(e.message)),
                }
            }
            other => Ok(ToolOutcome::failed(format!("unknown tool '{other}'"))),
        }
    }
}

fn style_kind_for(tool_name: &str) -> keenbench_core::manifest::FileKind {
    match tool_name {
        "xlsx_get_styles" => keenbench_core::manifest::FileKind::Xlsx,
        "docx_get_styles" => keenbench_core::manifest::FileKind::Docx,
        _ => keenbench_core::manifest::FileKind::Pptx,
    }
}

#[async_trait]
impl ContentExtractor for WorkbenchToolBridge {
    async fn extract_text(&self, root: keenbench_review::ContentRoot, relative_path: &str) -> Result<String, EngineError> {
        let (kind, path) = self.resolve_root(root, relative_path);
        self.call_extract_text(kind, &path).await
    }

    async fn extract_docx_sections(&self, root: keenbench_review::ContentRoot, relative_path: &str) -> Result<Vec<String>, EngineError> {
        let (kind, path) = self.resolve_root(root, relative_path);
        let (method, params) = extract_text_request(ExtractKind::Docx, kind, &path, None);
        let result = self.supervisor.call_default(method, params).await?;
        Ok(result
            .get("sections")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default())
    }

    async fn extract_pptx_slides(&self, root: keenbench_review::ContentRoot, relative_path: &str) -> Result<Vec<String>, EngineError> {
        let (kind, path) = self.resolve_root(root, relative_path);
        let (method, params) = extract_text_request(ExtractKind::Pptx, kind, &path, None);
        let result = self.supervisor.call_default(method, params).await?;
        Ok(result
            .get("slides")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default())
    }

    async fn render_preview(&self, root: keenbench_review::ContentRoot, relative_path: &str, page_or_slide: u64, scale: f64) -> Result<keenbench_review::RenderedPreview, EngineError> {
        let (kind, path) = self.resolve_root(root, relative_path);
        let render_kind = match extension_of(&path).as_str() {
            "pdf" => RenderKind::PdfPage,
            "docx" => RenderKind::DocxPage,
            "odt" => RenderKind::OdtPage,
            "pptx" => RenderKind::PptxSlide,
            "xlsx" => RenderKind::XlsxGrid,
            other => return Err(EngineError::new(ErrorCode::ValidationFailed, format!("no preview renderer for '{other}'"))),
        };
        let (method, params) = render_request(render_kind, kind, &path, page_or_slide, scale);
        let result = self.supervisor.call_render(method, params).await?;
        let b64 = result.get("image_base64").and_then(Value::as_str).unwrap_or_default();
        use base64::Engine as _;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| EngineError::new(ErrorCode::ValidationFailed, format!("malformed preview image: {e}")))?;
        let scaled_down = result.get("scaled_down").and_then(Value::as_bool).unwrap_or(false);
        Ok(keenbench_review::RenderedPreview { bytes, scaled_down })
    }
}

impl WorkbenchToolBridge {
    fn resolve_root(&self, root: keenbench_review::ContentRoot, relative_path: &str) -> (WorkerRoot, PathBuf) {
        match root {
            keenbench_review::ContentRoot::Draft => (WorkerRoot::Draft, self.paths.draft().join(relative_path)),
            keenbench_review::ContentRoot::Published => (WorkerRoot::Published, self.paths.published().join(relative_path)),
            keenbench_review::ContentRoot::Baseline => {
                let draft_id = self.draft_id.as_deref().unwrap_or_default();
                // Baseline snapshots live under published-file-shaped
                // directories; the worker only cares that the path exists
                // on disk, not which logical root it nominally belongs to.
                (WorkerRoot::Published, self.paths.baseline_dir(draft_id).join(relative_path))
            }
        }
    }
}

/// Probe `ImageGetMetadata` for an arbitrary file, used by manifest
/// classification when a file's image dimensions matter for preview sizing.
pub async fn image_metadata(supervisor: &ToolWorkerSupervisor, root: WorkerRoot, path: &Path) -> Result<Value, EngineError> {
    let (method, params) = image_get_metadata_request(root, path);
    supervisor.call_default(method, params).await
}
