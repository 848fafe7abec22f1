//! Wire shape for the tool-worker's stdio JSON-RPC contract (`spec.md` §4.4).
//!
//! Unlike the UI-facing RPC surface (`keenbench-rpc`), the worker contract
//! has no notifications and every request gets exactly one response,
//! correlated by an integer `id` the supervisor assigns.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which workbench directory a path argument is resolved against.
///
/// The tool worker never constructs workbench paths itself: the engine
/// always hands it an explicit absolute path derived from one of these
/// roots (`spec.md` §3 "Ownership").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerRoot {
    /// `workbenches/<wb>/draft/`.
    Draft,
    /// `workbenches/<wb>/published/`.
    Published,
    /// `workbenches/<wb>/draft.<pid>.staging/`.
    Staging,
}

/// A single request sent to the worker over stdin.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerRequest {
    /// Correlation id, unique for the lifetime of the supervisor.
    pub id: u64,
    /// Method name, e.g. `"XlsxGetMap"`.
    pub method: String,
    /// Method parameters.
    pub params: Value,
}

impl WorkerRequest {
    /// Build a request with the given id, method, and params.
    #[must_use]
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

/// A single response read from the worker's stdout.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerResponse {
    /// Id of the request this responds to.
    pub id: u64,
    /// Successful result payload, when `error` is absent.
    #[serde(default)]
    pub result: Option<Value>,
    /// Worker-reported error, when the call failed for a reason other than
    /// process crash or timeout (e.g. a malformed office file).
    #[serde(default)]
    pub error: Option<WorkerErrorPayload>,
}

/// Error payload a worker may return inline, distinct from supervisor-level
/// failures (crash, timeout, unavailability) which never reach this type.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerErrorPayload {
    /// Worker-defined error message.
    pub message: String,
}

/// The structural-map family: `{Xlsx,Docx,Pptx,Pdf,Text}GetMap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    /// Spreadsheet structural map.
    Xlsx,
    /// Word-processing structural map.
    Docx,
    /// Slide-deck structural map.
    Pptx,
    /// PDF structural map.
    Pdf,
    /// Plain-text structural map.
    Text,
}

impl MapKind {
    fn method_name(self) -> &'static str {
        match self {
            Self::Xlsx => "XlsxGetMap",
            Self::Docx => "DocxGetMap",
            Self::Pptx => "PptxGetMap",
            Self::Pdf => "PdfGetMap",
            Self::Text => "TextGetMap",
        }
    }
}

/// The extraction family: `{Docx,Odt,Xlsx,Pptx,Pdf}ExtractText`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractKind {
    /// Word-processing document.
    Docx,
    /// OpenDocument text.
    Odt,
    /// Spreadsheet.
    Xlsx,
    /// Slide deck.
    Pptx,
    /// PDF.
    Pdf,
}

impl ExtractKind {
    fn method_name(self) -> &'static str {
        match self {
            Self::Docx => "DocxExtractText",
            Self::Odt => "OdtExtractText",
            Self::Xlsx => "XlsxExtractText",
            Self::Pptx => "PptxExtractText",
            Self::Pdf => "PdfExtractText",
        }
    }
}

/// The apply-ops family: `{Docx,Xlsx,Pptx}ApplyOps` (Draft root only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOpsKind {
    /// Word-processing document.
    Docx,
    /// Spreadsheet.
    Xlsx,
    /// Slide deck.
    Pptx,
}

impl ApplyOpsKind {
    fn method_name(self) -> &'static str {
        match self {
            Self::Docx => "DocxApplyOps",
            Self::Xlsx => "XlsxApplyOps",
            Self::Pptx => "PptxApplyOps",
        }
    }
}

/// The page/slide/grid render family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    /// PDF page render.
    PdfPage,
    /// DOCX page render.
    DocxPage,
    /// ODT page render.
    OdtPage,
    /// PPTX slide render.
    PptxSlide,
    /// XLSX grid render.
    XlsxGrid,
}

impl RenderKind {
    fn method_name(self) -> &'static str {
        match self {
            Self::PdfPage => "PdfRenderPage",
            Self::DocxPage => "DocxRenderPage",
            Self::OdtPage => "OdtRenderPage",
            Self::PptxSlide => "PptxRenderSlide",
            Self::XlsxGrid => "XlsxRenderGrid",
        }
    }

    /// `true` for the families whose timeout is the 300s "large render"
    /// allowance rather than the default 120s (`spec.md` §4.4, §5).
    #[must_use]
    pub fn is_large_render(self) -> bool {
        true
    }
}

/// Selectors for `read_file`, all optional and format-dependent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReadFileSelectors {
    /// Sheet name, for XLSX.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    /// Cell range, for XLSX (e.g. `"A1:D20"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    /// Section index, for DOCX/ODT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<u64>,
    /// Slide index, for PPTX.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide_index: Option<u64>,
    /// Page numbers, for PDF.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<u64>>,
    /// Starting line, for plain text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u64>,
    /// Number of lines, for plain text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_count: Option<u64>,
}

fn path_params(root: WorkerRoot, path: &Path) -> Value {
    serde_json::json!({ "root": root, "path": path_str(path) })
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Build the `{kind}GetMap(path)` request body for `root`/`path`.
#[must_use]
pub fn get_map_request(kind: MapKind, root: WorkerRoot, path: &Path) -> (&'static str, Value) {
    (kind.method_name(), path_params(root, path))
}

/// Build the `{kind}ExtractText(path, selectors?)` request body.
#[must_use]
pub fn extract_text_request(
    kind: ExtractKind,
    root: WorkerRoot,
    path: &Path,
    selectors: Option<&ReadFileSelectors>,
) -> (&'static str, Value) {
    let mut params = path_params(root, path);
    if let Some(selectors) = selectors {
        params["selectors"] = serde_json::to_value(selectors).unwrap_or(Value::Null);
    }
    (kind.method_name(), params)
}

/// Build the `read_file(path, selectors)` request body.
#[must_use]
pub fn read_file_request(
    root: WorkerRoot,
    path: &Path,
    selectors: &ReadFileSelectors,
) -> (&'static str, Value) {
    let mut params = path_params(root, path);
    params["selectors"] = serde_json::to_value(selectors).unwrap_or(Value::Null);
    ("read_file", params)
}

/// Build the `{kind}ApplyOps(path, ops)` request body. `root` is always
/// [`WorkerRoot::Staging`] or [`WorkerRoot::Draft`] per `spec.md` §4.6 — the
/// caller, not this crate, enforces that edits never target `published/`.
#[must_use]
pub fn apply_ops_request(
    kind: ApplyOpsKind,
    root: WorkerRoot,
    path: &Path,
    ops: Vec<Value>,
) -> (&'static str, Value) {
    let mut params = path_params(root, path);
    params["ops"] = Value::Array(ops);
    (kind.method_name(), params)
}

/// Build a render request body, clamping `scale` into the contracted
/// `[0.25, 2.0]` range (`spec.md` §4.4).
#[must_use]
pub fn render_request(
    kind: RenderKind,
    root: WorkerRoot,
    path: &Path,
    page_or_slide: u64,
    scale: f64,
) -> (&'static str, Value) {
    let mut params = path_params(root, path);
    params["page"] = serde_json::json!(page_or_slide);
    params["scale"] = serde_json::json!(scale.clamp(0.25, 2.0));
    (kind.method_name(), params)
}

/// Build the `ImageGetMetadata(path)` request body.
#[must_use]
pub fn image_get_metadata_request(root: WorkerRoot, path: &Path) -> (&'static str, Value) {
    ("ImageGetMetadata", path_params(root, path))
}

/// Build the `WorkerGetInfo()` readiness-probe request body.
#[must_use]
pub fn get_info_request() -> (&'static str, Value) {
    ("WorkerGetInfo", Value::Object(serde_json::Map::new()))
}

/// Convenience: turn a [`PathBuf`] owned by a caller into the wire string
/// form used by every request above, for callers that log or compare paths.
#[must_use]
pub fn display_path(path: &PathBuf) -> String {
    path_str(path)
}
