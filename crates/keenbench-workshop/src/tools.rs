//! The model-facing tool catalog and per-phase tool sets (`spec.md` §4.9).
//!
//! Argument schemas are intentionally permissive JSON objects here: the
//! authoritative shape for each tool's arguments lives where the call is
//! actually dispatched (`keenbench-toolworker::protocol`, the recall cache,
//! the Draft apply path); this catalog only needs to describe *which*
//! tools a phase may call and their names, so the model can address them.

use keenbench_provider::ToolDef;
use serde_json::json;

fn tool(name: &str, description: &str) -> ToolDef {
    ToolDef {
        name: name.to_string(),
        description: description.to_string(),
        parameters_schema: json!({"type": "object", "additionalProperties": true}),
    }
}

/// Read-only exploration tools available in every phase that may read
/// files (`spec.md` §4.9: "list_files, get_file_info, get_file_map,
/// read_file, table_*, recall_tool_result, *_get_styles").
fn read_only_tools() -> Vec<ToolDef> {
    vec![
        tool("list_files", "List files in the active workbench."),
        tool("get_file_info", "Get size, kind, and basic metadata for a file."),
        tool("get_file_map", "Get the structural map (sheets, sections, slides) of a structured file."),
        tool("read_file", "Read file content, optionally scoped to a sheet, range, section, or slide."),
        tool("table_query", "Query a tabular region of a spreadsheet."),
        tool("recall_tool_result", "Recall a previously-executed tool call's result by id."),
        tool("xlsx_get_styles", "Get the style/formatting skill bundled for spreadsheet edits."),
        tool("docx_get_styles", "Get the style/formatting skill bundled for document edits."),
        tool("pptx_get_styles", "Get the style/formatting skill bundled for presentation edits."),
    ]
}

fn write_tools() -> Vec<ToolDef> {
    vec![
        tool("xlsx_operations", "Apply one or more spreadsheet edit operations."),
        tool("docx_operations", "Apply one or more document edit operations."),
        tool("pptx_operations", "Apply one or more presentation edit operations."),
    ]
}

/// Research phase: read-only, map-first exploration.
#[must_use]
pub fn research_tools() -> Vec<ToolDef> {
    read_only_tools()
}

/// Plan phase: narrowed to re-reading files and recalling earlier results.
#[must_use]
pub fn plan_tools() -> Vec<ToolDef> {
    vec![tool("read_file", "Read file content, optionally scoped to a sheet, range, section, or slide."), tool("recall_tool_result", "Recall a previously-executed tool call's result by id.")]
}

/// Implement phase: the full tool set, read-only plus writes.
#[must_use]
pub fn implement_tools() -> Vec<ToolDef> {
    let mut tools = read_only_tools();
    tools.extend(write_tools());
    tools
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_tools_excludes_writes_and_exploration() {
        let names: Vec<_> = plan_tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["read_file", "recall_tool_result"]);
    }

    #[test]
    fn implement_tools_is_superset_of_research_tools() {
        let research: Vec<_> = research_tools().into_iter().map(|t| t.name).collect();
        let implement: Vec<_> = implement_tools().into_iter().map(|t| t.name).collect();
        for name in research {
            assert!(implement.contains(&name));
        }
        assert!(implement.contains(&"xlsx_operations".to_string()));
    }
}
