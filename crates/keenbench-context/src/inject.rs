//! Runtime injection: render stored Context artifacts into the
//! `<workbench-situation>`/`<workbench-skill>` prompt blocks prepended to
//! Workshop phase system prompts (`spec.md` §4.11 "Runtime injection").

use keenbench_error::EngineError;
use keenbench_workbench::WorkbenchPaths;

use crate::store;
use crate::types::Category;

/// Render every present category's artifact into its prompt block and
/// concatenate them in a fixed order, ready to prepend to a phase system
/// prompt. Returns an empty string if no Context items exist.
pub fn render_injection_blocks(paths: &WorkbenchPaths) -> Result<String, EngineError> {
    let mut blocks = Vec::new();
    for category in Category::all() {
        if let Some(artifact) = store::get(paths, category)? {
            blocks.push(render_block(category, &artifact.body, artifact.frontmatter.as_ref().map(|fm| fm.name.as_str())));
        }
    }
    Ok(blocks.join("\n\n"))
}

fn render_block(category: Category, body: &str, skill_name: Option<&str>) -> String {
    if category == Category::Situation {
        format!("<workbench-situation>\n{body}\n</workbench-situation>")
    } else {
        let name = skill_name.unwrap_or(category.dir_name());
        format!("<workbench-skill name=\"{name}\">\n{body}\n</workbench-skill>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_workbench_has_no_injection_blocks() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        assert_eq!(render_injection_blocks(&paths).unwrap(), "");
    }

    #[test]
    fn situation_renders_as_situation_block() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        store::update_direct(&paths, Category::Situation, "deal is time-sensitive", false).unwrap();
        let rendered = render_injection_blocks(&paths).unwrap();
        assert!(rendered.contains("<workbench-situation>"));
        assert!(rendered.contains("deal is time-sensitive"));
    }

    #[test]
    fn skill_category_renders_with_name_attribute() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        store::update_direct(
            &paths,
            Category::CompanyContext,
            "---\nname: company-context\ndescription: acme\n---\n\nAcme sells widgets",
            false,
        )
        .unwrap();
        let rendered = render_injection_blocks(&paths).unwrap();
        assert!(rendered.contains("<workbench-skill name=\"company-context\">"));
        assert!(rendered.contains("Acme sells widgets"));
    }

    #[test]
    fn multiple_categories_render_in_fixed_order() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        store::update_direct(&paths, Category::Situation, "situation body", false).unwrap();
        store::update_direct(
            &paths,
            Category::CompanyContext,
            "---\nname: company-context\ndescription: acme\n---\n\ncompany body",
            false,
        )
        .unwrap();
        let rendered = render_injection_blocks(&paths).unwrap();
        let company_pos = rendered.find("company body").unwrap();
        let situation_pos = rendered.find("situation body").unwrap();
        assert!(company_pos < situation_pos, "company-context precedes situation in Category::all() order");
    }
}
