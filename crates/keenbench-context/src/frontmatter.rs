//! `SKILL.md` frontmatter parsing (`spec.md` §4.11: "`SKILL.md` with YAML
//! frontmatter `{name, description}`").

use keenbench_error::{EngineError, ErrorCode};

use crate::types::SkillFrontmatter;

/// Split `content` into its leading `---`-delimited YAML frontmatter block
/// and the remaining markdown body.
///
/// Returns `Err` if the file has no frontmatter block at all or the block
/// is not valid YAML for [`SkillFrontmatter`]'s shape.
pub fn parse(content: &str) -> Result<(SkillFrontmatter, String), EngineError> {
    let rest = content.strip_prefix("---").ok_or_else(|| malformed("missing leading '---' frontmatter fence"))?;
    let end = rest.find("\n---").ok_or_else(|| malformed("missing closing '---' frontmatter fence"))?;

    let yaml = &rest[..end];
    let body = rest[end + 4..].trim_start_matches('\n').to_string();

    let frontmatter: SkillFrontmatter =
        serde_yaml::from_str(yaml).map_err(|e| malformed(format!("frontmatter is not valid YAML: {e}")))?;

    Ok((frontmatter, body))
}

/// Render a skill file from frontmatter and body, the inverse of [`parse`].
#[must_use]
pub fn render(frontmatter: &SkillFrontmatter, body: &str) -> String {
    let yaml = serde_yaml::to_string(frontmatter).unwrap_or_default();
    format!("---\n{yaml}---\n\n{body}")
}

fn malformed(message: impl Into<String>) -> EngineError {
    EngineError::new(ErrorCode::ValidationFailed, message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_frontmatter() {
        let content = "---\nname: acme-style\ndescription: house style guide\n---\n\n# Body\ntext";
        let (fm, body) = parse(content).unwrap();
        assert_eq!(fm.name, "acme-style");
        assert_eq!(fm.description, "house style guide");
        assert_eq!(body, "# Body\ntext");
    }

    #[test]
    fn rejects_missing_opening_fence() {
        let err = parse("no frontmatter here").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn rejects_missing_closing_fence() {
        let err = parse("---\nname: x\ndescription: y\nbody with no close").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn rejects_malformed_yaml() {
        let content = "---\nname: [unclosed\n---\nbody";
        let err = parse(content).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn rejects_missing_required_field() {
        let content = "---\nname: acme-style\n---\nbody";
        let err = parse(content).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn render_roundtrips_through_parse() {
        let fm = SkillFrontmatter { name: "acme-style".into(), description: "house style".into() };
        let rendered = render(&fm, "# Body\ntext");
        let (parsed_fm, parsed_body) = parse(&rendered).unwrap();
        assert_eq!(parsed_fm, fm);
        assert_eq!(parsed_body, "# Body\ntext");
    }
}
