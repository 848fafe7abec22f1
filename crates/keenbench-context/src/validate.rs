//! Hard validation of a processed Context artifact (`spec.md` §4.11: "file
//! present; frontmatter parseable; name satisfies format and matches
//! category; referenced files exist and are path-safe").
//!
//! Modeled on `abp-json-guard::validate_json_object`'s shape: a plain
//! function returning accumulated error strings, empty meaning valid.
//! Direct edits (`ContextUpdateDirect`) bypass this by design and are never
//! routed through [`validate_skill`]/[`validate_situation`].

use std::path::Path;

use crate::pathsafe::resolve_descendant;
use crate::types::{Category, SkillFrontmatter};

/// Outcome of hard-validating a just-processed artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardValidation {
    /// Accumulated problems; empty means the artifact passed.
    pub errors: Vec<String>,
}

impl HardValidation {
    /// `true` when no problems were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A skill name is lowercase kebab-case, 3-64 characters, starting with a
/// letter: `^[a-z][a-z0-9]*(-[a-z0-9]+)*$`. Decided here since `spec.md`
/// names only "satisfies format" without a concrete grammar.
#[must_use]
pub fn is_valid_skill_name(name: &str) -> bool {
    if name.len() < 3 || name.len() > 64 {
        return false;
    }
    let mut chars = name.chars();
    let Some(first) = chars.next() else { return false };
    if !first.is_ascii_lowercase() {
        return false;
    }
    let mut prev_hyphen = false;
    for c in chars {
        match c {
            'a'..='z' | '0'..='9' => prev_hyphen = false,
            '-' if !prev_hyphen => prev_hyphen = true,
            _ => return false,
        }
    }
    !prev_hyphen
}

/// Validate a processed `SKILL.md` artifact: the skill's name must be
/// valid and must equal the category's directory slug (each category
/// holds exactly one skill, so pinning the name to the category keeps
/// `ContextGet`/injection lookups unambiguous).
#[must_use]
pub fn validate_skill(
    category: Category,
    frontmatter: Option<&SkillFrontmatter>,
    body_present: bool,
    referenced_files: &[String],
    artifact_dir: &Path,
) -> HardValidation {
    let mut errors = Vec::new();

    if !body_present {
        errors.push("SKILL.md is missing or empty".to_string());
    }

    match frontmatter {
        None => errors.push("frontmatter could not be parsed".to_string()),
        Some(fm) => {
            if !is_valid_skill_name(&fm.name) {
                errors.push(format!("name '{}' does not satisfy the skill-name format", fm.name));
            } else if fm.name != category.dir_name() {
                errors.push(format!("name '{}' does not match category '{}'", fm.name, category.dir_name()));
            }
            if fm.description.trim().is_empty() {
                errors.push("description is empty".to_string());
            }
        }
    }

    for relative_path in referenced_files {
        match resolve_descendant(artifact_dir, relative_path) {
            Ok(resolved) if !resolved.exists() => {
                errors.push(format!("referenced file '{relative_path}' does not exist"));
            }
            Ok(_) => {}
            Err(e) => errors.push(format!("referenced file '{relative_path}' is not path-safe: {e}")),
        }
    }

    HardValidation { errors }
}

/// Validate a processed `context.md` (`situation`) artifact: just presence.
#[must_use]
pub fn validate_situation(body_present: bool) -> HardValidation {
    let mut errors = Vec::new();
    if !body_present {
        errors.push("context.md is missing or empty".to_string());
    }
    HardValidation { errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_kebab_name() {
        assert!(is_valid_skill_name("company-context"));
    }

    #[test]
    fn rejects_uppercase() {
        assert!(!is_valid_skill_name("Company-Context"));
    }

    #[test]
    fn rejects_leading_digit() {
        assert!(!is_valid_skill_name("1company"));
    }

    #[test]
    fn rejects_double_hyphen() {
        assert!(!is_valid_skill_name("company--context"));
    }

    #[test]
    fn rejects_trailing_hyphen() {
        assert!(!is_valid_skill_name("company-"));
    }

    #[test]
    fn rejects_too_short() {
        assert!(!is_valid_skill_name("ab"));
    }

    #[test]
    fn validate_skill_passes_when_name_matches_category_and_body_present() {
        let tmp = tempfile::tempdir().unwrap();
        let fm = SkillFrontmatter { name: "company-context".into(), description: "acme".into() };
        let result = validate_skill(Category::CompanyContext, Some(&fm), true, &[], tmp.path());
        assert!(result.is_valid());
    }

    #[test]
    fn validate_skill_fails_when_name_does_not_match_category() {
        let tmp = tempfile::tempdir().unwrap();
        let fm = SkillFrontmatter { name: "department-context".into(), description: "acme".into() };
        let result = validate_skill(Category::CompanyContext, Some(&fm), true, &[], tmp.path());
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("does not match category")));
    }

    #[test]
    fn validate_skill_fails_on_missing_frontmatter() {
        let tmp = tempfile::tempdir().unwrap();
        let result = validate_skill(Category::CompanyContext, None, true, &[], tmp.path());
        assert!(!result.is_valid());
    }

    #[test]
    fn validate_skill_fails_on_missing_referenced_file() {
        let tmp = tempfile::tempdir().unwrap();
        let fm = SkillFrontmatter { name: "company-context".into(), description: "acme".into() };
        let result =
            validate_skill(Category::CompanyContext, Some(&fm), true, &["missing.md".to_string()], tmp.path());
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("does not exist")));
    }

    #[test]
    fn validate_skill_fails_on_unsafe_referenced_path() {
        let tmp = tempfile::tempdir().unwrap();
        let fm = SkillFrontmatter { name: "company-context".into(), description: "acme".into() };
        let result =
            validate_skill(Category::CompanyContext, Some(&fm), true, &["../escape.md".to_string()], tmp.path());
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("path-safe")));
    }

    #[test]
    fn validate_skill_passes_with_existing_referenced_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("sample.md"), b"x").unwrap();
        let fm = SkillFrontmatter { name: "company-context".into(), description: "acme".into() };
        let result =
            validate_skill(Category::CompanyContext, Some(&fm), true, &["sample.md".to_string()], tmp.path());
        assert!(result.is_valid());
    }

    #[test]
    fn validate_situation_requires_body() {
        assert!(!validate_situation(false).is_valid());
        assert!(validate_situation(true).is_valid());
    }
}
