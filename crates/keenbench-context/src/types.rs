//! Wire-shaped types for the `Context*` RPCs (`spec.md` §4.11).

use serde::{Deserialize, Serialize};

/// One of the four Workbench Context categories; at most one item exists
/// per category per workbench.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Company-wide context, injected as a skill.
    CompanyContext,
    /// Department-level context, injected as a skill.
    DepartmentContext,
    /// Free-form situational context, injected as `<workbench-situation>`.
    Situation,
    /// Document formatting/style guidance, injected as a skill and merged
    /// with any bundled format-specific style skill.
    DocumentStyle,
}

impl Category {
    /// All four categories, in a fixed order.
    #[must_use]
    pub fn all() -> [Category; 4] {
        [Self::CompanyContext, Self::DepartmentContext, Self::Situation, Self::DocumentStyle]
    }

    /// The directory name under `meta/context/` for this category
    /// (matches the `kebab-case` wire form).
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::CompanyContext => "company-context",
            Self::DepartmentContext => "department-context",
            Self::Situation => "situation",
            Self::DocumentStyle => "document-style",
        }
    }

    /// Whether this category's artifact is an Agent Skill (`SKILL.md`) as
    /// opposed to plain `context.md` (only `Situation`).
    #[must_use]
    pub fn is_skill(self) -> bool {
        !matches!(self, Self::Situation)
    }
}

/// The on-disk artifact kind for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// `SKILL.md` with YAML frontmatter plus optional referenced files.
    Skill,
    /// Plain `context.md`, no frontmatter.
    Situation,
}

/// Parsed `SKILL.md` frontmatter (`spec.md` §4.11: `{name, description}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillFrontmatter {
    /// Skill name; must satisfy the category's naming format.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
}

/// A processed or direct-edited Context artifact, as returned by
/// `ContextGet`/`ContextGetArtifact`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextArtifact {
    /// The category this artifact belongs to.
    pub category: Category,
    /// `Skill` (`SKILL.md`) or `Situation` (`context.md`).
    pub kind: ArtifactKind,
    /// Parsed frontmatter, present only for `Skill` artifacts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontmatter: Option<SkillFrontmatter>,
    /// Full markdown body (frontmatter stripped for skills).
    pub body: String,
    /// Relative paths of files referenced alongside the artifact.
    pub referenced_files: Vec<String>,
}

/// Summary row returned by `ContextList`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    /// The category.
    pub category: Category,
    /// Whether an artifact currently exists for this category.
    pub present: bool,
}

/// Clutter level emitted alongside every processed/direct-edited artifact
/// and surfaced standalone via the estimator (`spec.md` §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClutterLevel {
    /// Context items are a small fraction of the effective budget.
    Light,
    /// Context items are a moderate fraction of the effective budget.
    Medium,
    /// Context items are a large fraction of the effective budget.
    Heavy,
}

/// Output of the Clutter estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClutterReport {
    /// The bucketed level.
    pub level: ClutterLevel,
    /// Estimated token weight contributed by context items alone.
    pub context_tokens: u64,
    /// Estimated token weight of the whole phase context (files + tail +
    /// context items).
    pub total_tokens: u64,
    /// `true` once context items exceed ~35% of `total_tokens`.
    pub context_warning: bool,
}
