//! The Workbench Context/skills injector (`spec.md` §4.11, C12).
//!
//! Four categories — `company-context`, `department-context`, `situation`,
//! `document-style` — each holding at most one artifact. [`process::process`]
//! drives the synchronous model call plus hard validation and single
//! repair-retry; [`store`] is the on-disk read/write layer for
//! `meta/context/<category>/`; [`inject::render_injection_blocks`] builds the
//! `<workbench-situation>`/`<workbench-skill>` blocks prepended to Workshop
//! phase system prompts; [`style_merge`] layers the `document-style` skill
//! over a format-gated bundled one; [`clutter`] estimates the token-weight
//! signal surfaced alongside every Context mutation.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

/// The Clutter estimator.
pub mod clutter;
/// `SKILL.md` frontmatter parsing and rendering.
pub mod frontmatter;
/// Runtime prompt-injection block rendering.
pub mod inject;
/// Path-safety checks for referenced files.
pub mod pathsafe;
/// `ContextProcess` orchestration: model call, hard validation, repair retry.
pub mod process;
/// Document-style merging and Context change notifications.
pub mod style_merge;
/// On-disk artifact storage under `meta/context/<category>/`.
pub mod store;
/// Wire-shaped types for the `Context*` RPCs.
pub mod types;
/// Hard validation of processed artifacts.
pub mod validate;

pub use style_merge::{ContextEvent, ContextNotifier, NullContextNotifier};
pub use types::{ArtifactKind, Category, ClutterLevel, ClutterReport, ContextArtifact, ContextSummary, SkillFrontmatter};
