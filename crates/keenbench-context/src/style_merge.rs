//! Document-style skill merging (`spec.md` §4.11: "Document-style skill
//! merges with any format-gated bundled style skill; on merge failure, fall
//! back to the generic style skill and emit `STYLE_MERGE_FAILED` as a
//! notice event").

use keenbench_core::manifest::FileKind;

use crate::types::{Category, ContextArtifact};

/// One notification emitted by a style merge.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextEvent {
    /// The format-gated bundled style skill failed to merge with the
    /// user's `document-style` skill; the generic bundled skill was used
    /// instead.
    StyleMergeFailed {
        /// The file kind whose bundled skill failed to merge.
        file_kind: FileKind,
    },
    /// A Context category's stored artifact changed (processed, direct
    /// edit, or deleted).
    ContextChanged {
        /// The category that changed.
        category: Category,
    },
}

/// Receives [`ContextEvent`]s as Context operations run.
pub trait ContextNotifier: Send + Sync {
    /// Handle one event. Must not block for long.
    fn notify(&self, event: ContextEvent);
}

/// A notifier that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullContextNotifier;

impl ContextNotifier for NullContextNotifier {
    fn notify(&self, _event: ContextEvent) {}
}

const GENERIC_STYLE_SKILL: &str = "Write in clear, plain prose. Prefer short paragraphs and active voice.";

/// Bundled style guidance gated on the target file's kind, layered under
/// the user's own `document-style` skill. `None` for kinds with no
/// bundled guidance (the generic skill alone then applies).
fn bundled_style_skill(file_kind: FileKind) -> Option<&'static str> {
    match file_kind {
        FileKind::Docx => Some(
            "Use Word's built-in heading styles (Heading 1/2/3) rather than manual bold \
             runs. Keep section numbering consistent with the existing document.",
        ),
        FileKind::Pptx => Some(
            "One idea per slide. Titles are noun phrases, not sentences. Body bullets stay \
             under two lines each.",
        ),
        FileKind::Xlsx => Some(
            "Header rows are bold and frozen. Currency and percentage columns carry explicit \
             number formats, not plain text.",
        ),
        _ => None,
    }
}

/// Merge the user's `document-style` artifact (if any) with the bundled
/// style skill for `file_kind`. Falls back to [`GENERIC_STYLE_SKILL`] alone
/// and emits [`ContextEvent::StyleMergeFailed`] if the user's artifact is
/// present but not a well-formed skill body.
pub fn merge_style_guidance(
    document_style: Option<&ContextArtifact>,
    file_kind: FileKind,
    notifier: &dyn ContextNotifier,
) -> String {
    let bundled = bundled_style_skill(file_kind);

    let user_body = match document_style {
        Some(artifact) if artifact.category == Category::DocumentStyle && !artifact.body.trim().is_empty() => {
            Some(artifact.body.as_str())
        }
        Some(_) => {
            notifier.notify(ContextEvent::StyleMergeFailed { file_kind });
            None
        }
        None => None,
    };

    match (bundled, user_body) {
        (Some(bundled), Some(user_body)) => format!("{bundled}\n\n{user_body}"),
        (Some(bundled), None) => format!("{GENERIC_STYLE_SKILL}\n\n{bundled}"),
        (None, Some(user_body)) => user_body.to_string(),
        (None, None) => GENERIC_STYLE_SKILL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::types::ArtifactKind;

    use super::*;

    fn style_artifact(body: &str) -> ContextArtifact {
        ContextArtifact {
            category: Category::DocumentStyle,
            kind: ArtifactKind::Skill,
            frontmatter: None,
            body: body.to_string(),
            referenced_files: Vec::new(),
        }
    }

    #[test]
    fn merges_user_style_with_bundled_docx_skill() {
        let artifact = style_artifact("Use British spelling throughout.");
        let merged = merge_style_guidance(Some(&artifact), FileKind::Docx, &NullContextNotifier);
        assert!(merged.contains("Heading 1/2/3"));
        assert!(merged.contains("British spelling"));
    }

    #[test]
    fn falls_back_to_generic_when_no_user_style_and_no_bundled_skill() {
        let merged = merge_style_guidance(None, FileKind::Text, &NullContextNotifier);
        assert_eq!(merged, GENERIC_STYLE_SKILL);
    }

    #[test]
    fn falls_back_to_generic_plus_bundled_when_no_user_style() {
        let merged = merge_style_guidance(None, FileKind::Pptx, &NullContextNotifier);
        assert!(merged.contains(GENERIC_STYLE_SKILL));
        assert!(merged.contains("One idea per slide"));
    }

    #[test]
    fn empty_user_style_body_counts_as_merge_failure() {
        struct Spy(std::sync::Mutex<Vec<ContextEvent>>);
        impl ContextNotifier for Spy {
            fn notify(&self, event: ContextEvent) {
                self.0.lock().unwrap().push(event);
            }
        }
        let spy = Spy(std::sync::Mutex::new(Vec::new()));
        let artifact = style_artifact("");
        let merged = merge_style_guidance(Some(&artifact), FileKind::Docx, &spy);
        assert!(merged.contains("Heading 1/2/3"));
        let events = spy.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ContextEvent::StyleMergeFailed { file_kind: FileKind::Docx }));
    }
}
