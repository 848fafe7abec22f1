//! `ContextProcess`: the synchronous model call that turns a user
//! description into a validated artifact (`spec.md` §4.11).
//!
//! On first hard-validation failure, exactly one repair retry runs,
//! re-prompting with the accumulated errors. A second failure is returned
//! to the caller as-is; nothing is persisted.

use std::path::Path;

use keenbench_core::model::ReasoningEffort;
use keenbench_error::{EngineError, ErrorCode};
use keenbench_provider::client::ProviderClient;
use keenbench_provider::types::{ChatMessage, ChatResult, RequestProfile, ToolChoice};
use keenbench_workbench::WorkbenchPaths;
use tracing::{info, warn};

use crate::frontmatter;
use crate::store;
use crate::types::{Category, ContextArtifact, SkillFrontmatter};
use crate::validate::{self, HardValidation};

/// A single non-tool-calling turn, used for artifact generation and repair.
fn no_tools_profile() -> RequestProfile {
    RequestProfile { reasoning_effort: ReasoningEffort::Medium, tool_choice: ToolChoice::None, is_first_tool_turn: false }
}

fn generation_prompt(category: Category, description: &str) -> String {
    if category.is_skill() {
        format!(
            "Produce a SKILL.md for the '{}' workbench context category.\n\
             Requirements:\n\
             - Begin with YAML frontmatter delimited by '---' lines, containing exactly\n\
               `name: {}` and a one-line `description`.\n\
             - Follow with a markdown body capturing the guidance below.\n\
             - Do not reference any files other than ones you are prepared to write in full.\n\n\
             User-provided guidance:\n{}",
            category.dir_name(),
            category.dir_name(),
            description,
        )
    } else {
        format!(
            "Produce the plain-text body of a workbench 'situation' note, reflecting the \
             guidance below. Do not include any frontmatter or headings structure beyond \
             ordinary markdown.\n\nUser-provided guidance:\n{description}"
        )
    }
}

fn repair_prompt(category: Category, description: &str, previous: &str, errors: &[String]) -> String {
    format!(
        "{}\n\nThe previous attempt failed validation:\n{}\n\nPrevious attempt:\n{}\n\n\
         Produce a corrected full artifact addressing every error above.",
        generation_prompt(category, description),
        errors.iter().map(|e| format!("- {e}")).collect::<Vec<_>>().join("\n"),
        previous,
    )
}

/// Parse a model completion into the pieces `validate::validate_skill`/
/// `validate_situation` need, without yet writing anything to disk.
fn parse_attempt(category: Category, raw: &str) -> (Option<SkillFrontmatter>, String, bool) {
    if category.is_skill() {
        match frontmatter::parse(raw) {
            Ok((fm, body)) => {
                let present = !body.trim().is_empty();
                (Some(fm), body, present)
            }
            Err(_) => (None, String::new(), false),
        }
    } else {
        let present = !raw.trim().is_empty();
        (None, raw.to_string(), present)
    }
}

fn hard_validate(category: Category, frontmatter: Option<&SkillFrontmatter>, body_present: bool, artifact_dir: &Path) -> HardValidation {
    if category.is_skill() {
        validate::validate_skill(category, frontmatter, body_present, &[], artifact_dir)
    } else {
        validate::validate_situation(body_present)
    }
}

/// Run one model call, hard-validate it, and on failure run exactly one
/// repair retry before giving up. Persists the artifact on success.
///
/// Blocked while a Draft exists, per the same convention as
/// [`store::update_direct`]/[`store::delete`].
pub async fn process(
    paths: &WorkbenchPaths,
    provider: &dyn ProviderClient,
    category: Category,
    description: &str,
    draft_exists: bool,
) -> Result<ContextArtifact, EngineError> {
    if draft_exists {
        return Err(EngineError::new(ErrorCode::ConflictDraftExists, "Context mutations are blocked while a Draft exists"));
    }

    let artifact_dir = paths.context_dir(category.dir_name());
    let profile = no_tools_profile();

    let first_prompt = generation_prompt(category, description);
    let first_raw = complete(provider, &first_prompt, &profile).await?;
    let (fm, body, body_present) = parse_attempt(category, &first_raw);
    let first_validation = hard_validate(category, fm.as_ref(), body_present, &artifact_dir);

    let (final_raw, final_fm, final_body) = if first_validation.is_valid() {
        (first_raw, fm, body)
    } else {
        warn!(category = category.dir_name(), errors = ?first_validation.errors, "context artifact failed hard validation, retrying once");
        let retry_prompt = repair_prompt(category, description, &first_raw, &first_validation.errors);
        let retry_raw = complete(provider, &retry_prompt, &profile).await?;
        let (retry_fm, retry_body, retry_present) = parse_attempt(category, &retry_raw);
        let retry_validation = hard_validate(category, retry_fm.as_ref(), retry_present, &artifact_dir);
        if !retry_validation.is_valid() {
            return Err(EngineError::new(
                ErrorCode::ValidationFailed,
                format!("artifact failed validation after repair retry: {}", retry_validation.errors.join("; ")),
            ));
        }
        (retry_raw, retry_fm, retry_body)
    };

    let content = if category.is_skill() {
        let fm = final_fm.clone().ok_or_else(|| EngineError::new(ErrorCode::ValidationFailed, "missing frontmatter after validation"))?;
        frontmatter::render(&fm, &final_body)
    } else {
        final_raw
    };

    store::update_direct(paths, category, &content, false)?;
    info!(category = category.dir_name(), "context artifact processed and stored");
    let referenced_files = store::list_referenced_files(paths, category)?;

    Ok(ContextArtifact {
        category,
        kind: if category.is_skill() { crate::types::ArtifactKind::Skill } else { crate::types::ArtifactKind::Situation },
        frontmatter: final_fm,
        body: final_body,
        referenced_files,
    })
}

async fn complete(provider: &dyn ProviderClient, prompt: &str, profile: &RequestProfile) -> Result<String, EngineError> {
    let messages = [ChatMessage::user(prompt)];
    let ChatResult { content, .. } = provider.chat_with_tools(&messages, &[], profile).await?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use keenbench_provider::client::DeltaSink;
    use keenbench_provider::types::{FinishReason, ToolDef};
    use std::sync::Mutex;

    use super::*;

    struct ScriptedProvider {
        responses: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProviderClient for ScriptedProvider {
        async fn validate_key(&self) -> Result<(), EngineError> {
            Ok(())
        }

        async fn chat_with_tools(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolDef],
            _profile: &RequestProfile,
        ) -> Result<ChatResult, EngineError> {
            let mut responses = self.responses.lock().unwrap();
            let content = responses.remove(0);
            Ok(ChatResult { content, tool_calls: Vec::new(), finish_reason: FinishReason::Stop })
        }

        async fn stream_chat_with_tools(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolDef],
            _profile: &RequestProfile,
            _on_delta: &mut DeltaSink<'_>,
        ) -> Result<ChatResult, EngineError> {
            unreachable!("not used by process()")
        }
    }

    #[tokio::test]
    async fn process_persists_on_first_valid_attempt() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let provider = ScriptedProvider {
            responses: Mutex::new(vec!["---\nname: situation\ndescription: n/a\n---\n\nthe client is risk-averse".to_string()]),
        };

        let artifact = process(&paths, &provider, Category::Situation, "client is risk-averse", false).await.unwrap();
        assert_eq!(artifact.body, "the client is risk-averse");
        assert!(store::get(&paths, Category::Situation).unwrap().is_some());
    }

    #[tokio::test]
    async fn process_retries_once_then_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let provider = ScriptedProvider {
            responses: Mutex::new(vec![
                "---\nname: wrong-name\ndescription: bad\n---\n\nbody".to_string(),
                "---\nname: company-context\ndescription: fixed\n---\n\nbody".to_string(),
            ]),
        };

        let artifact = process(&paths, &provider, Category::CompanyContext, "acme inc", false).await.unwrap();
        assert_eq!(artifact.frontmatter.unwrap().name, "company-context");
    }

    #[tokio::test]
    async fn process_fails_after_repair_also_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let provider = ScriptedProvider {
            responses: Mutex::new(vec!["not frontmatter at all".to_string(), "still not frontmatter".to_string()]),
        };

        let err = process(&paths, &provider, Category::CompanyContext, "acme inc", false).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(store::get(&paths, Category::CompanyContext).unwrap().is_none());
    }

    #[tokio::test]
    async fn process_blocked_while_draft_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let provider = ScriptedProvider { responses: Mutex::new(vec![String::new()]) };
        let err = process(&paths, &provider, Category::Situation, "x", true).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConflictDraftExists);
    }
}
