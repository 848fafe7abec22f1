//! System-prompt text for each RPI phase (`spec.md` §4.9).
//!
//! Every phase prompt is built with `with_context_block`, which prepends the
//! caller's rendered Workbench Context injection blocks (`spec.md` §4.11:
//! "Runtime injection... prepend to agent system prompts") ahead of the
//! phase-specific instructions. Pass an empty string when no context
//! artifacts exist; the prompt is unchanged either way.

fn with_context_block(context_block: &str, phase_prompt: String) -> String {
    if context_block.is_empty() {
        phase_prompt
    } else {
        format!("{context_block}\n\n{phase_prompt}")
    }
}

/// Research phase: instructs map-first exploration before reading content.
#[must_use]
pub fn research_system_prompt(context_block: &str, user_request: &str) -> String {
    with_context_block(
        context_block,
        format!(
            "You are the Research phase of an RPI cycle. Explore the workbench \
             to understand what is needed for the following request, using \
             read-only tools only.\n\n\
             Always call get_file_map before read_file on a structured file \
             (spreadsheet, document, presentation) so you see its structure \
             before its content. Prefer table_query over read_file for large \
             spreadsheet ranges. Use recall_tool_result instead of repeating an \
             identical call.\n\n\
             When you have enough understanding, respond with your findings as \
             markdown text and no further tool calls. This text becomes \
             research.md for the Plan phase.\n\n\
             Request:\n{user_request}"
        ),
    )
}

/// Plan phase: instructs the model to produce a markdown checklist.
#[must_use]
pub fn plan_system_prompt(context_block: &str, user_request: &str, research: &str) -> String {
    with_context_block(
        context_block,
        format!(
            "You are the Plan phase of an RPI cycle. Using the research below, \
             produce an ordered checklist of concrete steps to satisfy the \
             request. Respond with markdown text and no further tool calls \
             once you are ready; your final message must be exactly a \
             checklist in this form, one item per line:\n\n\
             - [ ] 1. Short label — what this step does\n\
             - [ ] 2. Short label — what this step does\n\n\
             Use read_file or recall_tool_result only if you need to confirm a \
             specific detail before committing to a step.\n\n\
             Request:\n{user_request}\n\n\
             Research:\n{research}"
        ),
    )
}

/// Implement phase: a fresh context built for exactly one plan item.
#[must_use]
pub fn implement_system_prompt(context_block: &str, item_label: &str, plan_markdown: &str, failure_context: Option<&str>) -> String {
    let mut prompt = format!(
        "You are the Implement phase of an RPI cycle, working on exactly \
         one checklist item:\n\n{item_label}\n\n\
         Use get_file_map and read_file to confirm current state before \
         editing. Use the *_get_styles tools before writing new content so \
         edits match the workbench's existing formatting. Apply edits with \
         xlsx_operations, docx_operations, or pptx_operations as \
         appropriate.\n\n\
         If completing this item reveals further necessary steps, mention \
         them in your final message as additional checklist lines in the \
         same `- [ ] N. Label — Description` form; they will be appended to \
         the plan.\n\n\
         Respond with a short final summary once the item is complete, \
         once you have made the necessary tool calls, with no further tool \
         calls.\n\n\
         Full plan for context:\n{plan_markdown}"
    );
    if let Some(failure) = failure_context {
        prompt.push_str(&format!("\n\nThe previous attempt at this item failed:\n{failure}\n\nTry a different approach."));
    }
    with_context_block(context_block, prompt)
}

/// Summary phase: a single non-tool call producing user-visible text.
#[must_use]
pub fn summary_system_prompt(plan_markdown: &str) -> String {
    format!(
        "You are the Summary phase of an RPI cycle. Write a short, \
         user-facing message describing what was done and, if any \
         checklist items failed, what was skipped and why. Do not call any \
         tools.\n\n\
         Final plan state:\n{plan_markdown}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn research_prompt_includes_request() {
        let prompt = research_system_prompt("", "add a totals row");
        assert!(prompt.contains("add a totals row"));
        assert!(prompt.contains("get_file_map"));
    }

    #[test]
    fn implement_prompt_appends_failure_context_when_present() {
        let without = implement_system_prompt("", "1. Do thing", "plan", None);
        assert!(!without.contains("previous attempt"));
        let with = implement_system_prompt("", "1. Do thing", "plan", Some("sheet not found"));
        assert!(with.contains("sheet not found"));
    }

    #[test]
    fn context_block_is_prepended_when_present() {
        let prompt = research_system_prompt("<workbench-situation>notes</workbench-situation>", "add a totals row");
        assert!(prompt.starts_with("<workbench-situation>"));
        assert!(prompt.contains("add a totals row"));
    }
}
