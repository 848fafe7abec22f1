//! Top-level orchestration of one full RPI cycle (`spec.md` §4.9).

use keenbench_core::model::ReasoningEffort;
use keenbench_error::EngineError;
use keenbench_provider::{ChatMessage, ProviderClient};
use keenbench_workbench::WorkbenchPaths;

use crate::agent_loop::run_agent_loop;
use crate::cancel::CancelToken;
use crate::events::{WorkshopEvent, WorkshopNotifier};
use crate::phase::WorkshopPhase;
use crate::plan::PlanDocument;
use crate::prompts::{implement_system_prompt, plan_system_prompt, research_system_prompt, summary_system_prompt};
use crate::tool_exec::ToolExecutor;
use crate::tools::{implement_tools, plan_tools, research_tools};
use crate::{state, ImplementItemResult};

/// Reasoning effort configured for each phase that has one (`spec.md`
/// §4.9; Summary has none — see [`keenbench_core::model::RpiPhase`]).
#[derive(Debug, Clone, Copy)]
pub struct PhaseEfforts {
    /// Research phase effort.
    pub research: ReasoningEffort,
    /// Plan phase effort.
    pub plan: ReasoningEffort,
    /// Implement phase effort.
    pub implement: ReasoningEffort,
    /// Summary phase effort. Not independently configurable; callers
    /// typically pass the Implement phase's effort.
    pub summary: ReasoningEffort,
}

/// What a full RPI cycle produced.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// The final plan state, including any failed items.
    pub plan: PlanDocument,
    /// The Summary phase's user-visible text.
    pub summary_text: String,
    /// Per-item outcomes from the Implement phase, in execution order.
    pub implement_results: Vec<ImplementItemResult>,
}

/// Run one full RPI cycle for `user_request`.
///
/// Clears and reinitializes `meta/workshop/_rpi/` first (`spec.md` §4.9
/// "RPI state reset" — a new cycle always starts clean).
pub async fn run_cycle(
    paths: &WorkbenchPaths,
    provider: &dyn ProviderClient,
    executor: &dyn ToolExecutor,
    notifier: &dyn WorkshopNotifier,
    user_request: &str,
    context_block: &str,
    efforts: PhaseEfforts,
    cancel: &CancelToken,
) -> Result<CycleOutcome, EngineError> {
    state::reset(paths).await?;

    let research_text = run_research(paths, provider, executor, notifier, user_request, context_block, efforts.research, cancel).await?;
    let mut plan = run_plan(paths, provider, executor, notifier, user_request, &research_text, context_block, efforts.plan, cancel).await?;

    let implement_results = if plan.is_complete() {
        Vec::new()
    } else {
        run_implement(paths, provider, executor, notifier, &mut plan, context_block, efforts.implement, cancel).await?
    };

    let summary_text = run_summary(provider, notifier, &plan, efforts.summary, cancel).await?;

    Ok(CycleOutcome { plan, summary_text, implement_results })
}

async fn run_research(
    paths: &WorkbenchPaths,
    provider: &dyn ProviderClient,
    executor: &dyn ToolExecutor,
    notifier: &dyn WorkshopNotifier,
    user_request: &str,
    context_block: &str,
    effort: ReasoningEffort,
    cancel: &CancelToken,
) -> Result<String, EngineError> {
    notifier.notify(WorkshopEvent::PhaseStarted { phase: WorkshopPhase::Research });
    let messages = vec![ChatMessage::system(research_system_prompt(context_block, user_request)), ChatMessage::user(user_request)];
    let outcome =
        run_agent_loop(provider, &research_tools(), messages, effort, executor, notifier, WorkshopPhase::Research.max_turns(), cancel).await?;
    state::write_research(paths, &outcome.final_text).await?;
    notifier.notify(WorkshopEvent::PhaseCompleted { phase: WorkshopPhase::Research });
    Ok(outcome.final_text)
}

async fn run_plan(
    paths: &WorkbenchPaths,
    provider: &dyn ProviderClient,
    executor: &dyn ToolExecutor,
    notifier: &dyn WorkshopNotifier,
    user_request: &str,
    research_text: &str,
    context_block: &str,
    effort: ReasoningEffort,
    cancel: &CancelToken,
) -> Result<PlanDocument, EngineError> {
    notifier.notify(WorkshopEvent::PhaseStarted { phase: WorkshopPhase::Plan });
    let messages = vec![
        ChatMessage::system(plan_system_prompt(context_block, user_request, research_text)),
        ChatMessage::user(user_request),
    ];
    let outcome = run_agent_loop(provider, &plan_tools(), messages, effort, executor, notifier, WorkshopPhase::Plan.max_turns(), cancel).await?;
    let plan = PlanDocument::from_plan_phase_output(&outcome.final_text);
    state::write_plan(paths, &plan.render()).await?;
    notifier.notify(WorkshopEvent::PhaseCompleted { phase: WorkshopPhase::Plan });
    Ok(plan)
}

async fn run_implement(
    paths: &WorkbenchPaths,
    provider: &dyn ProviderClient,
    executor: &dyn ToolExecutor,
    notifier: &dyn WorkshopNotifier,
    plan: &mut PlanDocument,
    context_block: &str,
    effort: ReasoningEffort,
    cancel: &CancelToken,
) -> Result<Vec<ImplementItemResult>, EngineError> {
    notifier.notify(WorkshopEvent::PhaseStarted { phase: WorkshopPhase::Implement });
    let mut results = Vec::new();
    let mut current = 0usize;

    while let Some(index) = plan.pending_indices().into_iter().next() {
        if cancel.is_canceled() {
            return Err(keenbench_error::EngineError::new(keenbench_error::ErrorCode::UserCanceled, "run canceled"));
        }

        current += 1;
        let total = plan.items.len();
        let label = plan
            .items
            .iter()
            .find(|i| i.index == index)
            .map(|i| i.label.clone())
            .unwrap_or_default();
        notifier.notify(WorkshopEvent::ImplementProgress { current, total, label: label.clone() });

        let attempt = run_implement_item(provider, executor, notifier, plan, &label, context_block, effort, None, cancel).await;
        match attempt {
            Ok(final_text) => {
                plan.mark_done(index);
                plan.append_discovered(&final_text);
                results.push(ImplementItemResult { index, label, failed: false, reason: None });
            }
            Err(ItemAttemptError::Canceled) => {
                return Err(keenbench_error::EngineError::new(keenbench_error::ErrorCode::UserCanceled, "run canceled"));
            }
            Err(ItemAttemptError::Failed(first_reason)) => {
                let retry =
                    run_implement_item(provider, executor, notifier, plan, &label, context_block, effort, Some(first_reason.as_str()), cancel).await;
                match retry {
                    Ok(final_text) => {
                        plan.mark_done(index);
                        plan.append_discovered(&final_text);
                        results.push(ImplementItemResult { index, label, failed: false, reason: None });
                    }
                    Err(ItemAttemptError::Canceled) => {
                        return Err(keenbench_error::EngineError::new(keenbench_error::ErrorCode::UserCanceled, "run canceled"));
                    }
                    Err(ItemAttemptError::Failed(second_reason)) => {
                        plan.mark_failed(index, &second_reason);
                        results.push(ImplementItemResult { index, label, failed: true, reason: Some(second_reason) });
                    }
                }
            }
        }
        state::write_plan(paths, &plan.render()).await?;
    }

    notifier.notify(WorkshopEvent::PhaseCompleted { phase: WorkshopPhase::Implement });
    Ok(results)
}

/// Why a single Implement attempt didn't produce a result.
enum ItemAttemptError {
    /// Phase-local failure (model error, empty response); eligible for retry.
    Failed(String),
    /// The run was canceled mid-attempt; never retried.
    Canceled,
}

/// Run one Implement attempt for a single item. An `Err` here distinguishes
/// a phase-local failure (eligible for one retry, `spec.md` §4.9: "On
/// failure: retry once with failure context injected") from a cancellation,
/// which is never retried.
async fn run_implement_item(
    provider: &dyn ProviderClient,
    executor: &dyn ToolExecutor,
    notifier: &dyn WorkshopNotifier,
    plan: &PlanDocument,
    item_label: &str,
    context_block: &str,
    effort: ReasoningEffort,
    failure_context: Option<&str>,
    cancel: &CancelToken,
) -> Result<String, ItemAttemptError> {
    let messages = vec![
        ChatMessage::system(implement_system_prompt(context_block, item_label, &plan.render(), failure_context)),
        ChatMessage::user(item_label),
    ];
    let outcome = run_agent_loop(
        provider,
        &implement_tools(),
        messages,
        effort,
        executor,
        notifier,
        WorkshopPhase::Implement.max_turns(),
        cancel,
    )
    .await
    .map_err(|e| {
        if e.code == keenbench_error::ErrorCode::UserCanceled {
            ItemAttemptError::Canceled
        } else {
            ItemAttemptError::Failed(e.message)
        }
    })?;

    if outcome.final_text.trim().is_empty() {
        return Err(ItemAttemptError::Failed("agent loop exhausted its turn budget without a final response".to_string()));
    }
    Ok(outcome.final_text)
}

async fn run_summary(
    provider: &dyn ProviderClient,
    notifier: &dyn WorkshopNotifier,
    plan: &PlanDocument,
    effort: ReasoningEffort,
    cancel: &CancelToken,
) -> Result<String, EngineError> {
    if cancel.is_canceled() {
        return Err(keenbench_error::EngineError::new(keenbench_error::ErrorCode::UserCanceled, "run canceled"));
    }

    notifier.notify(WorkshopEvent::PhaseStarted { phase: WorkshopPhase::Summary });
    let messages = vec![ChatMessage::system(summary_system_prompt(&plan.render()))];
    let profile = keenbench_provider::RequestProfile { reasoning_effort: effort, tool_choice: keenbench_provider::ToolChoice::None, is_first_tool_turn: true };

    let mut text = String::new();
    {
        let mut on_delta = |delta: &str| {
            text.push_str(delta);
            notifier.notify(WorkshopEvent::AssistantStreamDelta { text: delta.to_string() });
        };
        provider.stream_chat_with_tools(&messages, &[], &profile, &mut on_delta).await?;
    }

    if cancel.is_canceled() {
        return Err(keenbench_error::EngineError::new(keenbench_error::ErrorCode::UserCanceled, "run canceled"));
    }

    notifier.notify(WorkshopEvent::PhaseCompleted { phase: WorkshopPhase::Summary });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullNotifier;
    use crate::tool_exec::ToolOutcome;
    use async_trait::async_trait;
    use keenbench_provider::{ChatResult, DeltaSink, FinishReason, RequestProfile, ToolDef};
    use serde_json::Value;
    use std::sync::Mutex;

    struct ScriptedProvider {
        chat_turns: Mutex<Vec<ChatResult>>,
        stream_text: String,
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
            let mut turns = self.chat_turns.lock().unwrap();
            Ok(turns.remove(0))
        }

        async fn stream_chat_with_tools(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolDef],
            _profile: &RequestProfile,
            on_delta: &mut DeltaSink<'_>,
        ) -> Result<ChatResult, EngineError> {
            on_delta(&self.stream_text);
            Ok(ChatResult { content: self.stream_text.clone(), tool_calls: vec![], finish_reason: FinishReason::Stop })
        }
    }

    struct NoopExecutor;

    #[async_trait]
    impl ToolExecutor for NoopExecutor {
        async fn execute(&self, tool_name: &str, _arguments: &Value) -> Result<ToolOutcome, EngineError> {
            Ok(ToolOutcome::ok(format!("ran {tool_name}")))
        }
    }

    fn text_turn(content: &str) -> ChatResult {
        ChatResult { content: content.to_string(), tool_calls: vec![], finish_reason: FinishReason::Stop }
    }

    #[tokio::test]
    async fn full_cycle_with_no_plan_items_skips_implement() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let provider = ScriptedProvider {
            chat_turns: Mutex::new(vec![text_turn("nothing notable"), text_turn("Everything already looks fine.")]),
            stream_text: "All set, no changes were needed.".to_string(),
        };
        let executor = NoopExecutor;
        let efforts = PhaseEfforts {
            research: ReasoningEffort::Medium,
            plan: ReasoningEffort::Medium,
            implement: ReasoningEffort::Medium,
            summary: ReasoningEffort::Medium,
        };

        let outcome = run_cycle(&paths, &provider, &executor, &NullNotifier, "check the file", "", efforts, &CancelToken::new()).await.unwrap();
        assert!(outcome.plan.is_complete());
        assert!(outcome.implement_results.is_empty());
        assert_eq!(outcome.summary_text, "All set, no changes were needed.");
    }

    #[tokio::test]
    async fn cycle_runs_implement_items_and_marks_them_done() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let provider = ScriptedProvider {
            chat_turns: Mutex::new(vec![
                text_turn("research notes"),
                text_turn("- [ ] 1. Add totals row — sums column D"),
                text_turn("Added the totals row."),
            ]),
            stream_text: "Added a totals row to the spreadsheet.".to_string(),
        };
        let executor = NoopExecutor;
        let efforts = PhaseEfforts {
            research: ReasoningEffort::Medium,
            plan: ReasoningEffort::Medium,
            implement: ReasoningEffort::Medium,
            summary: ReasoningEffort::Medium,
        };

        let outcome = run_cycle(&paths, &provider, &executor, &NullNotifier, "add totals", "", efforts, &CancelToken::new()).await.unwrap();
        assert!(outcome.plan.is_complete());
        assert_eq!(outcome.implement_results.len(), 1);
        assert!(!outcome.implement_results[0].failed);
    }

    #[tokio::test]
    async fn a_canceled_token_stops_the_cycle_before_it_completes() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let provider = ScriptedProvider {
            chat_turns: Mutex::new(vec![text_turn("research notes")]),
            stream_text: String::new(),
        };
        let executor = NoopExecutor;
        let efforts = PhaseEfforts {
            research: ReasoningEffort::Medium,
            plan: ReasoningEffort::Medium,
            implement: ReasoningEffort::Medium,
            summary: ReasoningEffort::Medium,
        };
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = run_cycle(&paths, &provider, &executor, &NullNotifier, "add totals", "", efforts, &cancel).await.unwrap_err();
        assert_eq!(err.code, keenbench_error::ErrorCode::UserCanceled);
    }
}
