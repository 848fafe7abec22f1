//! The Clutter estimator (`spec.md` §4.11: "computes a token-weight signal
//! from files + conversation tail + context items and emits a level ∈
//! {light, medium, heavy} plus `context_warning=true` when context items
//! exceed ≈35% of the budget").

use keenbench_error::EngineError;
use keenbench_workbench::WorkbenchPaths;

use crate::store;
use crate::types::{ClutterLevel, ClutterReport};

/// No tokenizer is wired in anywhere in this codebase; 4 characters per
/// token is the standard rough estimate used across the industry for
/// English prose and is accurate enough for a bucketed warning signal.
const CHARS_PER_TOKEN: usize = 4;

/// Fraction of `budget_tokens` above which context items alone trigger
/// `context_warning`.
const WARNING_FRACTION: f64 = 0.35;

fn estimate_tokens(text: &str) -> u64 {
    (text.len() / CHARS_PER_TOKEN) as u64
}

/// Estimate the Clutter signal for a phase about to run, given the text
/// that will make up the files section and the conversation tail.
pub fn estimate(
    paths: &WorkbenchPaths,
    files_text: &str,
    conversation_tail_text: &str,
    budget_tokens: u64,
) -> Result<ClutterReport, EngineError> {
    let mut context_tokens = 0u64;
    for category in crate::types::Category::all() {
        if let Some(artifact) = store::get(paths, category)? {
            context_tokens += estimate_tokens(&artifact.body);
            if let Some(fm) = &artifact.frontmatter {
                context_tokens += estimate_tokens(&fm.name) + estimate_tokens(&fm.description);
            }
        }
    }

    let files_tokens = estimate_tokens(files_text);
    let tail_tokens = estimate_tokens(conversation_tail_text);
    let total_tokens = files_tokens + tail_tokens + context_tokens;

    let context_warning = budget_tokens > 0 && (context_tokens as f64) > (budget_tokens as f64) * WARNING_FRACTION;

    let ratio = if budget_tokens == 0 { 0.0 } else { total_tokens as f64 / budget_tokens as f64 };
    let level = if ratio < 0.5 {
        ClutterLevel::Light
    } else if ratio < 0.8 {
        ClutterLevel::Medium
    } else {
        ClutterLevel::Heavy
    };

    Ok(ClutterReport { level, context_tokens, total_tokens, context_warning })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_workbench_is_light_with_no_warning() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let report = estimate(&paths, "", "", 10_000).unwrap();
        assert_eq!(report.level, ClutterLevel::Light);
        assert!(!report.context_warning);
    }

    #[test]
    fn large_context_item_trips_the_warning() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let huge = "x".repeat(20_000);
        store::update_direct(&paths, crate::types::Category::Situation, &huge, false).unwrap();
        let report = estimate(&paths, "", "", 10_000).unwrap();
        assert!(report.context_warning);
    }

    #[test]
    fn heavy_total_usage_is_bucketed_heavy() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let files_text = "x".repeat(40_000);
        let report = estimate(&paths, &files_text, "", 10_000).unwrap();
        assert_eq!(report.level, ClutterLevel::Heavy);
    }

    #[test]
    fn zero_budget_never_warns() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let report = estimate(&paths, "x", "x", 0).unwrap();
        assert!(!report.context_warning);
        assert_eq!(report.level, ClutterLevel::Light);
    }
}
