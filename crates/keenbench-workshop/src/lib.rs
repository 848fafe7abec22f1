//! The RPI (Research-Plan-Implement) agent-loop orchestrator (`spec.md`
//! §4.9, C9).
//!
//! [`cycle::run_cycle`] is the entry point: it resets per-cycle scratch
//! state, runs Research and Plan once each, drives Implement item by item
//! with retry-then-fail semantics, and finishes with a single streamed
//! Summary call. The tool-calling loop itself ([`agent_loop::run_agent_loop`])
//! is shared across Research, Plan, and Implement.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

/// The shared tool-calling agent loop.
pub mod agent_loop;
/// Cooperative run cancellation.
pub mod cancel;
/// `meta/conversation.jsonl` persistence, undo, and regenerate lookups.
pub mod conversation;
/// Top-level RPI cycle orchestration.
pub mod cycle;
/// Workshop notifications.
pub mod events;
/// Focus-hint derivation and persistence.
pub mod focus;
/// Repeated-tool-call loop detection.
pub mod loop_detection;
/// The four RPI phases.
pub mod phase;
/// The Plan-phase checklist format.
pub mod plan;
/// Per-phase system prompts.
pub mod prompts;
/// `meta/workshop/_rpi/` persistence and reset.
pub mod state;
/// The tool-execution bridge.
pub mod tool_exec;
/// The model-facing tool catalog.
pub mod tools;
/// `meta/workshop_state.json` persistence.
pub mod workshop_state;

pub use agent_loop::{run_agent_loop, AgentLoopOutcome};
pub use cancel::CancelToken;
pub use cycle::{run_cycle, CycleOutcome, PhaseEfforts};
pub use events::{NullNotifier, WorkshopEvent, WorkshopNotifier};
pub use focus::FocusHint;
pub use loop_detection::{LoopGuard, LoopObservation, REPEAT_THRESHOLD};
pub use phase::WorkshopPhase;
pub use plan::{PlanDocument, PlanItem, PlanItemStatus};
pub use tool_exec::{ToolExecutor, ToolOutcome};
pub use workshop_state::{ChatMode, WorkshopState};

/// The outcome of a single Implement-phase item attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementItemResult {
    /// The plan index this result belongs to.
    pub index: u32,
    /// The item's label at the time it ran (pre-failure-suffix).
    pub label: String,
    /// Whether the item failed after a retry.
    pub failed: bool,
    /// The failure reason, if failed.
    pub reason: Option<String>,
}
