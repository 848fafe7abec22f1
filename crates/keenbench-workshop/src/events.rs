//! Workshop notifications (`spec.md` §4.9).
//!
//! These are plain data, decoupled from the JSON-RPC transport that
//! eventually forwards them to the UI: the caller supplies a
//! [`WorkshopNotifier`] implementation (typically a thin adapter over the
//! transport's notification sender).

use crate::phase::WorkshopPhase;

/// One notification emitted during an RPI cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkshopEvent {
    /// A phase began.
    PhaseStarted {
        /// The phase that started.
        phase: WorkshopPhase,
    },
    /// A phase finished (successfully or not).
    PhaseCompleted {
        /// The phase that finished.
        phase: WorkshopPhase,
    },
    /// Progress within the Implement phase's per-item outer loop.
    ImplementProgress {
        /// 1-based index of the item currently running.
        current: usize,
        /// Total pending items at the start of this implement pass.
        total: usize,
        /// The item's label, for display.
        label: String,
    },
    /// A tool call is about to execute.
    ToolExecuting {
        /// Name of the tool.
        tool_name: String,
        /// Correlates with the following [`WorkshopEvent::ToolComplete`].
        tool_call_id: String,
    },
    /// A tool call finished.
    ToolComplete {
        /// Name of the tool.
        tool_name: String,
        /// Correlates with the preceding [`WorkshopEvent::ToolExecuting`].
        tool_call_id: String,
        /// Whether the call succeeded.
        success: bool,
    },
    /// A text delta from the Summary phase's streaming call
    /// (`spec.md` §4.9: "only phase streaming WorkshopAssistantStreamDelta").
    AssistantStreamDelta {
        /// The delta text.
        text: String,
    },
}

/// Receives [`WorkshopEvent`]s as an RPI cycle runs.
pub trait WorkshopNotifier: Send + Sync {
    /// Handle one event. Must not block for long; forward to a channel if
    /// the transport write is itself async.
    fn notify(&self, event: WorkshopEvent);
}

/// A notifier that drops every event, for callers (mostly tests) that do
/// not need to observe progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl WorkshopNotifier for NullNotifier {
    fn notify(&self, _event: WorkshopEvent) {}
}
