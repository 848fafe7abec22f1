//! Translates [`WorkshopEvent`]/[`ContextEvent`] into outbound JSON-RPC
//! notifications (`spec.md` §6). Both adapters are thin: one event in, one
//! `NotificationSink::send` call out, scoped to a single workbench id so
//! the UI can route notifications to the right view.

use keenbench_context::{ContextEvent, ContextNotifier};
use keenbench_rpc::NotificationSink;
use keenbench_workshop::{WorkshopEvent, WorkshopNotifier};
use serde_json::json;

/// Forwards [`WorkshopEvent`]s for one workbench onto the shared
/// notification sink, naming each method per `spec.md` §6's notification
/// surface.
pub struct WorkshopNotifierBridge {
    sink: NotificationSink,
    workbench_id: String,
}

impl WorkshopNotifierBridge {
    /// Build a bridge that tags every notification with `workbench_id`.
    #[must_use]
    pub fn new(sink: NotificationSink, workbench_id: String) -> Self {
        Self { sink, workbench_id }
    }
}

impl WorkshopNotifier for WorkshopNotifierBridge {
    fn notify(&self, event: WorkshopEvent) {
        let wb = &self.workbench_id;
        match event {
            WorkshopEvent::PhaseStarted { phase } => {
                self.sink.send("WorkshopPhaseStarted", json!({"workbench_id": wb, "phase": phase.as_str()}));
            }
            WorkshopEvent::PhaseCompleted { phase } => {
                self.sink.send("WorkshopPhaseCompleted", json!({"workbench_id": wb, "phase": phase.as_str()}));
            }
            WorkshopEvent::ImplementProgress { current, total, label } => {
                self.sink.send(
                    "WorkshopImplementProgress",
                    json!({"workbench_id": wb, "current": current, "total": total, "label": label}),
                );
            }
            WorkshopEvent::ToolExecuting { tool_name, tool_call_id } => {
                self.sink.send(
                    "WorkshopToolExecuting",
                    json!({"workbench_id": wb, "tool_name": tool_name, "tool_call_id": tool_call_id}),
                );
            }
            WorkshopEvent::ToolComplete { tool_name, tool_call_id, success } => {
                self.sink.send(
                    "WorkshopToolComplete",
                    json!({"workbench_id": wb, "tool_name": tool_name, "tool_call_id": tool_call_id, "success": success}),
                );
            }
            WorkshopEvent::AssistantStreamDelta { text } => {
                self.sink.send("WorkshopAssistantStreamDelta", json!({"workbench_id": wb, "text": text}));
            }
        }
    }
}

/// Forwards [`ContextEvent`]s for one workbench onto the shared
/// notification sink.
pub struct ContextNotifierBridge {
    sink: NotificationSink,
    workbench_id: String,
}

impl ContextNotifierBridge {
    /// Build a bridge that tags every notification with `workbench_id`.
    #[must_use]
    pub fn new(sink: NotificationSink, workbench_id: String) -> Self {
        Self { sink, workbench_id }
    }
}

impl ContextNotifier for ContextNotifierBridge {
    fn notify(&self, event: ContextEvent) {
        let wb = &self.workbench_id;
        match event {
            ContextEvent::StyleMergeFailed { file_kind } => {
                self.sink.send(
                    "EngineError",
                    json!({
                        "workbench_id": wb,
                        "error_code": "STYLE_MERGE_FAILED",
                        "message": format!("could not merge the document-style skill with the bundled {file_kind:?} style guidance"),
                    }),
                );
            }
            ContextEvent::ContextChanged { category } => {
                self.sink.send("ContextChanged", json!({"workbench_id": wb, "category": category.dir_name()}));
            }
        }
    }
}

/// Emit `DraftStateChanged` for `workbench_id`.
pub fn notify_draft_state_changed(sink: &NotificationSink, workbench_id: &str, has_draft: bool) {
    sink.send("DraftStateChanged", json!({"workbench_id": workbench_id, "has_draft": has_draft}));
}
