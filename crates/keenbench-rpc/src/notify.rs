//! Outbound notifications (`spec.md` §6: `WorkshopAssistantStreamDelta`,
//! `WorkshopAssistantMessageComplete`, `WorkshopToolExecuting`,
//! `WorkshopToolComplete`, `WorkshopPhaseStarted`, `WorkshopPhaseCompleted`,
//! `WorkshopImplementProgress`, `DraftStateChanged`, `ContextChanged`,
//! `EngineError`).
//!
//! Thin formatting layer over [`crate::output::OutputSink`]: producers call
//! [`NotificationSink::send`] synchronously (never awaiting stdout I/O
//! directly), which is what lets `keenbench-workshop`'s `WorkshopNotifier`
//! (a plain, non-async trait) and this transport compose without the
//! orchestrator blocking on a write.

use serde_json::Value;

use crate::message::RpcNotificationOut;
use crate::output::OutputSink;

/// A handle producers clone to emit outbound notifications.
#[derive(Clone)]
pub struct NotificationSink {
    output: OutputSink,
}

impl NotificationSink {
    /// Wrap an [`OutputSink`] for notification delivery.
    #[must_use]
    pub fn new(output: OutputSink) -> Self {
        Self { output }
    }

    /// Queue `method`/`params` for delivery. Never blocks.
    pub fn send(&self, method: impl Into<String>, params: Value) {
        let notification = RpcNotificationOut::new(method, params);
        match serde_json::to_string(&notification) {
            Ok(line) => self.output.send_line(line),
            Err(e) => tracing::error!(error = %e, "failed to serialize outbound notification"),
        }
    }
}
