//! Conversation log events (`spec.md` §3 "Conversation log").
//!
//! The conversation log is an append-only JSONL file; the only exception is
//! [`ConversationLog::undo_to`], which truncates the tail and records a
//! tombstone `system_note` (the strategy this implementation picked for the
//! Open Question in `spec.md` §9).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single tool call as recorded alongside an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolCallRecord {
    /// Correlates with the subsequent `tool_result` event.
    pub tool_call_id: String,
    /// Name of the tool invoked.
    pub tool_name: String,
    /// Arguments passed to the tool, as a JSON string (the wire shape tool
    /// calls arrive in before argument normalization; see `spec.md` §4.8).
    pub arguments_json: String,
}

/// The payload carried by a [`ConversationEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationEventKind {
    /// A message typed by the user.
    UserMessage {
        /// Message text.
        text: String,
    },
    /// A message produced by the assistant, optionally requesting tool calls.
    AssistantMessage {
        /// Message text (may be empty when only tool calls are present).
        text: String,
        /// Tool calls requested by this message, if any.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRecord>,
    },
    /// The result of executing a tool call.
    ToolResult {
        /// Correlates with the originating [`ToolCallRecord::tool_call_id`].
        tool_call_id: String,
        /// Name of the tool that was executed.
        tool_name: String,
        /// Whether the tool call succeeded.
        success: bool,
        /// Tool output (or error message on failure).
        content: String,
    },
    /// A Draft was published, creating a checkpoint.
    PublishCheckpoint {
        /// Id of the checkpoint created by the publish.
        checkpoint_id: String,
    },
    /// A checkpoint was restored.
    RestoreCheckpoint {
        /// Id of the checkpoint that was restored.
        checkpoint_id: String,
    },
    /// An engine-authored note (e.g. an undo tombstone).
    SystemNote {
        /// Note text.
        text: String,
    },
}

/// A single entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConversationEvent {
    /// Stable id for this event.
    pub id: Uuid,
    /// Wall-clock time the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    #[serde(flatten)]
    pub kind: ConversationEventKind,
}

impl ConversationEvent {
    /// Construct an event with the given kind, timestamped `now`.
    ///
    /// Callers supply `now` explicitly (rather than calling `Utc::now()`
    /// here) so that event construction stays deterministic under test.
    #[must_use]
    pub fn new(id: Uuid, now: DateTime<Utc>, kind: ConversationEventKind) -> Self {
        Self {
            id,
            timestamp: now,
            kind,
        }
    }
}

/// An in-memory view over a workbench's append-only conversation log.
///
/// Persistence (reading/writing the JSONL file) is the caller's
/// responsibility; this type only implements the append/truncate
/// semantics so they can be unit-tested without touching the filesystem.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    events: Vec<ConversationEvent>,
}

impl ConversationLog {
    /// Build a log from previously-persisted events, in file order.
    #[must_use]
    pub fn from_events(events: Vec<ConversationEvent>) -> Self {
        Self { events }
    }

    /// Append an event.
    pub fn append(&mut self, event: ConversationEvent) {
        self.events.push(event);
    }

    /// All events in log order.
    #[must_use]
    pub fn events(&self) -> &[ConversationEvent] {
        &self.events
    }

    /// Truncate the log so that `message_id` and everything after it is
    /// removed, then append a tombstone `system_note` recording the undo
    /// (`spec.md` §3 "undoTo(message_id)", §9 Open Question).
    ///
    /// Returns `false` without modifying the log if `message_id` is not
    /// present.
    pub fn undo_to(&mut self, message_id: Uuid, tombstone_id: Uuid, now: DateTime<Utc>) -> bool {
        let Some(idx) = self.events.iter().position(|e| e.id == message_id) else {
            return false;
        };
        self.events.truncate(idx);
        self.events.push(ConversationEvent::new(
            tombstone_id,
            now,
            ConversationEventKind::SystemNote {
                text: format!("conversation truncated at message {message_id}"),
            },
        ));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: Uuid, kind: ConversationEventKind) -> ConversationEvent {
        ConversationEvent::new(id, Utc::now(), kind)
    }

    #[test]
    fn append_preserves_order() {
        let mut log = ConversationLog::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        log.append(event(
            a,
            ConversationEventKind::UserMessage { text: "hi".into() },
        ));
        log.append(event(
            b,
            ConversationEventKind::SystemNote { text: "note".into() },
        ));
        assert_eq!(log.events().len(), 2);
        assert_eq!(log.events()[0].id, a);
        assert_eq!(log.events()[1].id, b);
    }

    #[test]
    fn undo_to_truncates_and_appends_tombstone() {
        let mut log = ConversationLog::default();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        log.append(event(
            first,
            ConversationEventKind::UserMessage { text: "1".into() },
        ));
        log.append(event(
            second,
            ConversationEventKind::UserMessage { text: "2".into() },
        ));

        let tombstone = Uuid::new_v4();
        let ok = log.undo_to(second, tombstone, Utc::now());
        assert!(ok);
        assert_eq!(log.events().len(), 2);
        assert_eq!(log.events()[0].id, first);
        assert_eq!(log.events()[1].id, tombstone);
        assert!(matches!(
            log.events()[1].kind,
            ConversationEventKind::SystemNote { .. }
        ));
    }

    #[test]
    fn undo_to_unknown_id_is_noop() {
        let mut log = ConversationLog::default();
        log.append(event(
            Uuid::new_v4(),
            ConversationEventKind::UserMessage { text: "1".into() },
        ));
        let before = log.events().len();
        let ok = log.undo_to(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        assert!(!ok);
        assert_eq!(log.events().len(), before);
    }

    #[test]
    fn event_kind_json_tag_shape() {
        let kind = ConversationEventKind::ToolResult {
            tool_call_id: "tc1".into(),
            tool_name: "read_file".into(),
            success: true,
            content: "ok".into(),
        };
        let v = serde_json::to_value(&kind).unwrap();
        assert_eq!(v["kind"], "tool_result");
        assert_eq!(v["tool_call_id"], "tc1");
    }

    #[test]
    fn assistant_message_omits_empty_tool_calls() {
        let kind = ConversationEventKind::AssistantMessage {
            text: "done".into(),
            tool_calls: vec![],
        };
        let v = serde_json::to_value(&kind).unwrap();
        assert!(v.get("tool_calls").is_none());
    }
}
