//! Reading, appending to, and truncating a workbench's `meta/conversation.jsonl`
//! (`spec.md` §3 "Conversation log"), on top of the in-memory append/undo
//! semantics `keenbench_core::events::ConversationLog` already implements.
//!
//! `keenbench-draft::publish` has its own private append-only helper for the
//! two checkpoint event kinds it ever writes; this module is the public
//! counterpart Workshop needs for ordinary chat turns plus undo, which also
//! has to rewrite the file rather than only ever append to it.

use keenbench_core::events::{ConversationEvent, ConversationEventKind, ConversationLog};
use keenbench_error::{EngineError, ErrorCode};
use keenbench_workbench::WorkbenchPaths;
use uuid::Uuid;

/// Read every event currently persisted in `meta/conversation.jsonl`, in
/// file order. An absent file reads as an empty log.
pub async fn read_log(paths: &WorkbenchPaths) -> Result<ConversationLog, EngineError> {
    let raw = match tokio::fs::read_to_string(paths.conversation_jsonl()).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ConversationLog::default()),
        Err(e) => return Err(EngineError::new(ErrorCode::FileReadFailed, format!("reading conversation.jsonl failed: {e}"))),
    };
    let events = raw
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str::<ConversationEvent>(line)
                .map_err(|e| EngineError::new(ErrorCode::FileReadFailed, format!("parsing conversation.jsonl failed: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ConversationLog::from_events(events))
}

/// Append a single event to `meta/conversation.jsonl` and return it.
pub async fn append_event(paths: &WorkbenchPaths, kind: ConversationEventKind) -> Result<ConversationEvent, EngineError> {
    let event = ConversationEvent::new(Uuid::new_v4(), chrono::Utc::now(), kind);
    let line = serde_json::to_string(&event)
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("serializing conversation event failed: {e}")))?;

    tokio::fs::create_dir_all(paths.meta())
        .await
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("creating meta/ failed: {e}")))?;

    use std::io::Write as _;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths.conversation_jsonl())
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("opening conversation.jsonl failed: {e}")))?;
    writeln!(file, "{line}")
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("appending conversation.jsonl failed: {e}")))?;
    Ok(event)
}

/// Truncate the log at `message_id`, pushing a `system_note` tombstone
/// (`spec.md` §3 "the log is never rewritten except by an `undoTo(message_id)`
/// operation which truncates tail and pushes a system_note"), and rewrite
/// the file to match.
///
/// Returns the tombstone event. Fails with [`ErrorCode::NotFound`] if
/// `message_id` is not present in the log.
pub async fn undo_to(paths: &WorkbenchPaths, message_id: Uuid) -> Result<ConversationEvent, EngineError> {
    let mut log = read_log(paths).await?;
    let tombstone_id = Uuid::new_v4();
    if !log.undo_to(message_id, tombstone_id, chrono::Utc::now()) {
        return Err(EngineError::new(ErrorCode::NotFound, format!("no conversation event with id '{message_id}'")));
    }
    rewrite(paths, log.events()).await?;
    Ok(log.events().last().expect("undo_to always leaves a tombstone").clone())
}

/// The most recent `user_message` event, if any, for `WorkshopRegenerate`
/// to re-run the agent cycle against.
pub async fn last_user_message(paths: &WorkbenchPaths) -> Result<Option<ConversationEvent>, EngineError> {
    let log = read_log(paths).await?;
    Ok(log
        .events()
        .iter()
        .rev()
        .find(|e| matches!(e.kind, ConversationEventKind::UserMessage { .. }))
        .cloned())
}

async fn rewrite(paths: &WorkbenchPaths, events: &[ConversationEvent]) -> Result<(), EngineError> {
    let mut lines = String::new();
    for event in events {
        let line = serde_json::to_string(event)
            .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("serializing conversation event failed: {e}")))?;
        lines.push_str(&line);
        lines.push('\n');
    }
    tokio::fs::create_dir_all(paths.meta())
        .await
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("creating meta/ failed: {e}")))?;
    tokio::fs::write(paths.conversation_jsonl(), lines)
        .await
        .map_err(|e| EngineError::new(ErrorCode::FileWriteFailed, format!("rewriting conversation.jsonl failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_then_read_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        append_event(&paths, ConversationEventKind::UserMessage { text: "hi".into() }).await.unwrap();
        append_event(&paths, ConversationEventKind::AssistantMessage { text: "hello".into(), tool_calls: vec![] }).await.unwrap();

        let log = read_log(&paths).await.unwrap();
        assert_eq!(log.events().len(), 2);
    }

    #[tokio::test]
    async fn undo_to_truncates_file_and_appends_tombstone() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        let first = append_event(&paths, ConversationEventKind::UserMessage { text: "1".into() }).await.unwrap();
        append_event(&paths, ConversationEventKind::AssistantMessage { text: "a1".into(), tool_calls: vec![] }).await.unwrap();
        append_event(&paths, ConversationEventKind::UserMessage { text: "2".into() }).await.unwrap();

        let tombstone = undo_to(&paths, first.id).await.unwrap();
        assert!(matches!(tombstone.kind, ConversationEventKind::SystemNote { .. }));

        let log = read_log(&paths).await.unwrap();
        assert_eq!(log.events().len(), 1);
        assert!(matches!(log.events()[0].kind, ConversationEventKind::SystemNote { .. }));
    }

    #[tokio::test]
    async fn undo_to_unknown_id_fails_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        append_event(&paths, ConversationEventKind::UserMessage { text: "1".into() }).await.unwrap();
        let err = undo_to(&paths, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn last_user_message_finds_most_recent() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        append_event(&paths, ConversationEventKind::UserMessage { text: "first".into() }).await.unwrap();
        append_event(&paths, ConversationEventKind::AssistantMessage { text: "a1".into(), tool_calls: vec![] }).await.unwrap();
        append_event(&paths, ConversationEventKind::UserMessage { text: "second".into() }).await.unwrap();

        let found = last_user_message(&paths).await.unwrap().unwrap();
        assert!(matches!(found.kind, ConversationEventKind::UserMessage { text } if text == "second"));
    }

    #[tokio::test]
    async fn last_user_message_is_none_for_empty_log() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = WorkbenchPaths::new(tmp.path());
        assert!(last_user_message(&paths).await.unwrap().is_none());
    }
}
