//! Cross-component integration tests driven through `EngineHandler::handle`
//! directly — the same dispatch path `keenbench_rpc::serve` calls into, just
//! without the line-based stdio framing, so a test can thread a dynamically
//! assigned `workbench_id` from one response into the next request.

use std::sync::Arc;

use keenbench_engine::{AppState, EngineHandler};
use keenbench_error::ErrorCode;
use keenbench_rpc::RpcHandler;
use serde_json::{json, Value};

/// Build process state rooted at a fresh tempdir, with a notification sink
/// installed (required before any handler that calls `notifications()`)
/// but no request loop actually reading anything.
async fn test_handler() -> (Arc<EngineHandler>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::new(tmp.path().join("data"), "keenbench-tool-worker-missing").unwrap());
    let handler = Arc::new(EngineHandler::new(Arc::clone(&state)));
    let rpc_handler: Arc<dyn RpcHandler> = handler.clone();
    let (sink, loop_future) = keenbench_rpc::serve(tokio::io::empty(), tokio::io::sink(), rpc_handler);
    state.install_notifications(sink);
    tokio::spawn(loop_future);
    (handler, tmp)
}

async fn call(handler: &EngineHandler, method: &str, params: Value) -> Result<Value, keenbench_error::EngineError> {
    handler.handle(method, params).await
}

async fn create_workbench(handler: &EngineHandler, display_name: &str) -> String {
    let result = call(handler, "WorkbenchCreate", json!({"display_name": display_name})).await.unwrap();
    result["workbench"]["id"].as_str().unwrap().to_string()
}

fn write_source_file(dir: &std::path::Path, name: &str, contents: &[u8]) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

// Scenario 1 (spec.md §8): Draft->Publish over a text file. The agent's own
// write into draft/ is simulated directly (no network model call); the RPC
// surface carries everything else: change-set enumeration, publish, and
// the post-publish manifest rebuild.
#[tokio::test]
async fn draft_publish_round_trips_published_and_leaves_other_files_untouched() {
    let (handler, tmp) = test_handler().await;
    let workbench_id = create_workbench(&handler, "notes project").await;

    let sources_dir = tmp.path().join("sources");
    std::fs::create_dir_all(&sources_dir).unwrap();
    let notes = write_source_file(&sources_dir, "notes.txt", b"hello\n");
    let data = write_source_file(&sources_dir, "data.csv", b"a,b\n1,2\n");

    let add = call(&handler, "FilesAdd", json!({"workbench_id": workbench_id, "source_paths": [notes, data]})).await.unwrap();
    assert_eq!(add["results"].as_array().unwrap().len(), 2);

    let paths = keenbench_workbench::WorkbenchPaths::new(tmp.path().join("data").join("workbenches").join(&workbench_id));

    assert!(keenbench_draft::create_draft_if_needed(&paths, "workshop_run").unwrap().is_some());
    std::fs::write(paths.draft().join("summary.md"), b"# Summary\n\nnotes.txt, data.csv\n").unwrap();

    let change_set = call(&handler, "ReviewGetChangeSet", json!({"workbench_id": workbench_id})).await.unwrap();
    let items = change_set["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    let summary_item = items.iter().find(|i| i["path"] == "summary.md").unwrap();
    assert_eq!(summary_item["change_type"], "added");
    assert_eq!(summary_item["file_kind"], "text");
    assert_eq!(summary_item["preview_kind"], "diff");

    // Universal invariant: meta/draft.json exists iff draft/ exists.
    assert!(paths.draft_json().exists());
    assert!(paths.draft().exists());

    call(&handler, "DraftPublish", json!({"workbench_id": workbench_id})).await.unwrap();

    assert!(!paths.draft_json().exists());
    assert!(!paths.draft().exists());

    let reopened = call(&handler, "WorkbenchOpen", json!({"workbench_id": workbench_id})).await.unwrap();
    assert_eq!(reopened["draft_state"], "idle");
    let manifest_paths: Vec<&str> = reopened["manifest"]["entries"].as_array().unwrap().iter().map(|e| e["path"].as_str().unwrap()).collect();
    assert!(manifest_paths.contains(&"summary.md"));
    assert!(manifest_paths.contains(&"notes.txt"));
    assert!(manifest_paths.contains(&"data.csv"));

    let summary_body = std::fs::read_to_string(paths.published().join("summary.md")).unwrap();
    assert!(!summary_body.is_empty());
    assert_eq!(std::fs::read_to_string(paths.published().join("notes.txt")).unwrap(), "hello\n");
    assert_eq!(std::fs::read_to_string(paths.published().join("data.csv")).unwrap(), "a,b\n1,2\n");
}

// Scenario 2 (spec.md §8): consent gating tracks a scope hash over the
// manifest and invalidates on any manifest change.
#[tokio::test]
async fn consent_gate_requires_and_invalidates_on_scope_change() {
    let (handler, tmp) = test_handler().await;
    let workbench_id = create_workbench(&handler, "consent project").await;

    let sources_dir = tmp.path().join("sources");
    std::fs::create_dir_all(&sources_dir).unwrap();
    let notes = write_source_file(&sources_dir, "notes.txt", b"hello\n");
    let data = write_source_file(&sources_dir, "data.csv", b"a,b\n1,2\n");
    call(&handler, "FilesAdd", json!({"workbench_id": workbench_id, "source_paths": [notes, data]})).await.unwrap();

    call(&handler, "ProviderSetApiKey", json!({"provider_id": "openai", "api_key": "sk-test"})).await.unwrap();
    call(&handler, "ProviderSetEnabled", json!({"provider_id": "openai", "enabled": true})).await.unwrap();

    let first_err = call(&handler, "ConsentCheck", json!({"workbench_id": workbench_id, "model_id": "openai:gpt-4.1"})).await.unwrap_err();
    assert_eq!(first_err.code, ErrorCode::EgressConsentRequired);
    let first_scope_hash = first_err.scope_hash.clone().unwrap();

    call(&handler, "ConsentGrant", json!({"workbench_id": workbench_id, "model_id": "openai:gpt-4.1", "persist": false})).await.unwrap();
    call(&handler, "ConsentCheck", json!({"workbench_id": workbench_id, "model_id": "openai:gpt-4.1"})).await.unwrap();

    let more_dir = tmp.path().join("more");
    std::fs::create_dir_all(&more_dir).unwrap();
    let more = write_source_file(&more_dir, "more.txt", b"extra\n");
    call(&handler, "FilesAdd", json!({"workbench_id": workbench_id, "source_paths": [more]})).await.unwrap();

    let second_err = call(&handler, "ConsentCheck", json!({"workbench_id": workbench_id, "model_id": "openai:gpt-4.1"})).await.unwrap_err();
    assert_eq!(second_err.code, ErrorCode::EgressConsentRequired);
    assert_ne!(second_err.scope_hash.unwrap(), first_scope_hash);
}

// Boundary behaviors (spec.md §8): a batch over the v1 limit is rejected
// outright; an oversize file is skipped rather than failing its batch.
#[tokio::test]
async fn files_add_enforces_batch_and_size_limits() {
    let (handler, tmp) = test_handler().await;
    let workbench_id = create_workbench(&handler, "limits project").await;

    let sources_dir = tmp.path().join("sources");
    std::fs::create_dir_all(&sources_dir).unwrap();
    let eleven: Vec<String> = (0..11).map(|i| write_source_file(&sources_dir, &format!("f{i}.txt"), b"x")).collect();
    let err = call(&handler, "FilesAdd", json!({"workbench_id": workbench_id, "source_paths": eleven})).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationFailed);

    let oversize_path = sources_dir.join("huge.bin");
    let file = std::fs::File::create(&oversize_path).unwrap();
    file.set_len(26 * 1024 * 1024).unwrap();
    let small = write_source_file(&sources_dir, "small.txt", b"ok");

    let oversize = oversize_path.to_string_lossy().into_owned();
    let result = call(&handler, "FilesAdd", json!({"workbench_id": workbench_id, "source_paths": [oversize, small]})).await.unwrap();
    let results = result["results"].as_array().unwrap();
    let huge_result = results.iter().find(|r| r["filename"] == "huge.bin").unwrap();
    assert!(huge_result["status"].get("skipped").is_some());
    let small_result = results.iter().find(|r| r["filename"] == "small.txt").unwrap();
    assert_eq!(small_result["status"], "added");
}

// Round-trip invariant (spec.md §8): CheckpointCreate then CheckpointRestore
// returns published/ byte-equivalent to the pre-restore snapshot, and the
// manifest rebuild keeps meta/files.json in sync afterward too.
#[tokio::test]
async fn checkpoint_create_then_restore_round_trips_published_and_manifest() {
    let (handler, tmp) = test_handler().await;
    let workbench_id = create_workbench(&handler, "checkpoint project").await;

    let sources_dir = tmp.path().join("sources");
    std::fs::create_dir_all(&sources_dir).unwrap();
    let notes = write_source_file(&sources_dir, "notes.txt", b"version one\n");
    call(&handler, "FilesAdd", json!({"workbench_id": workbench_id, "source_paths": [notes]})).await.unwrap();

    let checkpoint = call(&handler, "CheckpointsCreate", json!({"workbench_id": workbench_id, "description": "before edit"})).await.unwrap();
    let checkpoint_id = checkpoint["id"].as_str().unwrap().to_string();

    let paths = keenbench_workbench::WorkbenchPaths::new(tmp.path().join("data").join("workbenches").join(&workbench_id));
    keenbench_draft::create_draft_if_needed(&paths, "workshop_run").unwrap();
    std::fs::write(paths.draft().join("notes.txt"), b"version two\n").unwrap();
    call(&handler, "DraftPublish", json!({"workbench_id": workbench_id})).await.unwrap();
    assert_eq!(std::fs::read_to_string(paths.published().join("notes.txt")).unwrap(), "version two\n");

    call(&handler, "CheckpointsRestore", json!({"workbench_id": workbench_id, "checkpoint_id": checkpoint_id})).await.unwrap();
    assert_eq!(std::fs::read_to_string(paths.published().join("notes.txt")).unwrap(), "version one\n");

    let manifest = keenbench_workbench::manifest_store::load_or_migrate(&paths.meta()).unwrap();
    assert_eq!(manifest.len(), 1);
    assert!(manifest.get("notes.txt").is_some());
}

#[tokio::test]
async fn unknown_method_is_rejected_as_validation_failed() {
    let (handler, _tmp) = test_handler().await;
    let err = call(&handler, "NotARealMethod", json!({})).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationFailed);
}
