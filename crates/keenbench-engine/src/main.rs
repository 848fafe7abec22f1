#![deny(unsafe_code)]
//! The `keenbench-engine` process entry point: one JSON-RPC server over
//! stdin/stdout, per `spec.md` §4.1 ("one process, launched per-user-session
//! by the desktop shell, speaking newline-delimited JSON-RPC over stdio").

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use keenbench_engine::{AppState, EngineHandler};
use keenbench_rpc::RpcHandler;

/// The KeenBench local orchestration engine.
#[derive(Parser, Debug)]
#[command(name = "keenbench-engine", version, about = "Local JSON-RPC orchestration engine for KeenBench")]
struct Args {
    /// Root directory for workbenches, settings, and encrypted secrets.
    /// Falls back to `KEENBENCH_DATA_DIR`, then a platform data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Path to the tool-worker subprocess binary. Falls back to
    /// `KEENBENCH_TOOL_WORKER_PATH`.
    #[arg(long)]
    tool_worker_path: Option<String>,

    /// Path to a `.env` file to load before reading other environment
    /// variables. Falls back to `KEENBENCH_ENV_PATH`; if unset, `.env` in
    /// the current directory is loaded when present.
    #[arg(long)]
    env_path: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(long)]
    debug: bool,
}

fn load_env(env_path: Option<PathBuf>) {
    let path = env_path.or_else(|| std::env::var_os("KEENBENCH_ENV_PATH").map(PathBuf::from));
    match path {
        Some(path) => {
            let _ = dotenvy::from_path(path);
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }
}

fn resolve_data_dir(arg: Option<PathBuf>) -> PathBuf {
    if let Some(path) = arg {
        return path;
    }
    if let Some(path) = std::env::var_os("KEENBENCH_DATA_DIR") {
        return PathBuf::from(path);
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".keenbench")).unwrap_or_else(|| PathBuf::from(".keenbench"))
}

fn resolve_tool_worker_path(arg: Option<String>) -> String {
    arg.or_else(|| std::env::var("KEENBENCH_TOOL_WORKER_PATH").ok())
        .unwrap_or_else(|| "keenbench-tool-worker".to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    load_env(args.env_path.clone());

    let filter = if args.debug || std::env::var_os("KEENBENCH_DEBUG").is_some() {
        EnvFilter::new("keenbench=debug")
    } else {
        EnvFilter::new("keenbench=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let data_dir = resolve_data_dir(args.data_dir);
    let tool_worker_path = resolve_tool_worker_path(args.tool_worker_path);

    let state = Arc::new(AppState::new(data_dir.clone(), tool_worker_path)?);

    if let Err(e) = keenbench_draft::recover_all(&state.workbenches_root()) {
        tracing::error!(error = %e, "startup crash recovery failed; continuing with whatever state is on disk");
    }

    tracing::info!(data_dir = %data_dir.display(), "keenbench-engine starting");

    let handler: Arc<dyn RpcHandler> = Arc::new(EngineHandler::new(Arc::clone(&state)));
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (sink, loop_future) = keenbench_rpc::serve(stdin, stdout, handler);
    state.install_notifications(sink);
    loop_future.await;

    tracing::info!("keenbench-engine exiting");
    Ok(())
}
