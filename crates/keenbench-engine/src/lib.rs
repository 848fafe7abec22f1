#![deny(unsafe_code)]
//! Library surface for the `keenbench-engine` binary, split out the way
//! the teacher's own `abp-daemon` splits `lib.rs`/`main.rs`: `main.rs`
//! stays a thin CLI/env shell, while every RPC-handling type lives here so
//! integration tests can build an [`AppState`]/[`EngineHandler`] directly
//! and drive them through [`keenbench_rpc::serve`] without spawning the
//! compiled binary.

pub mod handler;
mod lock;
mod notify_bridge;
mod state;
mod tool_bridge;

pub use handler::EngineHandler;
pub use state::AppState;
