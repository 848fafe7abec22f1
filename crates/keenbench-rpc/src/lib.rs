//! The UI-facing JSON-RPC 2.0 stdio transport (`spec.md` §4.1, §6, C11).
//!
//! Distinct from `keenbench-toolworker`'s worker-facing protocol: this
//! crate is the server half the desktop UI dials into over stdin/stdout.
//! It knows the wire format and nothing about what any method means —
//! `keenbench-engine` supplies an [`RpcHandler`] that does the routing.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod codec;
mod handler;
mod message;
mod notify;
mod output;
mod server;

pub use handler::RpcHandler;
pub use message::{
    IncomingMessage, JsonRpcErrorObject, RpcNotificationIn, RpcNotificationOut, RpcRequest, RpcResponse, INVALID_REQUEST_CODE,
    METHOD_NOT_FOUND_CODE, SERVER_ERROR_CODE,
};
pub use notify::NotificationSink;
pub use output::OutputSink;
pub use server::serve;
