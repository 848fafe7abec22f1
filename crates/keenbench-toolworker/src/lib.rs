// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Tool-worker stdio process wrapper.
pub mod process;
/// Request/response wire shapes and method builders.
pub mod protocol;
/// Fixed 1s/2s/4s restart-backoff policy.
pub mod restart;
/// The supervisor tying process, protocol, and restart policy together.
pub mod supervisor;

pub use process::{ProcessError, WorkerProcess};
pub use protocol::{
    apply_ops_request, extract_text_request, get_info_request, get_map_request,
    image_get_metadata_request, read_file_request, render_request, ApplyOpsKind, ExtractKind,
    MapKind, ReadFileSelectors, RenderKind, WorkerRequest, WorkerResponse, WorkerRoot,
};
pub use restart::{RestartPolicy, RESTART_DELAYS};
pub use supervisor::{ToolWorkerSupervisor, DEFAULT_TIMEOUT, RENDER_TIMEOUT};
