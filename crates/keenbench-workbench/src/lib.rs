// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Add/remove/extract file operations.
pub mod files;
/// `files.json` load, v1→v2 migration, and atomic persistence.
pub mod manifest_store;
/// Per-workbench directory layout.
pub mod paths;
/// Flat-filename path containment checks.
pub mod sandbox;
/// Workbench create/open/list/fork/delete.
pub mod workbench;

pub use files::{add_files, extract_files, remove_files, AddFileResult, AddFileStatus, SkipReason};
pub use paths::WorkbenchPaths;
pub use sandbox::resolve_flat_child;
pub use workbench::{ForkMode, WorkbenchHandle, WorkbenchManager, WorkbenchMeta, WorkbenchSummary};
