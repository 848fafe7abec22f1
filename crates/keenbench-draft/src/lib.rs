#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

/// Directory-tree copy and two-rename swap primitives.
pub mod atomic;
/// Checkpoint creation, listing, and restore.
pub mod checkpoint;
/// Lazy draft creation, proposal staging, and discard.
pub mod lifecycle;
/// Publish: checkpoint then atomic swap.
pub mod publish;
/// Startup crash recovery.
pub mod recovery;
/// Draft state derivation and `meta/draft.json` persistence.
pub mod state;

pub use atomic::{copy_tree, remove_if_exists, two_rename_swap};
pub use checkpoint::{create_checkpoint, list_checkpoints, restore_checkpoint, CheckpointMeta, CheckpointReason};
pub use lifecycle::{abort_staging, begin_staging, commit_staging, create_draft_if_needed, discard_draft, FileApplyOutcome, ProposalReport};
pub use publish::{publish, PublishResult};
pub use recovery::{recover_all, recover_workbench};
pub use state::{current_state, read_draft_info, remove_draft_info, write_draft_info, DraftInfo, DraftState};
