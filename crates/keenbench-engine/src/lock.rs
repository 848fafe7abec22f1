//! Per-workbench lock classes (`spec.md` §5 "Concurrency & resource
//! model"): mutation operations are Exclusive, read operations are Shared,
//! and acquisition never blocks — a conflicting acquire fails immediately
//! with `BUSY` rather than queuing.
//!
//! Grounded on the teacher's `abp-workspace::lock` reader/writer-count
//! guard, simplified here to the two-state shape the contract actually
//! needs: any number of concurrent Shared holders, or exactly one
//! Exclusive holder with nothing else active.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use keenbench_error::{EngineError, ErrorCode};

#[derive(Debug, Default)]
struct LockState {
    exclusive: bool,
    shared_count: u32,
}

/// One workbench's lock state.
#[derive(Debug, Default)]
struct WorkbenchLock {
    state: Mutex<LockState>,
}

/// Released by dropping it; callers hold this for the duration of the
/// locked section.
pub struct LockGuard {
    lock: Arc<WorkbenchLock>,
    exclusive: bool,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let mut state = self.lock.state.lock().unwrap();
        if self.exclusive {
            state.exclusive = false;
        } else {
            state.shared_count = state.shared_count.saturating_sub(1);
        }
    }
}

/// Registry of per-workbench locks, keyed by workbench id. A workbench's
/// lock is created lazily on first use and lives for the process lifetime
/// (v1 has no workbench-count bound large enough to make that wasteful).
#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<WorkbenchLock>>>,
}

impl LockRegistry {
    /// Build an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, workbench_id: &str) -> Arc<WorkbenchLock> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(workbench_id.to_string())
            .or_insert_with(|| Arc::new(WorkbenchLock::default()))
            .clone()
    }

    /// Acquire the Exclusive lock for `workbench_id`, used by every
    /// mutation in `spec.md` §5's Exclusive set (add, remove, delete,
    /// apply_proposal, publish, discard, restore_checkpoint, run_agent,
    /// set_context, process_context, delete_context).
    ///
    /// Fails immediately with `BUSY` if any Shared or Exclusive holder is
    /// already active — mutation tasks must never await another mutation
    /// on the same workbench, so there is no queuing here.
    pub fn acquire_exclusive(&self, workbench_id: &str) -> Result<LockGuard, EngineError> {
        let lock = self.lock_for(workbench_id);
        {
            let mut state = lock.state.lock().unwrap();
            if state.exclusive || state.shared_count > 0 {
                return Err(busy(workbench_id));
            }
            state.exclusive = true;
        }
        Ok(LockGuard { lock, exclusive: true })
    }

    /// Acquire a Shared lock for `workbench_id`, used by every read in
    /// `spec.md` §5's Shared set (list, read metadata, get change set, get
    /// diff, preview). Any number of Shared holders may be active at once;
    /// fails with `BUSY` only if an Exclusive holder currently owns it.
    pub fn acquire_shared(&self, workbench_id: &str) -> Result<LockGuard, EngineError> {
        let lock = self.lock_for(workbench_id);
        {
            let mut state = lock.state.lock().unwrap();
            if state.exclusive {
                return Err(busy(workbench_id));
            }
            state.shared_count += 1;
        }
        Ok(LockGuard { lock, exclusive: false })
    }
}

fn busy(workbench_id: &str) -> EngineError {
    EngineError::new(ErrorCode::Busy, format!("workbench '{workbench_id}' is busy"))
}
