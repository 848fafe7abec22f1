//! Cooperative cancellation for a running RPI cycle (`spec.md` §5
//! "Cancellation and timeouts": "`WorkshopCancelRun` sets a per-task cancel
//! flag. The agent loop checks after every provider response and every
//! tool call").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply-cloneable cancel flag shared between the task running a cycle
/// and whatever handles `WorkshopCancelRun`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, not-yet-canceled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
