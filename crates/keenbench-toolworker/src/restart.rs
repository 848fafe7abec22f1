//! Fixed-backoff restart policy for the tool-worker subprocess.
//!
//! `spec.md` §4.4: "on crash or non-responsive write, restart up to 3 times
//! with delays 1s, 2s, 4s. After exhaustion, all in-flight and future
//! requests return `TOOL_WORKER_UNAVAILABLE` until process restart."
//!
//! This is a fixed-sequence variant of `abp-host::retry`'s exponential
//! backoff: the delay table is explicit rather than computed, and there is
//! no jitter or overall wall-clock timeout — only a consecutive-failure
//! counter that resets on the worker's first success after a restart.

use std::time::Duration;

/// The three backoff delays applied between restart attempts, in order.
pub const RESTART_DELAYS: [Duration; 3] =
    [Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)];

/// Tracks consecutive tool-worker crashes and decides whether another
/// restart attempt is permitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestartPolicy {
    consecutive_crashes: u32,
}

impl RestartPolicy {
    /// A fresh policy with no recorded crashes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a crash. Returns the backoff delay to wait before the next
    /// spawn attempt, or `None` if restarts are exhausted (three
    /// consecutive crashes with no intervening success).
    pub fn record_crash(&mut self) -> Option<Duration> {
        let delay = RESTART_DELAYS.get(self.consecutive_crashes as usize).copied();
        self.consecutive_crashes += 1;
        delay
    }

    /// `true` once three consecutive crashes have occurred with no
    /// intervening [`RestartPolicy::record_success`].
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.consecutive_crashes as usize >= RESTART_DELAYS.len()
    }

    /// Reset the crash counter, called after the worker successfully
    /// answers any request post-restart.
    pub fn record_success(&mut self) {
        self.consecutive_crashes = 0;
    }

    /// Number of consecutive crashes recorded since the last success.
    #[must_use]
    pub fn consecutive_crashes(&self) -> u32 {
        self.consecutive_crashes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_follow_the_spec_sequence() {
        let mut policy = RestartPolicy::new();
        assert_eq!(policy.record_crash(), Some(Duration::from_secs(1)));
        assert_eq!(policy.record_crash(), Some(Duration::from_secs(2)));
        assert_eq!(policy.record_crash(), Some(Duration::from_secs(4)));
        assert_eq!(policy.record_crash(), None);
    }

    #[test]
    fn exhausted_after_three_consecutive_crashes() {
        let mut policy = RestartPolicy::new();
        for _ in 0..3 {
            policy.record_crash();
        }
        assert!(policy.is_exhausted());
    }

    #[test]
    fn success_resets_the_counter() {
        let mut policy = RestartPolicy::new();
        policy.record_crash();
        policy.record_crash();
        policy.record_success();
        assert_eq!(policy.consecutive_crashes(), 0);
        assert!(!policy.is_exhausted());
    }

    #[test]
    fn not_exhausted_before_third_crash() {
        let mut policy = RestartPolicy::new();
        policy.record_crash();
        policy.record_crash();
        assert!(!policy.is_exhausted());
    }
}
