//! Repeated-tool-call loop detection shared by every agent-loop run
//! (`spec.md` §4.9: "identical (tool_name, arguments) repeated ≥ N times →
//! warning then hard stop AGENT_LOOP_DETECTED").

use serde_json::Value;

/// How many repeats of an identical `(tool_name, arguments)` pair trigger a
/// hard stop. `spec.md` names the threshold only as "N"; three repeats is
/// this implementation's choice (see `DESIGN.md`).
pub const REPEAT_THRESHOLD: usize = 3;

/// Tracks the most recent identical-call streak across a single agent-loop
/// run.
#[derive(Debug, Default)]
pub struct LoopGuard {
    last_call: Option<(String, Value)>,
    streak: usize,
}

/// What [`LoopGuard::observe`] found after recording a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopObservation {
    /// No repeat, or a repeat not yet at the warning threshold.
    Clear,
    /// The repeat streak reached `REPEAT_THRESHOLD - 1`; the caller should
    /// warn but continue.
    Warn,
    /// The repeat streak reached `REPEAT_THRESHOLD`; the caller must stop
    /// with `AGENT_LOOP_DETECTED`.
    Stop,
}

impl LoopGuard {
    /// Record one tool call and report whether the repeat streak warrants a
    /// warning or a hard stop.
    pub fn observe(&mut self, tool_name: &str, arguments: &Value) -> LoopObservation {
        let is_repeat = self
            .last_call
            .as_ref()
            .is_some_and(|(name, args)| name == tool_name && args == arguments);

        if is_repeat {
            self.streak += 1;
        } else {
            self.streak = 1;
            self.last_call = Some((tool_name.to_string(), arguments.clone()));
        }

        if self.streak >= REPEAT_THRESHOLD {
            LoopObservation::Stop
        } else if self.streak == REPEAT_THRESHOLD - 1 {
            LoopObservation::Warn
        } else {
            LoopObservation::Clear
        }
    }
}
