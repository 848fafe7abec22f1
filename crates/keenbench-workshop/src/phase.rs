//! The four RPI phases (`spec.md` §4.9).

use keenbench_core::model::RpiPhase;
use serde::{Deserialize, Serialize};

/// One phase of an RPI cycle.
///
/// A superset of [`RpiPhase`] with the addition of `Summary`, which has no
/// independently configurable reasoning effort (`spec.md` §4.9: "single
/// non-tool call").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkshopPhase {
    /// Read-only exploration phase.
    Research,
    /// Checklist-authoring phase.
    Plan,
    /// Tool-calling execution phase, run once per plan item.
    Implement,
    /// Single non-tool call producing the user-visible summary.
    Summary,
}

impl WorkshopPhase {
    /// The stable lowercase label used in notifications and error context.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Plan => "plan",
            Self::Implement => "implement",
            Self::Summary => "summary",
        }
    }

    /// The corresponding [`RpiPhase`] for settings lookup, if this phase has
    /// an independently configurable reasoning effort.
    #[must_use]
    pub fn rpi_phase(self) -> Option<RpiPhase> {
        match self {
            Self::Research => Some(RpiPhase::Research),
            Self::Plan => Some(RpiPhase::Plan),
            Self::Implement => Some(RpiPhase::Implement),
            Self::Summary => None,
        }
    }

    /// Maximum agent-loop turns allowed for this phase (`spec.md` §4.9).
    #[must_use]
    pub fn max_turns(self) -> usize {
        match self {
            Self::Research => 30,
            Self::Plan => 10,
            Self::Implement => 30,
            Self::Summary => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_has_no_rpi_phase() {
        assert_eq!(WorkshopPhase::Summary.rpi_phase(), None);
    }

    #[test]
    fn research_maps_to_rpi_research() {
        assert_eq!(WorkshopPhase::Research.rpi_phase(), Some(RpiPhase::Research));
    }

    #[test]
    fn max_turns_match_spec() {
        assert_eq!(WorkshopPhase::Research.max_turns(), 30);
        assert_eq!(WorkshopPhase::Plan.max_turns(), 10);
        assert_eq!(WorkshopPhase::Implement.max_turns(), 30);
        assert_eq!(WorkshopPhase::Summary.max_turns(), 1);
    }
}
