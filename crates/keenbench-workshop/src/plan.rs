//! The Plan-phase checklist format and its mutation during Implement
//! (`spec.md` §4.9).
//!
//! ```text
//! <!-- original_count: 3 -->
//! - [x] 1. Add totals row — sums column D for each sheet
//! - [ ] 2. Rename Sheet1 — rename to "Summary"
//! - [!] 3. Insert chart [Failed: chart tool unavailable]
//! ```

use regex::Regex;
use std::sync::OnceLock;

fn item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^- \[([ x!])\]\s*(\d+)\.\s*(.+)$").expect("static regex is valid"))
}

fn original_count_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^<!--\s*original_count:\s*(\d+)\s*-->$").expect("static regex is valid"))
}

/// Status of a single checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanItemStatus {
    /// Not yet attempted.
    Pending,
    /// Completed successfully.
    Done,
    /// Failed after a retry; carries no further attempts this cycle.
    Failed,
}

impl PlanItemStatus {
    fn marker(self) -> char {
        match self {
            Self::Pending => ' ',
            Self::Done => 'x',
            Self::Failed => '!',
        }
    }

    fn from_marker(c: char) -> Option<Self> {
        match c {
            ' ' => Some(Self::Pending),
            'x' => Some(Self::Done),
            '!' => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A single checklist line.
///
/// `label` holds everything after `N. ` — the original `Label — Description`
/// text, or that text with a trailing `[Failed: <reason>]` appended once the
/// item has failed twice.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanItem {
    /// 1-based index as written in the plan. Duplicates and gaps are
    /// accepted as written (`spec.md` §4.9: "duplicate indices accepted;
    /// non-sequential numbering accepted").
    pub index: u32,
    /// Current status.
    pub status: PlanItemStatus,
    /// The text following `N. `.
    pub label: String,
}

impl PlanItem {
    fn render(&self) -> String {
        format!("- [{}] {}. {}", self.status.marker(), self.index, self.label)
    }
}

/// The full parsed `plan.md` document.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDocument {
    /// Count recorded in the `<!-- original_count: N -->` marker the engine
    /// inserts when the Plan phase first produces the checklist.
    pub original_count: usize,
    /// Items in document order.
    pub items: Vec<PlanItem>,
}

impl PlanDocument {
    /// Build a fresh plan from the Plan phase's final text, inserting the
    /// `original_count` marker (`spec.md` §4.9: "engine inserts
    /// `<!-- original_count: N -->` before writing `plan.md`").
    #[must_use]
    pub fn from_plan_phase_output(text: &str) -> Self {
        let items = parse_items(text);
        Self {
            original_count: items.len(),
            items,
        }
    }

    /// Parse a previously-persisted `plan.md`, honoring its recorded
    /// `original_count` marker if present.
    #[must_use]
    pub fn parse(markdown: &str) -> Self {
        let marker_count = markdown
            .lines()
            .find_map(|line| original_count_regex().captures(line.trim()))
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<usize>().ok());
        let items = parse_items(markdown);
        Self {
            original_count: marker_count.unwrap_or(items.len()),
            items,
        }
    }

    /// Render back to markdown, with the `original_count` marker first.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("<!-- original_count: {} -->\n", self.original_count);
        for item in &self.items {
            out.push_str(&item.render());
            out.push('\n');
        }
        out
    }

    /// Indices of items still pending, in document order.
    #[must_use]
    pub fn pending_indices(&self) -> Vec<u32> {
        self.items
            .iter()
            .filter(|i| i.status == PlanItemStatus::Pending)
            .map(|i| i.index)
            .collect()
    }

    /// Whether every item has been resolved (done or failed).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending_indices().is_empty()
    }

    /// Mark the first pending item with `index` as done.
    pub fn mark_done(&mut self, index: u32) {
        if let Some(item) = self.items.iter_mut().find(|i| i.index == index && i.status == PlanItemStatus::Pending) {
            item.status = PlanItemStatus::Done;
        }
    }

    /// Mark the first pending item with `index` as failed, appending the
    /// failure reason to its label (`spec.md` §4.9: "on second failure:
    /// `- [!] N. Label [Failed: <reason>]`").
    pub fn mark_failed(&mut self, index: u32, reason: &str) {
        if let Some(item) = self.items.iter_mut().find(|i| i.index == index && i.status == PlanItemStatus::Pending) {
            item.status = PlanItemStatus::Failed;
            item.label = format!("{} [Failed: {reason}]", item.label);
        }
    }

    /// Scan `text` for new checklist lines and append them as pending items,
    /// subject to the `original_count * 2` inflation cap (`spec.md` §4.9:
    /// "subject to inflation cap original_count × 2; excess dropped with
    /// warning"). Returns the number of lines dropped for capacity.
    pub fn append_discovered(&mut self, text: &str) -> usize {
        let cap = self.original_count.saturating_mul(2);
        let discovered = parse_items(text);
        let mut dropped = 0;
        for mut item in discovered {
            if self.items.len() >= cap {
                dropped += 1;
                continue;
            }
            item.status = PlanItemStatus::Pending;
            self.items.push(item);
        }
        if dropped > 0 {
            tracing::warn!(target: "keenbench.workshop", dropped, cap, "plan inflation cap reached, dropping discovered items");
        }
        dropped
    }
}

fn parse_items(markdown: &str) -> Vec<PlanItem> {
    markdown
        .lines()
        .filter_map(|line| {
            let caps = item_regex().captures(line.trim())?;
            let marker = caps.get(1)?.as_str().chars().next()?;
            let status = PlanItemStatus::from_marker(marker)?;
            let index = caps.get(2)?.as_str().parse::<u32>().ok()?;
            let label = caps.get(3)?.as_str().to_string();
            Some(PlanItem { index, status, label })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_checklist_from_plan_phase_output() {
        let text = "Here is the plan:\n- [ ] 1. Add totals row — sums column D\n- [ ] 2. Rename sheet\n";
        let plan = PlanDocument::from_plan_phase_output(text);
        assert_eq!(plan.original_count, 2);
        assert_eq!(plan.items.len(), 2);
        assert_eq!(plan.items[0].label, "Add totals row — sums column D");
    }

    #[test]
    fn zero_match_plan_completes_immediately() {
        let plan = PlanDocument::from_plan_phase_output("Nothing to do here.");
        assert_eq!(plan.original_count, 0);
        assert!(plan.is_complete());
    }

    #[test]
    fn render_then_parse_round_trips() {
        let mut plan = PlanDocument::from_plan_phase_output("- [ ] 1. First\n- [ ] 2. Second\n");
        plan.mark_done(1);
        let rendered = plan.render();
        let reparsed = PlanDocument::parse(&rendered);
        assert_eq!(reparsed.original_count, 2);
        assert_eq!(reparsed.items[0].status, PlanItemStatus::Done);
        assert_eq!(reparsed.pending_indices(), vec![2]);
    }

    #[test]
    fn mark_failed_appends_reason_to_label() {
        let mut plan = PlanDocument::from_plan_phase_output("- [ ] 1. Insert chart\n");
        plan.mark_failed(1, "chart tool unavailable");
        assert_eq!(plan.items[0].label, "Insert chart [Failed: chart tool unavailable]");
        assert_eq!(plan.items[0].status, PlanItemStatus::Failed);
    }

    #[test]
    fn duplicate_and_nonsequential_indices_are_accepted() {
        let plan = PlanDocument::from_plan_phase_output("- [ ] 5. Foo\n- [ ] 5. Bar\n- [ ] 1. Baz\n");
        assert_eq!(plan.items.len(), 3);
        assert_eq!(plan.items.iter().map(|i| i.index).collect::<Vec<_>>(), vec![5, 5, 1]);
    }

    #[test]
    fn append_discovered_respects_inflation_cap() {
        let mut plan = PlanDocument::from_plan_phase_output("- [ ] 1. Only item\n");
        assert_eq!(plan.original_count, 1);
        let discovered = "- [ ] 2. New item a\n- [ ] 3. New item b\n- [ ] 4. New item c\n";
        let dropped = plan.append_discovered(discovered);
        // cap = original_count * 2 = 2; one item already present, so only
        // one more fits before the cap is hit.
        assert_eq!(plan.items.len(), 2);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn marker_in_rendered_output_is_reread() {
        let plan = PlanDocument::from_plan_phase_output("- [ ] 1. Solo\n");
        let rendered = plan.render();
        assert!(rendered.starts_with("<!-- original_count: 1 -->\n"));
    }
}
