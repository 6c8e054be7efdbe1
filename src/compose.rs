//! Folds per-diagnostic matches into one non-overlapping edit batch.

use crate::edit::{apply_batch, EditError, Position, TextEdit};
use crate::rules::{RuleId, RuleMatch, WINDOW_IMPORT};
use tracing::debug;

/// The finalized edit batch for one file.
///
/// Built only by [`compose`], so its edits never overlap and the import
/// insertion appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "a FixPlan does nothing until applied"]
pub struct FixPlan {
    edits: Vec<TextEdit>,
    rules: Vec<RuleId>,
    needs_import: bool,
    dropped: usize,
}

impl FixPlan {
    pub fn edits(&self) -> &[TextEdit] {
        &self.edits
    }

    /// Rules behind the accepted edits, in acceptance order.
    pub fn rules(&self) -> &[RuleId] {
        &self.rules
    }

    pub fn needs_import(&self) -> bool {
        self.needs_import
    }

    /// Matches discarded because they overlapped an earlier one.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Apply the whole plan to `text` in one pass.
    pub fn apply_to(&self, text: &str) -> Result<String, EditError> {
        apply_batch(text, &self.edits)
    }
}

/// Build a [`FixPlan`] from matches in diagnostic order.
///
/// A match whose span overlaps an already accepted one is dropped. When any
/// accepted match needs the `window` import, a single insertion at the top of
/// the file is prepended.
pub fn compose(matches: impl IntoIterator<Item = RuleMatch>) -> FixPlan {
    let mut plan = FixPlan::default();

    for candidate in matches {
        if let Some(kept) = plan
            .edits
            .iter()
            .find(|kept| kept.range.overlaps(&candidate.edit.range))
        {
            debug!(
                rule = %candidate.rule,
                range = %candidate.edit.range,
                conflicts_with = %kept.range,
                "dropping overlapping edit"
            );
            plan.dropped += 1;
            continue;
        }
        plan.needs_import |= candidate.needs_import;
        plan.rules.push(candidate.rule);
        plan.edits.push(candidate.edit);
    }

    if plan.needs_import {
        plan.edits
            .insert(0, TextEdit::insert(Position::new(0, 0), WINDOW_IMPORT));
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::Range;

    fn relocated(line: u32, start: u32) -> RuleMatch {
        RuleMatch {
            rule: RuleId::RelocatedProperty,
            edit: TextEdit::new(Range::on_line(line, start, start + 9), "window"),
            needs_import: true,
        }
    }

    fn deletion(line: u32, start: u32, end: u32) -> RuleMatch {
        RuleMatch {
            rule: RuleId::PromiseLogError,
            edit: TextEdit::delete(Range::on_line(line, start, end)),
            needs_import: false,
        }
    }

    #[test]
    fn test_empty_input_gives_empty_plan() {
        let plan = compose(Vec::new());
        assert!(plan.is_empty());
        assert!(!plan.needs_import());
    }

    #[test]
    fn test_single_import_for_many_relocations() {
        let plan = compose(vec![relocated(1, 0), relocated(2, 4), relocated(5, 0)]);
        assert_eq!(plan.len(), 4);
        let imports = plan
            .edits()
            .iter()
            .filter(|e| e.new_text == WINDOW_IMPORT)
            .count();
        assert_eq!(imports, 1);
        assert_eq!(plan.edits()[0].range, Range::point(Position::new(0, 0)));
    }

    #[test]
    fn test_no_import_without_flag() {
        let plan = compose(vec![deletion(0, 3, 14)]);
        assert_eq!(plan.len(), 1);
        assert!(!plan.needs_import());
    }

    #[test]
    fn test_first_overlapping_match_wins() {
        let plan = compose(vec![deletion(3, 2, 10), deletion(3, 5, 12), deletion(3, 10, 12)]);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.dropped(), 1);
        assert_eq!(plan.edits()[0].range, Range::on_line(3, 2, 10));
        assert_eq!(plan.edits()[1].range, Range::on_line(3, 10, 12));
    }

    #[test]
    fn test_dropped_match_does_not_set_import_flag() {
        let plan = compose(vec![deletion(1, 0, 12), relocated(1, 0)]);
        assert!(!plan.needs_import());
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_import_coexists_with_edit_at_origin() {
        let plan = compose(vec![relocated(0, 0)]);
        let out = plan.apply_to("workspace.moveTo(pos)\n").unwrap();
        assert_eq!(out, "import {window} from 'coc.nvim'\nwindow.moveTo(pos)\n");
    }
}
