//! Allocation state for one (session, strategy) pair.
//!
//! `AllocationState` is an immutable snapshot: every command returns a new
//! snapshot and leaves `self` untouched. Commands that are refused (an
//! over-budget weight, an unknown indicator) return an unchanged copy rather
//! than an error; callers render whatever snapshot they get back.
//!
//! Entries keep insertion order, which is the selection order used by
//! auto-distribution.

use sw_core::ids::IndicatorId;
use sw_core::rounding::{round_to_step, sums_to_total, TOTAL};
use sw_core::variables::Policy;

use crate::validate::{EntityRef, Severity, ValidationIssue, ValidationReport};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Slack for float sums compared against the 100 budget.
const BUDGET_EPS: f64 = 1e-9;

pub const CODE_EMPTY: &str = "Allocation.Empty";
pub const CODE_SUM: &str = "Allocation.SumNot100";
pub const CODE_ZERO_WEIGHT: &str = "Allocation.ZeroWeight";
pub const CODE_THRESHOLD_INVALID: &str = "Allocation.ThresholdInvalid";
pub const CODE_THRESHOLD_TOO_LONG: &str = "Allocation.ThresholdTooLong";

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AllocationEntry {
    pub indicator_id: IndicatorId,
    pub weight: f64,
    pub threshold: Option<String>,
    /// Second iteration only; an excluded row contributes 0 to the total.
    pub excluded: bool,
}

impl AllocationEntry {
    pub fn new(indicator_id: IndicatorId, weight: f64, threshold: Option<String>) -> Self {
        Self { indicator_id, weight, threshold, excluded: false }
    }

    #[inline]
    pub fn effective_weight(&self) -> f64 {
        if self.excluded { 0.0 } else { self.weight }
    }

    pub fn threshold_text(&self) -> &str {
        self.threshold.as_deref().unwrap_or("")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Iteration {
    First,
    Second,
}

/// How threshold text is interpreted for validity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThresholdMode {
    /// Free text; never invalid (only length-capped).
    Text,
    /// Must parse as a number > 0 when present.
    Numeric,
}

/// Caller-supplied policy for one editing context.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AllocationRules {
    pub iteration: Iteration,
    pub step: f64,
    pub threshold_max_chars: usize,
    pub tolerance: f64,
    pub threshold_mode: ThresholdMode,
}

impl AllocationRules {
    pub fn first_iteration(p: &Policy) -> Self {
        Self {
            iteration: Iteration::First,
            step: p.first_iteration_step,
            threshold_max_chars: p.threshold_max_chars,
            tolerance: p.ui_tolerance,
            threshold_mode: ThresholdMode::Text,
        }
    }

    pub fn second_iteration(p: &Policy) -> Self {
        Self {
            iteration: Iteration::Second,
            step: p.second_iteration_step,
            threshold_max_chars: p.threshold_max_chars,
            tolerance: p.ui_tolerance,
            threshold_mode: ThresholdMode::Text,
        }
    }

    pub fn with_threshold_mode(mut self, mode: ThresholdMode) -> Self {
        self.threshold_mode = mode;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AllocationState {
    entries: Vec<AllocationEntry>,
    dirty: bool,
    /// One-level undo for auto-distribution.
    previous: Option<Vec<AllocationEntry>>,
}

impl AllocationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of stored rows; clean, nothing to undo. Duplicate indicator
    /// ids keep the first occurrence.
    pub fn from_entries(entries: impl IntoIterator<Item = AllocationEntry>) -> Self {
        let mut out: Vec<AllocationEntry> = Vec::new();
        for e in entries {
            if !out.iter().any(|x| x.indicator_id == e.indicator_id) {
                out.push(e);
            }
        }
        Self { entries: out, dirty: false, previous: None }
    }

    pub fn entries(&self) -> &[AllocationEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<AllocationEntry> {
        self.entries
    }

    pub fn get(&self, id: &IndicatorId) -> Option<&AllocationEntry> {
        self.entries.iter().find(|e| &e.indicator_id == id)
    }

    pub fn is_selected(&self, id: &IndicatorId) -> bool {
        self.get(id).is_some()
    }

    pub fn selected_ids(&self) -> Vec<IndicatorId> {
        self.entries.iter().map(|e| e.indicator_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn can_undo(&self) -> bool {
        self.previous.is_some()
    }

    /// Called after a successful save.
    pub fn mark_clean(&self) -> Self {
        Self { dirty: false, ..self.clone() }
    }

    // ----- Queries -----

    /// Excluded rows contribute 0.
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(AllocationEntry::effective_weight).sum()
    }

    fn others_total(&self, id: &IndicatorId) -> f64 {
        self.entries
            .iter()
            .filter(|e| &e.indicator_id != id)
            .map(AllocationEntry::effective_weight)
            .sum()
    }

    /// Largest weight `id` could take without pushing the total above 100.
    pub fn remaining_for(&self, id: &IndicatorId) -> f64 {
        (TOTAL - self.others_total(id)).max(0.0)
    }

    // ----- Commands -----

    /// Clamp, round to `step`, then refuse if the total would exceed 100.
    /// Setting a weight on an unselected indicator selects it.
    pub fn set_weight(&self, id: &IndicatorId, raw: f64, step: f64) -> Self {
        let value = round_to_step(raw, step);
        let pos = self.entries.iter().position(|e| &e.indicator_id == id);
        let counts = pos.map_or(true, |i| !self.entries[i].excluded);
        if counts && self.others_total(id) + value > TOTAL + BUDGET_EPS {
            return self.clone();
        }
        let mut next = self.clone();
        match pos {
            Some(i) => {
                if next.entries[i].weight == value {
                    return next;
                }
                next.entries[i].weight = value;
            }
            None => next.entries.push(AllocationEntry::new(id.clone(), value, None)),
        }
        next.dirty = true;
        next
    }

    /// Stores trimmed text truncated to `max_chars` characters; empty clears.
    /// Unknown indicators are left alone.
    pub fn set_threshold(&self, id: &IndicatorId, raw: &str, max_chars: usize) -> Self {
        let Some(i) = self.entries.iter().position(|e| &e.indicator_id == id) else {
            return self.clone();
        };
        let trimmed = raw.trim();
        let value = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.chars().take(max_chars).collect::<String>())
        };
        if self.entries[i].threshold == value {
            return self.clone();
        }
        let mut next = self.clone();
        next.entries[i].threshold = value;
        next.dirty = true;
        next
    }

    /// Adds an empty row (weight 0, no threshold) or removes the row.
    pub fn toggle_indicator(&self, id: &IndicatorId) -> Self {
        let mut next = self.clone();
        match next.entries.iter().position(|e| &e.indicator_id == id) {
            Some(i) => {
                next.entries.remove(i);
            }
            None => next.entries.push(AllocationEntry::new(id.clone(), 0.0, None)),
        }
        next.dirty = true;
        next
    }

    /// Re-including a row is subject to the same budget rule as `set_weight`.
    pub fn set_excluded(&self, id: &IndicatorId, excluded: bool) -> Self {
        let Some(i) = self.entries.iter().position(|e| &e.indicator_id == id) else {
            return self.clone();
        };
        if self.entries[i].excluded == excluded {
            return self.clone();
        }
        if !excluded && self.others_total(id) + self.entries[i].weight > TOTAL + BUDGET_EPS {
            return self.clone();
        }
        let mut next = self.clone();
        next.entries[i].excluded = excluded;
        next.dirty = true;
        next
    }

    /// Replace all entries, keeping the current ones as the undo snapshot.
    pub(crate) fn with_snapshot(&self, entries: Vec<AllocationEntry>) -> Self {
        Self {
            previous: Some(self.entries.clone()),
            entries,
            dirty: true,
        }
    }

    /// Restores the entries captured before the last auto-distribution.
    pub fn undo_distribution(&self) -> Self {
        match &self.previous {
            Some(prev) => Self { entries: prev.clone(), dirty: true, previous: None },
            None => self.clone(),
        }
    }

    // ----- Validation -----

    pub fn validate(&self, rules: &AllocationRules) -> ValidationReport {
        let mut issues = Vec::new();

        if self.entries.is_empty() {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: CODE_EMPTY,
                message: "no indicator selected".to_string(),
                where_: EntityRef::Root,
            });
        }

        let total = self.total_weight();
        if !sums_to_total(total, rules.tolerance) {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: CODE_SUM,
                message: format!("total weight is {total}, expected 100"),
                where_: EntityRef::Root,
            });
        }

        let zero_severity = match rules.iteration {
            Iteration::First => Severity::Error,
            Iteration::Second => Severity::Warning,
        };
        for e in self.entries.iter().filter(|e| !e.excluded) {
            if e.weight <= 0.0 {
                issues.push(ValidationIssue {
                    severity: zero_severity,
                    code: CODE_ZERO_WEIGHT,
                    message: format!("{} has weight 0", e.indicator_id),
                    where_: EntityRef::Indicator(e.indicator_id.clone()),
                });
            }
        }

        for e in &self.entries {
            let Some(t) = e.threshold.as_deref() else { continue };
            if t.chars().count() > rules.threshold_max_chars {
                issues.push(ValidationIssue {
                    severity: Severity::Error,
                    code: CODE_THRESHOLD_TOO_LONG,
                    message: format!(
                        "threshold for {} exceeds {} characters",
                        e.indicator_id, rules.threshold_max_chars
                    ),
                    where_: EntityRef::Indicator(e.indicator_id.clone()),
                });
            }
            if rules.threshold_mode == ThresholdMode::Numeric && !is_positive_number(t) {
                issues.push(ValidationIssue {
                    severity: Severity::Warning,
                    code: CODE_THRESHOLD_INVALID,
                    message: format!("threshold for {} must be a number greater than 0", e.indicator_id),
                    where_: EntityRef::Indicator(e.indicator_id.clone()),
                });
            }
        }

        ValidationReport::from_issues(issues)
    }

    /// No errors, and in the first iteration no invalid threshold either.
    pub fn is_valid(&self, rules: &AllocationRules) -> bool {
        let report = self.validate(rules);
        report.pass
            && !(rules.iteration == Iteration::First && report.has_code(CODE_THRESHOLD_INVALID))
    }
}

fn is_positive_number(s: &str) -> bool {
    s.trim().parse::<f64>().map(|v| v.is_finite() && v > 0.0).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iid(s: &str) -> IndicatorId { s.parse().unwrap() }

    fn rules_first() -> AllocationRules { AllocationRules::first_iteration(&Policy::default()) }

    fn rules_second() -> AllocationRules { AllocationRules::second_iteration(&Policy::default()) }

    #[test]
    fn set_weight_rounds_and_marks_dirty() {
        let s = AllocationState::new().set_weight(&iid("i1"), 42.0, 5.0);
        assert_eq!(s.get(&iid("i1")).unwrap().weight, 40.0);
        assert!(s.is_dirty());
        let s = s.set_weight(&iid("i1"), 33.4, 1.0);
        assert_eq!(s.get(&iid("i1")).unwrap().weight, 33.0);
    }

    #[test]
    fn over_budget_update_is_ignored() {
        let s = AllocationState::new()
            .set_weight(&iid("i1"), 60.0, 5.0)
            .set_weight(&iid("i2"), 30.0, 5.0)
            .mark_clean();
        let after = s.set_weight(&iid("i2"), 45.0, 5.0);
        assert_eq!(after, s);
        assert!(!after.is_dirty());
        assert_eq!(after.remaining_for(&iid("i2")), 40.0);
        let ok = s.set_weight(&iid("i2"), 40.0, 5.0);
        assert_eq!(ok.total_weight(), 100.0);
    }

    #[test]
    fn negative_and_huge_values_clamp() {
        let s = AllocationState::new().set_weight(&iid("i1"), -10.0, 5.0);
        assert_eq!(s.get(&iid("i1")).unwrap().weight, 0.0);
        let s = s.set_weight(&iid("i1"), 1e9, 5.0);
        assert_eq!(s.get(&iid("i1")).unwrap().weight, 100.0);
    }

    #[test]
    fn threshold_is_capped_and_cleared() {
        let s = AllocationState::new().toggle_indicator(&iid("i1"));
        let long = "x".repeat(120);
        let s = s.set_threshold(&iid("i1"), &long, 90);
        assert_eq!(s.get(&iid("i1")).unwrap().threshold_text().chars().count(), 90);
        let s = s.set_threshold(&iid("i1"), "   ", 90);
        assert_eq!(s.get(&iid("i1")).unwrap().threshold, None);
        let untouched = s.set_threshold(&iid("zz"), "5", 90);
        assert!(untouched.get(&iid("zz")).is_none());
    }

    #[test]
    fn toggle_adds_then_removes() {
        let s = AllocationState::new().toggle_indicator(&iid("i1"));
        assert_eq!(s.get(&iid("i1")).unwrap().weight, 0.0);
        let s = s.toggle_indicator(&iid("i1"));
        assert!(s.is_empty());
    }

    #[test]
    fn excluded_rows_do_not_count() {
        let s = AllocationState::from_entries(vec![
            AllocationEntry::new(iid("a"), 70.0, None),
            AllocationEntry::new(iid("b"), 30.0, None),
        ]);
        let s = s.set_excluded(&iid("b"), true);
        assert_eq!(s.total_weight(), 70.0);
        let s = s.set_weight(&iid("a"), 100.0, 1.0);
        assert_eq!(s.total_weight(), 100.0);
        // re-including b would overflow the budget
        let s2 = s.set_excluded(&iid("b"), false);
        assert!(s2.get(&iid("b")).unwrap().excluded);
    }

    #[test]
    fn validity_first_iteration() {
        let s = AllocationState::new()
            .set_weight(&iid("a"), 60.0, 5.0)
            .set_weight(&iid("b"), 40.0, 5.0);
        assert!(s.is_valid(&rules_first()));

        let with_zero = s.toggle_indicator(&iid("c"));
        let report = with_zero.validate(&rules_first());
        assert!(!report.pass);
        assert!(report.has_code(CODE_ZERO_WEIGHT));

        let short = AllocationState::new().set_weight(&iid("a"), 50.0, 5.0);
        assert!(short.validate(&rules_first()).has_code(CODE_SUM));
        assert!(!AllocationState::new().is_valid(&rules_first()));
    }

    #[test]
    fn second_iteration_relaxes_zero_weight() {
        let s = AllocationState::from_entries(vec![
            AllocationEntry::new(iid("a"), 100.0, None),
            AllocationEntry::new(iid("b"), 0.0, None),
        ]);
        let report = s.validate(&rules_second());
        assert!(report.pass);
        assert_eq!(report.warnings().count(), 1);
        assert!(!s.is_valid(&rules_first()));
    }

    #[test]
    fn numeric_threshold_warns() {
        let rules = rules_first().with_threshold_mode(ThresholdMode::Numeric);
        let s = AllocationState::new()
            .set_weight(&iid("a"), 100.0, 5.0)
            .set_threshold(&iid("a"), "0", 90);
        let report = s.validate(&rules);
        assert!(report.pass);
        assert!(report.has_code(CODE_THRESHOLD_INVALID));
        assert!(!s.is_valid(&rules));
        let s = s.set_threshold(&iid("a"), "2.5", 90);
        assert!(s.is_valid(&rules));
    }

    #[test]
    fn from_entries_drops_duplicate_ids() {
        let s = AllocationState::from_entries(vec![
            AllocationEntry::new(iid("a"), 10.0, None),
            AllocationEntry::new(iid("a"), 20.0, None),
        ]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.total_weight(), 10.0);
    }
}
