//! Completeness & modification evaluation.
//!
//! First iteration: complete / incomplete / not-applicable from the stored
//! total. Second iteration: current rows are compared against the
//! first-iteration baseline; an explicit review mark always wins.

use core::fmt;

use sw_core::ids::IndicatorId;
use sw_core::rounding::sums_to_total;

use crate::allocation::AllocationEntry;

#[cfg(feature = "serde")]
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Comparison {
    pub has_modifications: bool,
    pub has_threshold_modifications: bool,
    /// Present in current, absent from baseline; current order.
    pub new_indicators: Vec<IndicatorId>,
}

impl Comparison {
    pub fn is_modified(&self) -> bool {
        self.has_modifications || self.has_threshold_modifications
    }

    pub fn is_new(&self, id: &IndicatorId) -> bool {
        self.new_indicators.contains(id)
    }
}

pub fn compare(current: &[AllocationEntry], baseline: &[AllocationEntry], epsilon: f64) -> Comparison {
    let mut out = Comparison::default();
    for cur in current {
        match baseline.iter().find(|b| b.indicator_id == cur.indicator_id) {
            Some(base) => {
                if (base.weight - cur.weight).abs() > epsilon {
                    out.has_modifications = true;
                }
                if base.threshold_text() != cur.threshold_text() {
                    out.has_threshold_modifications = true;
                }
            }
            None => {
                if !cur.threshold_text().is_empty() {
                    out.has_threshold_modifications = true;
                }
                out.new_indicators.push(cur.indicator_id.clone());
            }
        }
    }
    out
}

// ----- First iteration -----

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FirstIterationStatus {
    Complete,
    Incomplete,
    NotApplicable,
}

/// `total` is the stored sum, `None` when the strategy has no rows.
pub fn first_iteration_status(skipped: bool, total: Option<f64>, tolerance: f64) -> FirstIterationStatus {
    if skipped {
        return FirstIterationStatus::Complete;
    }
    match total {
        None => FirstIterationStatus::NotApplicable,
        Some(t) if sums_to_total(t, tolerance) => FirstIterationStatus::Complete,
        Some(_) => FirstIterationStatus::Incomplete,
    }
}

// ----- Second iteration -----

/// Mutually exclusive; variants are listed in evaluation priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SecondIterationStatus {
    Reviewed,
    Modified,
    Incomplete,
    NotStarted,
}

/// `reviewed` is true when any stored row for the strategy carries a review
/// mark. Weight math alone never yields `Reviewed`.
pub fn second_iteration_status(
    current: &[AllocationEntry],
    baseline: &[AllocationEntry],
    reviewed: bool,
    epsilon: f64,
) -> SecondIterationStatus {
    if reviewed {
        return SecondIterationStatus::Reviewed;
    }
    if current.is_empty() {
        return SecondIterationStatus::NotStarted;
    }
    if compare(current, baseline, epsilon).is_modified() {
        SecondIterationStatus::Modified
    } else {
        SecondIterationStatus::Incomplete
    }
}

/// Why a second-iteration review cannot be marked complete.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ReviewBlock {
    /// Set when the total is off by more than the tolerance.
    pub total: Option<f64>,
    /// New indicators with weight > 0 and no threshold.
    pub missing_thresholds: Vec<IndicatorId>,
}

impl fmt::Display for ReviewBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if let Some(t) = self.total {
            write!(f, "total weight is {t}, expected 100")?;
            sep = "; ";
        }
        if !self.missing_thresholds.is_empty() {
            let names: Vec<&str> = self.missing_thresholds.iter().map(|i| i.as_str()).collect();
            write!(f, "{sep}new indicators need a threshold: {}", names.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ReviewBlock {}

/// Hard gate for "mark as reviewed": sum within tolerance of 100, and every
/// new indicator with a positive weight has a non-empty threshold.
pub fn check_review_completion(
    current: &[AllocationEntry],
    baseline: &[AllocationEntry],
    tolerance: f64,
) -> Result<(), ReviewBlock> {
    let total: f64 = current.iter().map(AllocationEntry::effective_weight).sum();
    let total_off = (!sums_to_total(total, tolerance)).then_some(total);

    let missing_thresholds: Vec<IndicatorId> = current
        .iter()
        .filter(|c| !c.excluded && c.weight > 0.0)
        .filter(|c| c.threshold_text().trim().is_empty())
        .filter(|c| !baseline.iter().any(|b| b.indicator_id == c.indicator_id))
        .map(|c| c.indicator_id.clone())
        .collect();

    if total_off.is_none() && missing_thresholds.is_empty() {
        Ok(())
    } else {
        Err(ReviewBlock { total: total_off, missing_thresholds })
    }
}
