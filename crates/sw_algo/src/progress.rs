//! Session-level roll-up of per-strategy statuses and submission gating.

use core::fmt;

use sw_core::ids::StrategyId;

use crate::evaluator::{FirstIterationStatus, SecondIterationStatus};

#[cfg(feature = "serde")]
use serde::Serialize;

// ----- First iteration -----

#[derive(Clone, Debug, PartialEq)]
pub struct StrategyProgress {
    pub strategy_id: StrategyId,
    pub skipped: bool,
    pub status: FirstIterationStatus,
    /// Stored total; 0 when nothing is stored.
    pub total_weight: f64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct IncompleteStrategy {
    pub strategy_id: StrategyId,
    pub total_weight: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FirstIterationProgress {
    pub total: usize,
    /// Includes skipped strategies.
    pub completed: usize,
    pub skipped: usize,
    /// `completed / total`, 0 for an empty survey.
    pub progress: f64,
    /// Incomplete and not-yet-started strategies, input order.
    pub incomplete: Vec<IncompleteStrategy>,
}

pub fn roll_up_first_iteration(items: &[StrategyProgress]) -> FirstIterationProgress {
    let mut out = FirstIterationProgress { total: items.len(), ..Default::default() };
    for it in items {
        if it.skipped {
            out.skipped += 1;
        }
        match it.status {
            FirstIterationStatus::Complete => out.completed += 1,
            FirstIterationStatus::Incomplete | FirstIterationStatus::NotApplicable => {
                out.incomplete.push(IncompleteStrategy {
                    strategy_id: it.strategy_id.clone(),
                    total_weight: it.total_weight,
                })
            }
        }
    }
    out.progress = if out.total == 0 { 0.0 } else { out.completed as f64 / out.total as f64 };
    out
}

/// Submission refused because strategies are incomplete and the caller did
/// not acknowledge it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SubmissionBlock {
    pub incomplete: Vec<IncompleteStrategy>,
}

impl fmt::Display for SubmissionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} incomplete strategies:", self.incomplete.len())?;
        for (i, s) in self.incomplete.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{} ({})", s.strategy_id, s.total_weight)?;
        }
        Ok(())
    }
}

impl std::error::Error for SubmissionBlock {}

pub fn submission_gate(progress: &FirstIterationProgress, acknowledge_incomplete: bool) -> Result<(), SubmissionBlock> {
    if progress.incomplete.is_empty() || acknowledge_incomplete {
        Ok(())
    } else {
        Err(SubmissionBlock { incomplete: progress.incomplete.clone() })
    }
}

// ----- Second iteration -----

#[derive(Clone, Debug, PartialEq)]
pub struct StrategyReviewState {
    pub strategy_id: StrategyId,
    pub skipped: bool,
    pub status: SecondIterationStatus,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SecondIterationProgress {
    pub total: usize,
    pub skipped: usize,
    /// `total - skipped`.
    pub available: usize,
    pub reviewed: usize,
    pub modified: usize,
    pub incomplete: usize,
    pub not_started: usize,
    /// `reviewed / available`; 1 when nothing is available.
    pub progress: f64,
    /// Non-skipped strategies only, input order.
    pub strategies: Vec<(StrategyId, SecondIterationStatus)>,
}

pub fn roll_up_second_iteration(items: &[StrategyReviewState]) -> SecondIterationProgress {
    let mut out = SecondIterationProgress { total: items.len(), ..Default::default() };
    for it in items {
        if it.skipped {
            out.skipped += 1;
            continue;
        }
        match it.status {
            SecondIterationStatus::Reviewed => out.reviewed += 1,
            SecondIterationStatus::Modified => out.modified += 1,
            SecondIterationStatus::Incomplete => out.incomplete += 1,
            SecondIterationStatus::NotStarted => out.not_started += 1,
        }
        out.strategies.push((it.strategy_id.clone(), it.status));
    }
    out.available = out.total - out.skipped;
    out.progress = if out.available == 0 { 1.0 } else { out.reviewed as f64 / out.available as f64 };
    out
}
