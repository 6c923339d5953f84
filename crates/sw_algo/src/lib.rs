// crates/sw_algo/src/lib.rs
#![forbid(unsafe_code)]

//! Pure weighting rules over immutable snapshots. No I/O, no clocks.

// ----------------------------- Allocation state & distribution -----------------------

pub mod allocation;
pub mod distribution;
pub mod validate;

pub use allocation::{AllocationEntry, AllocationRules, AllocationState, Iteration, ThresholdMode};
pub use distribution::{distribute_evenly, Distribution};
pub use validate::{EntityRef, Severity, ValidationIssue, ValidationReport};

// ----------------------------- Evaluation, consolidation, progress -------------------

pub mod consolidation;
pub mod evaluator;
pub mod progress;

pub use consolidation::{consolidate, Consolidated, IndicatorConsolidation, SubmittedAllocation};
pub use evaluator::{
    check_review_completion, compare, first_iteration_status, second_iteration_status,
    Comparison, FirstIterationStatus, ReviewBlock, SecondIterationStatus,
};
pub use progress::{
    roll_up_first_iteration, roll_up_second_iteration, submission_gate, FirstIterationProgress,
    IncompleteStrategy, SecondIterationProgress, StrategyProgress, StrategyReviewState,
    SubmissionBlock,
};
