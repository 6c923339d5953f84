//! Policy variables for the weighting rules.
//!
//! Every tunable lives here with the reference default. Missing fields in a
//! policy file take these defaults (see `sw_io::loader::load_policy`).

use crate::errors::CoreError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct Policy {
    /// Weight granularity while entering first-iteration weights.
    pub first_iteration_step: f64,
    /// Weight granularity in the consolidated/second-iteration views.
    pub second_iteration_step: f64,
    /// Granularity G of auto-distribution.
    pub distribution_step: f64,
    pub threshold_max_chars: usize,
    /// Sum-to-100 tolerance for stored allocations.
    pub storage_tolerance: f64,
    /// Sum-to-100 tolerance for interactive validity and review completion.
    pub ui_tolerance: f64,
    /// Minimum weight delta that counts as a modification.
    pub modification_epsilon: f64,
    pub autosave_delay_ms: u64,
    pub max_strategy_rating: u8,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            first_iteration_step: 5.0,
            second_iteration_step: 1.0,
            distribution_step: 5.0,
            threshold_max_chars: 90,
            storage_tolerance: 0.01,
            ui_tolerance: 0.1,
            modification_epsilon: 0.01,
            autosave_delay_ms: 1500,
            max_strategy_rating: 5,
        }
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

impl Policy {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !positive(self.first_iteration_step) || self.first_iteration_step > 100.0 {
            return Err(CoreError::DomainOutOfRange("first_iteration_step"));
        }
        if !positive(self.second_iteration_step) || self.second_iteration_step > 100.0 {
            return Err(CoreError::DomainOutOfRange("second_iteration_step"));
        }
        if !positive(self.distribution_step) || self.distribution_step > 100.0 {
            return Err(CoreError::DomainOutOfRange("distribution_step"));
        }
        if self.threshold_max_chars == 0 {
            return Err(CoreError::DomainOutOfRange("threshold_max_chars"));
        }
        if !non_negative(self.storage_tolerance) {
            return Err(CoreError::DomainOutOfRange("storage_tolerance"));
        }
        if !non_negative(self.ui_tolerance) {
            return Err(CoreError::DomainOutOfRange("ui_tolerance"));
        }
        if !non_negative(self.modification_epsilon) {
            return Err(CoreError::DomainOutOfRange("modification_epsilon"));
        }
        if self.max_strategy_rating == 0 {
            return Err(CoreError::DomainOutOfRange("max_strategy_rating"));
        }
        Ok(())
    }
}
