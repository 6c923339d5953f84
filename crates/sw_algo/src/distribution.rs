//! Equal split of 100 across N indicators in steps of G.
//!
//! Contract:
//! - `base = floor(100 / N / G) * G`, the largest multiple of G with N·base ≤ 100.
//! - The first `floor((100 - N·base) / G)` indicators (selection order) get `base + G`.
//! - Any leftover that is still a whole multiple of G is pushed ±G round-robin,
//!   skipping indicators that would leave `[0, 100]`.
//! - The fix-up stops after a full pass with no move; whatever is left is
//!   reported as `residual` (non-zero only when G does not divide 100).

use sw_core::rounding::{round2, TOTAL};

use crate::allocation::AllocationState;

/// Float slack when comparing the leftover against one step.
const STEP_EPS: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq)]
pub struct Distribution {
    /// One weight per requested slot, in input order.
    pub weights: Vec<f64>,
    /// `100 - sum(weights)`; 0 whenever G divides 100.
    pub residual: f64,
}

pub fn distribute_evenly(n: usize, step: f64) -> Distribution {
    if n == 0 || !(step.is_finite() && step > 0.0) {
        return Distribution { weights: vec![0.0; n], residual: TOTAL };
    }

    let nf = n as f64;
    let base = (TOTAL / nf / step).floor() * step;
    let remainder = TOTAL - base * nf;
    let increments = ((remainder + STEP_EPS) / step).floor() as usize;

    let mut weights: Vec<f64> = (0..n)
        .map(|i| if i < increments { base + step } else { base })
        .map(round2)
        .collect();

    let mut diff = round2(TOTAL - weights.iter().sum::<f64>());
    let mut cursor = 0usize;
    let mut idle = 0usize;
    while diff.abs() + STEP_EPS >= step && idle < n {
        let delta = if diff > 0.0 { step } else { -step };
        let candidate = weights[cursor] + delta;
        if (0.0..=TOTAL).contains(&candidate) {
            weights[cursor] = round2(candidate);
            diff = round2(diff - delta);
            idle = 0;
        } else {
            idle += 1;
        }
        cursor = (cursor + 1) % n;
    }

    let residual = round2(TOTAL - weights.iter().sum::<f64>());
    Distribution { weights, residual }
}

impl AllocationState {
    /// Equal split over the non-excluded rows; excluded rows keep their weight.
    /// The prior entries become the undo snapshot. Returns the residual too.
    pub fn auto_distribute(&self, step: f64) -> (Self, f64) {
        let active: Vec<usize> = self
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.excluded)
            .map(|(i, _)| i)
            .collect();
        if active.is_empty() {
            return (self.clone(), TOTAL);
        }

        let dist = distribute_evenly(active.len(), step);
        let mut entries = self.entries().to_vec();
        for (slot, &idx) in active.iter().enumerate() {
            entries[idx].weight = dist.weights[slot];
        }
        (self.with_snapshot(entries), dist.residual)
    }
}
