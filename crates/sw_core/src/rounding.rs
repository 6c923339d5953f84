//! Weight arithmetic: clamping, step rounding and tolerance comparison.
//!
//! Weights are percentages. Every helper here is total: NaN and infinities
//! are folded into the valid range instead of propagating.

/// The target sum of one strategy's allocation.
pub const TOTAL: f64 = 100.0;

/// Clamp into `[0, 100]`; NaN maps to 0.
#[inline]
pub fn clamp_weight(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, TOTAL)
    }
}

/// Round to the nearest multiple of `step` (half away from zero), then clamp.
/// A non-positive step only clamps.
pub fn round_to_step(v: f64, step: f64) -> f64 {
    let v = clamp_weight(v);
    if step.is_nan() || step <= 0.0 {
        return v;
    }
    clamp_weight((v / step).round() * step)
}

/// Round to 2 decimal places (half away from zero).
#[inline]
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[inline]
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// `|sum - 100| <= tol`.
#[inline]
pub fn sums_to_total(sum: f64, tol: f64) -> bool {
    approx_eq(sum, TOTAL, tol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_handles_edges() {
        assert_eq!(clamp_weight(-3.0), 0.0);
        assert_eq!(clamp_weight(140.0), 100.0);
        assert_eq!(clamp_weight(f64::NAN), 0.0);
        assert_eq!(clamp_weight(f64::INFINITY), 100.0);
        assert_eq!(clamp_weight(42.5), 42.5);
    }

    #[test]
    fn step_rounding() {
        assert_eq!(round_to_step(42.0, 5.0), 40.0);
        assert_eq!(round_to_step(42.5, 5.0), 45.0);
        assert_eq!(round_to_step(43.0, 5.0), 45.0);
        assert_eq!(round_to_step(33.4, 1.0), 33.0);
        assert_eq!(round_to_step(99.0, 5.0), 100.0);
        assert_eq!(round_to_step(120.0, 5.0), 100.0);
        assert_eq!(round_to_step(7.3, 0.0), 7.3);
    }

    #[test]
    fn two_decimals() {
        assert_eq!(round2(100.0 / 3.0), 33.33);
        assert_eq!(round2(200.0 / 3.0), 66.67);
    }

    #[test]
    fn tolerance() {
        assert!(sums_to_total(99.995, 0.01));
        assert!(!sums_to_total(99.95, 0.01));
        assert!(sums_to_total(99.95, 0.1));
    }
}
