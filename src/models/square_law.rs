//! Square-law model of an N-channel enhancement-mode FET.
//!
//! The fitters rely on two primitive operations:
//! - predict `id(vgs)` given `k` and `vt`
//! - fill a Jacobian row `[∂id/∂k, ∂id/∂vt]` (for Gauss–Newton steps)
//!
//! The model is evaluated as a plain parabola on both sides of `vt`. Callers
//! that care about the operating region (the stage solver) check it explicitly.

use crate::domain::FetParams;

/// Drain current `k * (vgs - vt)^2`.
pub fn idrain(vgs: f64, k: f64, vt: f64) -> f64 {
    let vov = vgs - vt;
    k * vov * vov
}

/// Small-signal transconductance `2k * (vgs - vt)`.
pub fn gm(vgs: f64, k: f64, vt: f64) -> f64 {
    2.0 * k * (vgs - vt)
}

/// Predict `id` for a parameter set.
pub fn predict(params: &FetParams, vgs: f64) -> f64 {
    idrain(vgs, params.k, params.vt)
}

/// Fill the model Jacobian row for one observation.
///
/// # Panics
/// Panics if `out` has fewer than two elements.
pub fn fill_jacobian_row(vgs: f64, k: f64, vt: f64, out: &mut [f64]) {
    let vov = vgs - vt;
    out[0] = vov * vov;
    out[1] = -2.0 * k * vov;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idrain_is_zero_at_threshold() {
        assert_eq!(idrain(2.0, 0.05, 2.0), 0.0);
        assert!((idrain(3.0, 0.05, 2.0) - 0.05).abs() < 1e-15);
    }

    #[test]
    fn gm_matches_numerical_derivative() {
        let (k, vt, vgs) = (0.02, 1.8, 3.1);
        let h = 1e-6;
        let numeric = (idrain(vgs + h, k, vt) - idrain(vgs - h, k, vt)) / (2.0 * h);
        assert!((gm(vgs, k, vt) - numeric).abs() < 1e-8);
    }

    #[test]
    fn jacobian_matches_numerical_derivatives() {
        let (k, vt, vgs) = (0.03, 2.2, 3.5);
        let mut row = [0.0; 2];
        fill_jacobian_row(vgs, k, vt, &mut row);

        let h = 1e-7;
        let dk = (idrain(vgs, k + h, vt) - idrain(vgs, k - h, vt)) / (2.0 * h);
        let dvt = (idrain(vgs, k, vt + h) - idrain(vgs, k, vt - h)) / (2.0 * h);
        assert!((row[0] - dk).abs() < 1e-6);
        assert!((row[1] - dvt).abs() < 1e-6);
    }
}
