//! Linearized starting point.
//!
//! In saturation `sqrt(id) = sqrt(k) * (vgs - vt)` is a straight line in
//! `vgs`, so an ordinary regression of `sqrt(id)` on `vgs` gives
//! `k = slope²` and `vt = -intercept / slope`. It is biased under noise
//! (the square root distorts the error distribution) but lands close enough
//! for the nonlinear refinement to converge.

use nalgebra::{DMatrix, DVector};

use crate::domain::{FetParams, Measurement};
use crate::math::solve_least_squares;

/// Seed `k`/`vt` from the points with positive drain current.
///
/// Returns `None` when fewer than two distinct `vgs` values carry current or
/// the fitted slope is not positive.
pub fn linearized_seed(points: &[Measurement]) -> Option<FetParams> {
    let usable: Vec<&Measurement> = points.iter().filter(|p| p.id > 0.0).collect();
    if usable.len() < 2 {
        return None;
    }
    let first = usable[0].vgs;
    if usable.iter().all(|p| p.vgs == first) {
        return None;
    }

    let n = usable.len();
    let mut x = DMatrix::<f64>::zeros(n, 2);
    let mut y = DVector::<f64>::zeros(n);
    for (i, p) in usable.iter().enumerate() {
        x[(i, 0)] = 1.0;
        x[(i, 1)] = p.vgs;
        y[i] = p.id.sqrt();
    }

    let beta = solve_least_squares(&x, &y)?;
    let (intercept, slope) = (beta[0], beta[1]);
    if !(slope > 0.0) {
        return None;
    }

    let params = FetParams::new(slope * slope, -intercept / slope);
    params.is_valid().then_some(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::testdata::exact_sweep;

    #[test]
    fn exact_data_gives_exact_seed() {
        let pts = exact_sweep(0.03, 1.7, 4.0, 10);
        let seed = linearized_seed(&pts).unwrap();
        assert!((seed.k - 0.03).abs() < 1e-10);
        assert!((seed.vt - 1.7).abs() < 1e-8);
    }

    #[test]
    fn degenerate_inputs_have_no_seed() {
        let flat = vec![
            Measurement { vgs: 3.0, id: 0.01 },
            Measurement { vgs: 3.0, id: 0.02 },
        ];
        assert!(linearized_seed(&flat).is_none());

        let no_current = vec![
            Measurement { vgs: 1.0, id: 0.0 },
            Measurement { vgs: 2.0, id: 0.0 },
        ];
        assert!(linearized_seed(&no_current).is_none());

        let falling = vec![
            Measurement { vgs: 1.0, id: 0.04 },
            Measurement { vgs: 2.0, id: 0.01 },
        ];
        assert!(linearized_seed(&falling).is_none());
    }
}
