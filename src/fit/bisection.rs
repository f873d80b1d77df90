//! Threshold bisection.
//!
//! For a fixed `vt` the least-squares `k` has the closed form
//!
//! ```text
//! k(vt) = Σ y u² / Σ u⁴,   u = x - vt
//! ```
//!
//! and the stationarity condition in `vt` reduces to a scalar equation
//!
//! ```text
//! d(vt) = Σ u y - k(vt) · Σ u³ = 0
//! ```
//!
//! which is solved by bisection on `[0, seed]`. `d` is not monotonic far from
//! the root, so a poor seed converges to the wrong place; the result is
//! cross-checked against the second closed form `k₂ = Σ u y / Σ u³`, which
//! only agrees with `k(vt)` at a root of `d`. Sampling `d` over a voltage
//! range (`aux_polynomial`) shows where a good seed lies.

use tracing::debug;

use crate::domain::{FetParams, FitMethod, FitReport, Measurement};
use crate::error::{AppError, EXIT_NO_DATA};
use crate::fit::fit_quality;
use crate::math::linspace;

const MAX_ITERS: usize = 200;

/// Relative tolerance for the `k(vt)` vs `k₂` cross-check.
const CROSS_CHECK_TOL: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
struct Moments {
    /// Σ u y
    s1y: f64,
    /// Σ u² y
    s2y: f64,
    /// Σ u³
    s3: f64,
    /// Σ u⁴
    s4: f64,
}

fn moments(points: &[Measurement], vt: f64) -> Moments {
    let mut m = Moments {
        s1y: 0.0,
        s2y: 0.0,
        s3: 0.0,
        s4: 0.0,
    };
    for p in points {
        let u = p.vgs - vt;
        let u2 = u * u;
        m.s1y += u * p.id;
        m.s2y += u2 * p.id;
        m.s3 += u2 * u;
        m.s4 += u2 * u2;
    }
    m
}

/// The auxiliary function `d(vt)` whose root is the fitted threshold.
pub fn aux_value(points: &[Measurement], vt: f64) -> f64 {
    let m = moments(points, vt);
    m.s1y - m.s2y / m.s4 * m.s3
}

/// Sample `d(v)` on `n` points over `[start, stop]`.
pub fn aux_polynomial(points: &[Measurement], start: f64, stop: f64, n: usize) -> Vec<(f64, f64)> {
    linspace(start, stop, n)
        .into_iter()
        .map(|v| (v, aux_value(points, v)))
        .filter(|(_, d)| d.is_finite())
        .collect()
}

/// Fit `k`/`vt` by bisection of `d(vt)` on `[0, seed]`.
pub fn fit_bisection(points: &[Measurement], seed: f64) -> Result<FitReport, AppError> {
    if points.len() < 2 {
        return Err(AppError::new(
            EXIT_NO_DATA,
            format!("Need at least 2 measurements for bisection (got {}).", points.len()),
        ));
    }
    if !(seed.is_finite() && seed > 0.0) {
        return Err(AppError::input(format!("Bisection seed must be > 0 (got {seed}).")));
    }

    let (mut lo, mut hi) = (0.0_f64, seed);
    let mut vt = 0.5 * (lo + hi);
    let mut iters = 0;
    while (lo - hi).abs() > 10.0 * f64::EPSILON * lo && iters < MAX_ITERS {
        iters += 1;
        vt = 0.5 * (lo + hi);
        let d = aux_value(points, vt);
        if d > 0.0 {
            hi = vt;
        } else if d < 0.0 {
            lo = vt;
        } else {
            break;
        }
    }
    debug!(iters, vt, seed, "threshold bisection");

    let m = moments(points, vt);
    let k = m.s2y / m.s4;
    let k2 = m.s1y / m.s3;
    if !(k.is_finite() && k2.is_finite()) || (k - k2).abs() > CROSS_CHECK_TOL * k.abs() {
        debug!(k, k2, "bisection cross-check failed");
        return Err(AppError::numeric(
            "fit invalid, try a different seed estimated from aux polynomial",
        ));
    }

    let params = FetParams::new(k, vt);
    Ok(FitReport {
        params,
        uncertainty: None,
        quality: fit_quality(points, &params),
        method: FitMethod::Bisect,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::testdata::exact_sweep;

    #[test]
    fn aux_vanishes_at_true_threshold() {
        let pts = exact_sweep(0.02, 2.0, 5.0, 15);
        assert!(aux_value(&pts, 2.0).abs() < 1e-12);
        assert!(aux_value(&pts, 1.5) < 0.0);
        assert!(aux_value(&pts, 2.1) > 0.0);
    }

    #[test]
    fn good_seed_recovers_parameters() {
        let pts = exact_sweep(0.02, 2.0, 5.0, 15);
        let r = fit_bisection(&pts, 3.0).unwrap();
        assert!((r.params.vt - 2.0).abs() < 1e-6);
        assert!((r.params.k - 0.02).abs() < 1e-8);
        assert!(r.uncertainty.is_none());
    }

    #[test]
    fn bad_seed_is_rejected() {
        // The first midpoint lands where d < 0 far above the root and the
        // search runs off towards the seed.
        let pts = exact_sweep(0.02, 2.0, 5.0, 15);
        let err = fit_bisection(&pts, 10.0).unwrap_err();
        assert!(err.message().contains("fit invalid"));
    }

    #[test]
    fn aux_polynomial_samples_range() {
        let pts = exact_sweep(0.02, 2.0, 5.0, 15);
        let curve = aux_polynomial(&pts, 0.0, 10.0, 101);
        assert_eq!(curve.len(), 101);
        assert_eq!(curve[0].0, 0.0);
        assert!((curve[100].0 - 10.0).abs() < 1e-12);
    }
}
