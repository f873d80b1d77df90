//! Nonlinear least squares for `id = k (vgs - vt)^2`.
//!
//! Levenberg–Marquardt with Marquardt's diagonal scaling. Each damped step
//!
//! ```text
//! (JᵀJ + λ D²) δ = Jᵀ r
//! ```
//!
//! is solved as the augmented least squares problem `[J; sqrt(λ) D] δ ≈ [r; 0]`
//! so the SVD solver never forms `JᵀJ` explicitly.
//!
//! The model is not convex in `vt`, so several starting points are refined
//! independently (in parallel) and the lowest SSE wins:
//! - the linearized seed (`sqrt(id)` regression)
//! - the unit start `k = 1, vt = 1`
//! - the linearized seed with `vt` shifted down and up
//!
//! The one-sigma parameter errors come from the usual covariance estimate
//! `(JᵀJ)⁻¹ · SSE / (n - 2)` at the solution.

use nalgebra::{DMatrix, DVector, Matrix2};
use rayon::prelude::*;
use tracing::debug;

use crate::domain::{FetParams, FitMethod, FitReport, FitUncertainty, Measurement};
use crate::error::{AppError, EXIT_NO_DATA};
use crate::fit::fit_quality;
use crate::fit::seed::linearized_seed;
use crate::math::solve_least_squares;
use crate::models::{fill_jacobian_row, idrain};

/// Two parameters plus at least one degree of freedom.
pub const MIN_POINTS: usize = 3;

/// Threshold shifts (V) applied to the linearized seed for extra starts.
const VT_SHIFTS: [f64; 2] = [-0.5, 0.5];

#[derive(Debug, Clone)]
pub struct LmOptions {
    pub max_iters: usize,
    /// Relative step size below which the fit is considered converged.
    pub xtol: f64,
    /// Relative SSE reduction below which the fit is considered converged.
    pub ftol: f64,
    pub lambda0: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iters: 500,
            xtol: 1e-12,
            ftol: 1e-15,
            lambda0: 1e-3,
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    idx: usize,
    k: f64,
    vt: f64,
    sse: f64,
    iters: usize,
}

/// Fit `k` and `vt` to the measurements.
pub fn fit_square_law(points: &[Measurement], opts: &LmOptions) -> Result<FitReport, AppError> {
    if points.len() < MIN_POINTS {
        return Err(AppError::new(
            EXIT_NO_DATA,
            format!(
                "Need at least {MIN_POINTS} measurements to fit k and vt (got {}).",
                points.len()
            ),
        ));
    }

    let starts = starting_points(points);
    debug!(?starts, "levenberg-marquardt starts");

    let candidates: Vec<Candidate> = starts
        .par_iter()
        .enumerate()
        .filter_map(|(idx, &(k, vt))| run_lm(points, k, vt, opts).map(|c| Candidate { idx, ..c }))
        .collect();

    // Deterministic selection: pick the minimum SSE; break ties by start index.
    let best = candidates
        .iter()
        .reduce(|best, c| {
            if c.sse < best.sse || (c.sse == best.sse && c.idx < best.idx) {
                c
            } else {
                best
            }
        })
        .ok_or_else(|| AppError::numeric("Least squares fit did not converge from any start."))?;
    debug!(start = best.idx, iters = best.iters, sse = best.sse, "best start");

    let params = FetParams::new(best.k, best.vt);
    Ok(FitReport {
        params,
        uncertainty: uncertainty(points, &params, best.sse),
        quality: fit_quality(points, &params),
        method: FitMethod::Lm,
    })
}

fn starting_points(points: &[Measurement]) -> Vec<(f64, f64)> {
    let mut starts = Vec::with_capacity(2 + VT_SHIFTS.len());
    let seed = linearized_seed(points);
    if let Some(s) = seed {
        starts.push((s.k, s.vt));
    }
    starts.push((1.0, 1.0));
    if let Some(s) = seed {
        for shift in VT_SHIFTS {
            starts.push((s.k, s.vt + shift));
        }
    }
    starts
}

fn sse_of(points: &[Measurement], k: f64, vt: f64) -> f64 {
    points
        .iter()
        .map(|p| {
            let r = p.id - idrain(p.vgs, k, vt);
            r * r
        })
        .sum()
}

fn run_lm(points: &[Measurement], k0: f64, vt0: f64, opts: &LmOptions) -> Option<Candidate> {
    let n = points.len();
    let (mut k, mut vt) = (k0, vt0);
    let mut sse = sse_of(points, k, vt);
    if !sse.is_finite() {
        return None;
    }

    let mut lambda = opts.lambda0;
    let mut row = [0.0; 2];
    let mut iters = 0;

    while iters < opts.max_iters {
        iters += 1;

        let mut a = DMatrix::<f64>::zeros(n + 2, 2);
        let mut b = DVector::<f64>::zeros(n + 2);
        for (i, p) in points.iter().enumerate() {
            fill_jacobian_row(p.vgs, k, vt, &mut row);
            a[(i, 0)] = row[0];
            a[(i, 1)] = row[1];
            b[i] = p.id - idrain(p.vgs, k, vt);
        }

        // Marquardt scaling: damp each parameter relative to its column norm.
        let d0 = a.view((0, 0), (n, 1)).norm().max(f64::MIN_POSITIVE);
        let d1 = a.view((0, 1), (n, 1)).norm().max(f64::MIN_POSITIVE);
        let sl = lambda.sqrt();
        a[(n, 0)] = sl * d0;
        a[(n + 1, 1)] = sl * d1;

        let Some(delta) = solve_least_squares(&a, &b) else {
            lambda *= 10.0;
            if lambda > 1e16 {
                break;
            }
            continue;
        };

        let (k_new, vt_new) = (k + delta[0], vt + delta[1]);
        let sse_new = sse_of(points, k_new, vt_new);

        if sse_new.is_finite() && sse_new <= sse {
            let small_step = delta[0].abs() <= opts.xtol * (k.abs() + opts.xtol)
                && delta[1].abs() <= opts.xtol * (vt.abs() + opts.xtol);
            let small_gain = sse - sse_new <= opts.ftol * sse;

            k = k_new;
            vt = vt_new;
            sse = sse_new;
            lambda = (lambda / 10.0).max(1e-15);

            if small_step || small_gain || sse == 0.0 {
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e16 {
                break;
            }
        }
    }

    (k.is_finite() && vt.is_finite()).then_some(Candidate {
        idx: 0,
        k,
        vt,
        sse,
        iters,
    })
}

fn uncertainty(points: &[Measurement], params: &FetParams, sse: f64) -> Option<FitUncertainty> {
    let n = points.len();
    if n <= 2 {
        return None;
    }

    let mut jtj = Matrix2::<f64>::zeros();
    let mut row = [0.0; 2];
    for p in points {
        fill_jacobian_row(p.vgs, params.k, params.vt, &mut row);
        jtj[(0, 0)] += row[0] * row[0];
        jtj[(0, 1)] += row[0] * row[1];
        jtj[(1, 0)] += row[1] * row[0];
        jtj[(1, 1)] += row[1] * row[1];
    }

    let cov = jtj.try_inverse()? * (sse / (n - 2) as f64);
    let (var_k, var_vt) = (cov[(0, 0)], cov[(1, 1)]);
    if !(var_k >= 0.0 && var_vt >= 0.0) {
        return None;
    }
    Some(FitUncertainty {
        k_err: var_k.sqrt(),
        vt_err: var_vt.sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::testdata::exact_sweep;

    #[test]
    fn recovers_exact_parameters() {
        let pts = exact_sweep(0.045, 2.1, 4.5, 20);
        let r = fit_square_law(&pts, &LmOptions::default()).unwrap();
        assert!((r.params.k - 0.045).abs() < 1e-9);
        assert!((r.params.vt - 2.1).abs() < 1e-7);
        assert!(r.quality.sse < 1e-18);
        let u = r.uncertainty.unwrap();
        assert!(u.k_err < 1e-6 && u.vt_err < 1e-6);
    }

    #[test]
    fn converges_from_unit_start_alone() {
        let pts = exact_sweep(0.02, 1.5, 4.0, 15);
        let c = run_lm(&pts, 1.0, 1.0, &LmOptions::default()).unwrap();
        assert!((c.k - 0.02).abs() < 1e-6, "k={}", c.k);
        assert!((c.vt - 1.5).abs() < 1e-4, "vt={}", c.vt);
    }

    #[test]
    fn noisy_data_reports_uncertainty() {
        // Deterministic ±2 % alternating error.
        let pts: Vec<Measurement> = exact_sweep(0.03, 2.0, 5.0, 16)
            .into_iter()
            .enumerate()
            .map(|(i, p)| Measurement {
                vgs: p.vgs,
                id: p.id * if i % 2 == 0 { 1.02 } else { 0.98 },
            })
            .collect();
        let r = fit_square_law(&pts, &LmOptions::default()).unwrap();
        assert!((r.params.k - 0.03).abs() / 0.03 < 0.05);
        assert!((r.params.vt - 2.0).abs() < 0.1);
        let u = r.uncertainty.unwrap();
        assert!(u.k_err > 0.0 && u.vt_err > 0.0);
        assert!(r.quality.r_squared.unwrap() > 0.99);
    }

    #[test]
    fn too_few_points_is_an_error() {
        let pts = exact_sweep(0.03, 2.0, 5.0, 2);
        let err = fit_square_law(&pts, &LmOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_NO_DATA);
    }
}
