//! Square-law parameter estimation.
//!
//! Responsibilities:
//!
//! - derive a starting point from the linearized model (`seed`)
//! - refine `k`/`vt` by nonlinear least squares from several starts (`levenberg`)
//! - the alternative closed-form threshold bisection (`bisection`)
//! - dispatch on `FitMethod` and compute fit quality

pub mod bisection;
pub mod levenberg;
pub mod seed;

pub use bisection::*;
pub use levenberg::*;
pub use seed::*;

use tracing::info;

use crate::domain::{FetParams, FitMethod, FitQuality, FitReport, Measurement};
use crate::error::AppError;
use crate::models::predict;

/// Fit the square-law model with the requested method.
///
/// `bisect_seed` is only used by `FitMethod::Bisect`; `None` picks the
/// smallest measured `vgs` as the upper bracket.
pub fn fit_measurements(
    points: &[Measurement],
    method: FitMethod,
    bisect_seed: Option<f64>,
) -> Result<FitReport, AppError> {
    let report = match method {
        FitMethod::Lm => fit_square_law(points, &LmOptions::default())?,
        FitMethod::Bisect => {
            let seed = bisect_seed.unwrap_or_else(|| {
                points
                    .iter()
                    .map(|p| p.vgs)
                    .fold(f64::INFINITY, f64::min)
            });
            fit_bisection(points, seed)?
        }
    };
    info!(
        method = report.method.display_name(),
        k = report.params.k,
        vt = report.params.vt,
        rmse = report.quality.rmse,
        "fit complete"
    );
    Ok(report)
}

/// SSE, RMSE and R² of a parameter set against the measurements.
pub fn fit_quality(points: &[Measurement], params: &FetParams) -> FitQuality {
    let n = points.len();
    let sse: f64 = points
        .iter()
        .map(|p| {
            let r = p.id - predict(params, p.vgs);
            r * r
        })
        .sum();

    let mean = points.iter().map(|p| p.id).sum::<f64>() / n.max(1) as f64;
    let sst: f64 = points.iter().map(|p| (p.id - mean) * (p.id - mean)).sum();
    let r_squared = (sst > 0.0).then(|| 1.0 - sse / sst);

    FitQuality {
        sse,
        rmse: (sse / n.max(1) as f64).sqrt(),
        r_squared,
        n,
    }
}
