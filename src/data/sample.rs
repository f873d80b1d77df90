//! Synthetic `vgs`/`id` sweeps from known square-law parameters.
//!
//! Useful for checking the fitters end to end and for trying the stage
//! designer without a bench. Generation is deterministic for a given seed.
//!
//! Noise model:
//! - multiplicative Gaussian error on the drain current (`noise_rel`)
//! - additive Gaussian error on the gate voltage reading (`vgs_noise`, V)
//! - currents are clamped at zero (an ammeter does not read negative)

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{FetParams, Measurement};
use crate::error::AppError;
use crate::math::linspace;
use crate::models::idrain;

#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    pub params: FetParams,
    /// First gate voltage of the sweep; defaults to `vt + 0.2`.
    pub vgs_start: Option<f64>,
    pub vgs_stop: f64,
    pub count: usize,
    /// Relative one-sigma error on `id`.
    pub noise_rel: f64,
    /// One-sigma error on the `vgs` reading (V).
    pub vgs_noise: f64,
    pub seed: u64,
}

pub fn generate_measurements(config: &SynthConfig) -> Result<Vec<Measurement>, AppError> {
    let FetParams { k, vt } = config.params;
    if !config.params.is_valid() {
        return Err(AppError::input("Synthetic device needs k > 0 and a finite vt."));
    }
    if config.count < 2 {
        return Err(AppError::input("Sample count must be >= 2."));
    }
    let start = config.vgs_start.unwrap_or(vt + 0.2);
    if !(start.is_finite() && config.vgs_stop.is_finite() && config.vgs_stop > start) {
        return Err(AppError::input(format!(
            "Invalid sweep range: {start} V to {} V.",
            config.vgs_stop
        )));
    }
    if !(config.noise_rel >= 0.0 && config.vgs_noise >= 0.0) {
        return Err(AppError::input("Noise levels must be >= 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let id_noise = Normal::new(0.0, config.noise_rel)
        .map_err(|e| AppError::numeric(format!("Noise distribution error: {e}")))?;
    let vgs_noise = Normal::new(0.0, config.vgs_noise)
        .map_err(|e| AppError::numeric(format!("Noise distribution error: {e}")))?;

    let points = linspace(start, config.vgs_stop, config.count)
        .into_iter()
        .map(|vgs| {
            let id = idrain(vgs, k, vt) * (1.0 + id_noise.sample(&mut rng));
            let vgs_read = vgs + vgs_noise.sample(&mut rng);
            Measurement {
                vgs: vgs_read,
                id: id.max(0.0),
            }
        })
        .collect();

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> SynthConfig {
        SynthConfig {
            params: FetParams::new(0.025, 2.1),
            vgs_start: None,
            vgs_stop: 5.0,
            count: 20,
            noise_rel: 0.02,
            vgs_noise: 0.005,
            seed,
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let a = generate_measurements(&config(7)).unwrap();
        let b = generate_measurements(&config(7)).unwrap();
        let c = generate_measurements(&config(8)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 20);
    }

    #[test]
    fn noiseless_sweep_follows_model() {
        let cfg = SynthConfig {
            noise_rel: 0.0,
            vgs_noise: 0.0,
            ..config(1)
        };
        let pts = generate_measurements(&cfg).unwrap();
        assert!((pts[0].vgs - 2.3).abs() < 1e-12);
        for p in &pts {
            assert!((p.id - idrain(p.vgs, 0.025, 2.1)).abs() < 1e-15);
        }
    }

    #[test]
    fn fitted_synthetic_data_recovers_parameters() {
        let pts = generate_measurements(&config(42)).unwrap();
        let r = crate::fit::fit_measurements(&pts, crate::domain::FitMethod::Lm, None).unwrap();
        assert!((r.params.k - 0.025).abs() / 0.025 < 0.1, "k={}", r.params.k);
        assert!((r.params.vt - 2.1).abs() < 0.15, "vt={}", r.params.vt);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        let cfg = SynthConfig {
            vgs_stop: 1.0,
            ..config(1)
        };
        assert!(generate_measurements(&cfg).is_err());
    }
}
