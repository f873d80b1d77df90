//! Common-source amplifier stage with voltage-divider bias.
//!
//! Topology:
//!
//! ```text
//!   Vdd ──┬───────────┐
//!         R1          Rd
//!   in ─Rg┤ gate      ├── out (drain)
//!         R2        FET
//!         │           Rs
//!   GND ──┴───────────┘
//! ```
//!
//! Design goes from a gain target to a network:
//!
//! 1. `A = 10^(G/20)` and `gm = 2k(vgs - vt)` give the target `vgsq`
//!    for `A = gm * Rd`
//! 2. the square law gives the target `idq`, and `vgq = vgsq + idq * Rs`
//! 3. the closest standard divider to `vgq` sets R1/R2 (scaled by `10^odiv`)
//! 4. the quiescent point is re-solved with the real (rounded) network
//!
//! Solving the quiescent point with source degeneration means solving
//! `vg = vgs + Rs * k * (vgs - vt)^2` for `vgs`, a quadratic with exactly one
//! root above `vt` whenever `vg > vt`.

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{DesignConfig, ESeries, FetParams};
use crate::error::AppError;
use crate::math::quadratic_roots;
use crate::models::idrain;
use crate::resistor::{best_divider, nearest_standard};
use crate::stage::fet::{Fet, RegionError};

/// Resistor values of the bias network (Ω).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BiasNetwork {
    pub r1: f64,
    pub r2: f64,
    pub rd: f64,
    pub rs: f64,
    /// Gate series resistor used to raise the input impedance.
    pub rg: f64,
}

/// Quiescent point of the stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OperatingPoint {
    pub vgs: f64,
    pub vds: f64,
    pub vd: f64,
    pub vg: f64,
    pub vs: f64,
    pub id: f64,
    pub gm: f64,
}

/// Distance of the quiescent point from each operating limit.
///
/// All margins are positive for a valid design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Headroom {
    /// `vgs - vt` (V): distance from cutoff.
    pub overdrive: f64,
    /// `vds - (vgs - vt)` (V): distance from the saturation edge.
    pub saturation: f64,
    /// `vd - vg` (V): distance from the triode check.
    pub gate_drain: f64,
    /// `id_max - id` (A).
    pub current: f64,
    /// Drain swing available towards the supply (V).
    pub swing_up: f64,
    /// Drain swing available towards the saturation edge (V).
    pub swing_down: f64,
}

/// Bias targets derived from a gain requirement, before any rounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BiasTargets {
    pub gain_db: f64,
    /// Linear voltage gain `10^(G/20)`.
    pub gain: f64,
    pub vgsq: f64,
    pub idq: f64,
    pub vgq: f64,
}

/// Target `vgsq`/`idq`/`vgq` for a gain (dB) with the given drain and source
/// resistors.
pub fn bias_targets(params: &FetParams, gain_db: f64, rd: f64, rs: f64) -> BiasTargets {
    let gain = 10f64.powf(gain_db / 20.0);
    let vgsq = gain / (2.0 * params.k * rd) + params.vt;
    let idq = idrain(vgsq, params.k, params.vt);
    BiasTargets {
        gain_db,
        gain,
        vgsq,
        idq,
        vgq: vgsq + idq * rs,
    }
}

fn parallel(a: f64, b: f64) -> f64 {
    if a + b == 0.0 { 0.0 } else { a * b / (a + b) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommonSourceStage {
    fet: Fet,
    vdd: f64,
    network: BiasNetwork,
    series: ESeries,
}

impl CommonSourceStage {
    /// Build a stage from an explicit network and solve its quiescent point.
    pub fn new(
        params: FetParams,
        vdd: f64,
        network: BiasNetwork,
        id_max: f64,
        series: ESeries,
    ) -> Result<Self, RegionError> {
        let mut stage = Self {
            fet: Fet::new(params).with_id_max(id_max),
            vdd,
            network,
            series,
        };
        stage.solve()?;
        Ok(stage)
    }

    /// Design the bias network for a gain target and solve the result.
    ///
    /// `rd`/`rs` are snapped to the configured series first. With a `zi`
    /// target the gate resistor makes up the difference between `zi` and
    /// `R1 ‖ R2` (zero when the divider alone already exceeds it).
    pub fn from_gain(params: FetParams, cfg: &DesignConfig) -> Result<Self, AppError> {
        if !params.is_valid() {
            return Err(AppError::input(format!(
                "Invalid device parameters: k={} A/V², vt={} V (k must be > 0).",
                params.k, params.vt
            )));
        }
        if !(cfg.vdd.is_finite() && cfg.vdd > 0.0) {
            return Err(AppError::input("Vdd must be > 0."));
        }

        let rd = nearest_standard(cfg.rd, cfg.series);
        let rs = nearest_standard(cfg.rs, cfg.series);
        if rd <= 0.0 {
            return Err(AppError::input("Rd must be > 0."));
        }

        let targets = bias_targets(&params, cfg.gain_db, rd, rs);
        debug!(?targets, rd, rs, "bias targets");
        if targets.vgq >= cfg.vdd {
            warn!(
                vgq = targets.vgq,
                vdd = cfg.vdd,
                "target gate voltage is above the supply; the divider will saturate"
            );
        }

        let divider = best_divider(cfg.vdd, targets.vgq, cfg.series).ok_or_else(|| {
            AppError::numeric(format!(
                "Cannot build a divider for a target gate voltage of {} V.",
                targets.vgq
            ))
        })?;
        let (r1, r2) = divider.scaled(cfg.odiv);
        debug!(r1, r2, vout = divider.vout, error = divider.error, "divider");

        let rg = match cfg.zi {
            Some(zi) => nearest_standard(zi - parallel(r1, r2), cfg.series),
            None => 0.0,
        };

        let network = BiasNetwork { r1, r2, rd, rs, rg };
        Ok(Self::new(params, cfg.vdd, network, cfg.id_max, cfg.series)?)
    }

    /// Solve the quiescent point for the current network and check the region.
    fn solve(&mut self) -> Result<(), RegionError> {
        let FetParams { k, vt } = self.fet.params;
        let BiasNetwork { r1, r2, rd, rs, .. } = self.network;

        let vg = self.vdd * r2 / (r1 + r2);
        if !vg.is_finite() {
            return Err(RegionError::Cutoff);
        }

        let a = rs * k;
        let b = 1.0 - 2.0 * rs * k * vt;
        let c = rs * k * vt * vt - vg;
        let vgs = quadratic_roots(a, b, c)
            .into_iter()
            .filter(|&x| x > vt)
            .last()
            .ok_or(RegionError::Cutoff)?;

        let id = idrain(vgs, k, vt);
        self.fet.vg = vg;
        self.fet.vs = id * rs;
        self.fet.vd = self.vdd - id * rd;
        debug!(vg, vgs, id, vd = self.fet.vd, "quiescent point");

        self.fet.check()
    }

    /// Apply a network/supply change and re-solve.
    ///
    /// The stage is left untouched when the new quiescent point is invalid.
    fn update(&mut self, apply: impl FnOnce(&mut Self)) -> Result<(), RegionError> {
        let mut next = self.clone();
        apply(&mut next);
        next.solve()?;
        *self = next;
        Ok(())
    }

    pub fn set_vdd(&mut self, vdd: f64) -> Result<(), RegionError> {
        self.update(|s| s.vdd = vdd)
    }

    pub fn set_r1(&mut self, r1: f64) -> Result<(), RegionError> {
        self.update(|s| s.network.r1 = r1)
    }

    pub fn set_r2(&mut self, r2: f64) -> Result<(), RegionError> {
        self.update(|s| s.network.r2 = r2)
    }

    pub fn set_rd(&mut self, rd: f64) -> Result<(), RegionError> {
        self.update(|s| s.network.rd = rd)
    }

    pub fn set_rs(&mut self, rs: f64) -> Result<(), RegionError> {
        self.update(|s| s.network.rs = rs)
    }

    /// `rg` only affects the input impedance.
    pub fn set_rg(&mut self, rg: f64) {
        self.network.rg = rg;
    }

    pub fn params(&self) -> FetParams {
        self.fet.params
    }

    pub fn vdd(&self) -> f64 {
        self.vdd
    }

    pub fn network(&self) -> BiasNetwork {
        self.network
    }

    pub fn series(&self) -> ESeries {
        self.series
    }

    pub fn id_max(&self) -> f64 {
        self.fet.id_max
    }

    pub fn operating_point(&self) -> OperatingPoint {
        OperatingPoint {
            vgs: self.fet.vgs(),
            vds: self.fet.vds(),
            vd: self.fet.vd,
            vg: self.fet.vg,
            vs: self.fet.vs,
            id: self.fet.id(),
            gm: self.fet.gm(),
        }
    }

    /// Small-signal voltage gain magnitude `gm * Rd`.
    pub fn gain(&self) -> f64 {
        self.fet.gm() * self.network.rd
    }

    pub fn gain_db(&self) -> f64 {
        20.0 * self.gain().log10()
    }

    /// Input impedance `Rg + R1 ‖ R2` (Ω).
    pub fn zi(&self) -> f64 {
        self.network.rg + parallel(self.network.r1, self.network.r2)
    }

    /// Output impedance (Ω); the FET output resistance is ignored.
    pub fn zo(&self) -> f64 {
        self.network.rd
    }

    pub fn headroom(&self) -> Headroom {
        let vov = self.fet.vov();
        let vds = self.fet.vds();
        Headroom {
            overdrive: vov,
            saturation: vds - vov,
            gate_drain: self.fet.vd - self.fet.vg,
            current: self.fet.id_max - self.fet.id(),
            swing_up: self.vdd - self.fet.vd,
            swing_down: vds - vov,
        }
    }

    /// Source load line `id = (vg - vgs) / Rs` sampled at `vgs` (A).
    ///
    /// `None` for a grounded source (vertical load line at `vgs = vg`).
    pub fn source_load_line(&self, vgs: f64) -> Option<f64> {
        if self.network.rs > 0.0 {
            Some((self.fet.vg - vgs) / self.network.rs)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::fet::DEFAULT_ID_MAX;

    fn params() -> FetParams {
        FetParams::new(0.05, 2.0)
    }

    fn network(r1: f64, r2: f64, rd: f64, rs: f64) -> BiasNetwork {
        BiasNetwork { r1, r2, rd, rs, rg: 0.0 }
    }

    #[test]
    fn targets_follow_gain_equation() {
        let t = bias_targets(&params(), 20.0, 1000.0, 0.0);
        assert!((t.gain - 10.0).abs() < 1e-12);
        // gm * rd = 10 => gm = 0.01 => vov = gm / 2k = 0.1
        assert!((t.vgsq - 2.1).abs() < 1e-12);
        assert!((t.idq - 0.05 * 0.01).abs() < 1e-15);
        assert_eq!(t.vgq, t.vgsq);

        let t = bias_targets(&params(), 20.0, 1000.0, 100.0);
        assert!((t.vgq - (2.1 + 0.0005 * 100.0)).abs() < 1e-12);
    }

    #[test]
    fn grounded_source_puts_vgs_at_divider_voltage() {
        let s = CommonSourceStage::new(
            params(),
            12.0,
            network(100_000.0, 22_000.0, 1000.0, 0.0),
            DEFAULT_ID_MAX,
            ESeries::E24,
        )
        .unwrap();
        let op = s.operating_point();
        let vg = 12.0 * 22_000.0 / 122_000.0;
        assert!((op.vg - vg).abs() < 1e-12);
        assert!((op.vgs - vg).abs() < 1e-12);
        assert_eq!(op.vs, 0.0);
        assert!((op.id - idrain(vg, 0.05, 2.0)).abs() < 1e-15);
        assert!((op.vd - (12.0 - op.id * 1000.0)).abs() < 1e-12);
    }

    #[test]
    fn degenerated_source_satisfies_bias_equation() {
        let s = CommonSourceStage::new(
            params(),
            12.0,
            network(47_000.0, 12_000.0, 1000.0, 100.0),
            DEFAULT_ID_MAX,
            ESeries::E24,
        )
        .unwrap();
        let op = s.operating_point();
        assert!(op.vgs > 2.0);
        let rhs = op.vgs + 100.0 * idrain(op.vgs, 0.05, 2.0);
        assert!((rhs - op.vg).abs() < 1e-9);
        assert!((op.vs - op.id * 100.0).abs() < 1e-12);
        assert!((op.vds - (op.vd - op.vs)).abs() < 1e-12);
    }

    #[test]
    fn region_failures_are_reported() {
        let cutoff = CommonSourceStage::new(
            params(),
            12.0,
            network(100_000.0, 10_000.0, 1000.0, 0.0),
            DEFAULT_ID_MAX,
            ESeries::E24,
        );
        assert_eq!(cutoff.unwrap_err(), RegionError::Cutoff);

        let triode = CommonSourceStage::new(
            params(),
            12.0,
            network(10_000.0, 10_000.0, 1000.0, 0.0),
            DEFAULT_ID_MAX,
            ESeries::E24,
        );
        assert_eq!(triode.unwrap_err(), RegionError::Triode);

        let overcurrent = CommonSourceStage::new(
            params(),
            12.0,
            network(10_000.0, 10_000.0, 1.0, 0.0),
            DEFAULT_ID_MAX,
            ESeries::E24,
        );
        assert_eq!(overcurrent.unwrap_err(), RegionError::Overcurrent);
    }

    #[test]
    fn design_from_gain_lands_near_target() {
        let cfg = DesignConfig {
            rd: 1000.0,
            ..DesignConfig::default()
        };
        let s = CommonSourceStage::from_gain(params(), &cfg).unwrap();
        assert!((s.gain_db() - 25.0).abs() < 2.0, "gain {}", s.gain_db());

        let net = s.network();
        assert_eq!(net.rd, 1000.0);
        assert_eq!(net.rs, 0.0);
        assert_eq!(net.rg, 0.0);
        assert!(net.r1 >= 10_000.0 && net.r1 < 100_000.0);
        assert!(net.r2 >= 10_000.0 && net.r2 < 100_000.0);

        let h = s.headroom();
        assert!(h.overdrive > 0.0);
        assert!(h.gate_drain > 0.0);
        assert!(h.current > 0.0);
        assert!(h.saturation > h.gate_drain);
    }

    #[test]
    fn design_snaps_rd_to_series() {
        let cfg = DesignConfig {
            rd: 1030.0,
            ..DesignConfig::default()
        };
        let s = CommonSourceStage::from_gain(params(), &cfg).unwrap();
        assert_eq!(s.network().rd, 1000.0);
        assert_eq!(s.zo(), 1000.0);
    }

    #[test]
    fn zi_target_sets_gate_resistor() {
        let cfg = DesignConfig {
            rd: 1000.0,
            zi: Some(1_000_000.0),
            ..DesignConfig::default()
        };
        let s = CommonSourceStage::from_gain(params(), &cfg).unwrap();
        let net = s.network();
        assert!(net.rg > 0.0);
        assert!((s.zi() - 1_000_000.0).abs() / 1_000_000.0 < 0.1);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let err = CommonSourceStage::from_gain(FetParams::new(-1.0, 2.0), &DesignConfig::default())
            .unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
    }

    #[test]
    fn setters_resolve_and_roll_back_on_failure() {
        let mut s = CommonSourceStage::new(
            params(),
            12.0,
            network(100_000.0, 22_000.0, 1000.0, 0.0),
            DEFAULT_ID_MAX,
            ESeries::E24,
        )
        .unwrap();
        let before = s.operating_point();

        s.set_rs(10.0).unwrap();
        assert!(s.operating_point().id < before.id);

        let snapshot = s.clone();
        assert_eq!(s.set_rd(1_000_000.0), Err(RegionError::Triode));
        assert_eq!(s, snapshot);

        s.set_rg(470_000.0);
        assert!((s.zi() - (470_000.0 + 100_000.0 * 22_000.0 / 122_000.0)).abs() < 1e-6);
    }

    #[test]
    fn load_line_passes_through_quiescent_point() {
        let s = CommonSourceStage::new(
            params(),
            12.0,
            network(47_000.0, 12_000.0, 1000.0, 100.0),
            DEFAULT_ID_MAX,
            ESeries::E24,
        )
        .unwrap();
        let op = s.operating_point();
        let id = s.source_load_line(op.vgs).unwrap();
        assert!((id - op.id).abs() < 1e-9);
    }
}
