//! Biased FET state.
//!
//! A `Fet` holds the fitted square-law parameters plus the three node voltages
//! imposed by the surrounding network. Drain current and transconductance are
//! always derived from `vg - vs`; nothing is cached, so node updates can never
//! leave stale values behind.

use thiserror::Error;

use crate::domain::FetParams;
use crate::models::{gm, idrain};

/// Default drain current limit (A).
pub const DEFAULT_ID_MAX: f64 = 0.1;

/// The transistor is not where a small-signal amplifier needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegionError {
    /// `vgs < vt`: no channel.
    #[error("Transistor in cutoff")]
    Cutoff,
    /// `vg > vd`: the drain has fallen below the gate.
    #[error("Transistor in triode region")]
    Triode,
    /// `id > id_max`.
    #[error("Too much current!!!")]
    Overcurrent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fet {
    pub params: FetParams,
    pub vg: f64,
    pub vd: f64,
    pub vs: f64,
    pub id_max: f64,
}

impl Fet {
    pub fn new(params: FetParams) -> Self {
        Self {
            params,
            vg: 0.0,
            vd: 0.0,
            vs: 0.0,
            id_max: DEFAULT_ID_MAX,
        }
    }

    pub fn with_id_max(mut self, id_max: f64) -> Self {
        self.id_max = id_max;
        self
    }

    pub fn vgs(&self) -> f64 {
        self.vg - self.vs
    }

    pub fn vds(&self) -> f64 {
        self.vd - self.vs
    }

    /// Overdrive voltage `vgs - vt`.
    pub fn vov(&self) -> f64 {
        self.vgs() - self.params.vt
    }

    pub fn id(&self) -> f64 {
        idrain(self.vgs(), self.params.k, self.params.vt)
    }

    pub fn gm(&self) -> f64 {
        gm(self.vgs(), self.params.k, self.params.vt)
    }

    /// Verify the device sits in saturation below the current limit.
    ///
    /// The triode test uses `vg > vd`, which keeps the drain at least `vt`
    /// above the saturation edge `vds = vgs - vt`.
    pub fn check(&self) -> Result<(), RegionError> {
        if self.vgs() < self.params.vt {
            Err(RegionError::Cutoff)
        } else if self.vg > self.vd {
            Err(RegionError::Triode)
        } else if self.id() > self.id_max {
            Err(RegionError::Overcurrent)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fet(vg: f64, vd: f64, vs: f64) -> Fet {
        let mut f = Fet::new(FetParams::new(0.05, 2.0));
        f.vg = vg;
        f.vd = vd;
        f.vs = vs;
        f
    }

    #[test]
    fn derived_quantities() {
        let f = fet(3.0, 8.0, 0.5);
        assert!((f.vgs() - 2.5).abs() < 1e-12);
        assert!((f.vds() - 7.5).abs() < 1e-12);
        assert!((f.id() - 0.05 * 0.25).abs() < 1e-12);
        assert!((f.gm() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn region_checks_in_order() {
        assert_eq!(fet(1.5, 10.0, 0.0).check(), Err(RegionError::Cutoff));
        assert_eq!(fet(3.0, 2.5, 0.0).check(), Err(RegionError::Triode));
        assert_eq!(fet(5.0, 10.0, 0.0).check(), Err(RegionError::Overcurrent));
        assert_eq!(fet(3.0, 10.0, 0.0).check(), Ok(()));
    }

    #[test]
    fn id_max_is_configurable() {
        let f = fet(3.0, 10.0, 0.0).with_id_max(0.01);
        assert_eq!(f.check(), Err(RegionError::Overcurrent));
    }
}
