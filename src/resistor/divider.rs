//! Voltage-divider search.
//!
//! Given a supply `vdd` and a target gate voltage, find the pair of table
//! mantissas `(r1, r2)` minimizing `|v_target - vdd * r2 / (r1 + r2)|`.
//! `r1` is the upper (supply-side) resistor.
//!
//! The ratio only depends on mantissas, so the caller scales both by a common
//! decade afterwards (`DividerChoice::scaled`).

use rayon::prelude::*;

use crate::domain::ESeries;
use crate::resistor::series::table;

/// Best divider found for a target voltage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DividerChoice {
    /// Upper resistor mantissa.
    pub r1: f64,
    /// Lower resistor mantissa.
    pub r2: f64,
    /// Divider output for the chosen pair (V).
    pub vout: f64,
    /// `|v_target - vout|` (V).
    pub error: f64,
}

impl DividerChoice {
    /// Both resistors scaled by `10^odiv` (Ω), rounded to whole ohms.
    pub fn scaled(&self, odiv: i32) -> (f64, f64) {
        let scale = 10f64.powi(odiv);
        let r1 = (self.r1 * scale).round();
        let r2 = (self.r2 * scale).round();
        (r1, r2)
    }
}

/// Exhaustive search over all table pairs.
///
/// Ties keep the first pair in `(r1, r2)` table order, independent of how the
/// parallel search is scheduled.
pub fn best_divider(vdd: f64, v_target: f64, series: ESeries) -> Option<DividerChoice> {
    if !(vdd.is_finite() && v_target.is_finite()) {
        return None;
    }
    let values = table(series);
    let n = values.len();

    let best = values
        .par_iter()
        .enumerate()
        .flat_map_iter(|(i, &r1)| {
            values.iter().enumerate().map(move |(j, &r2)| {
                let vout = vdd * r2 / (r1 + r2);
                ((v_target - vout).abs(), i * n + j, r1, r2, vout)
            })
        })
        .reduce_with(|a, b| {
            if b.0 < a.0 || (b.0 == a.0 && b.1 < a.1) {
                b
            } else {
                a
            }
        })?;

    let (error, _, r1, r2, vout) = best;
    Some(DividerChoice { r1, r2, vout, error })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_supply_prefers_equal_first_pair() {
        let d = best_divider(12.0, 6.0, ESeries::E24).unwrap();
        assert_eq!(d.r1, 1.0);
        assert_eq!(d.r2, 1.0);
        assert!(d.error < 1e-12);
    }

    #[test]
    fn divider_output_is_close_to_target() {
        for target in [1.5, 2.7, 3.3, 4.1, 9.0] {
            let d = best_divider(12.0, target, ESeries::E24).unwrap();
            assert!(d.error < 0.15, "target {target}: error {}", d.error);
            assert!((12.0 * d.r2 / (d.r1 + d.r2) - d.vout).abs() < 1e-12);
        }
    }

    #[test]
    fn search_matches_brute_force_minimum() {
        for series in [ESeries::E24, ESeries::E96] {
            for target in [0.9, 3.77, 7.3] {
                let d = best_divider(12.0, target, series).unwrap();
                let values = table(series);
                let best = values
                    .iter()
                    .flat_map(|&r1| values.iter().map(move |&r2| (target - 12.0 * r2 / (r1 + r2)).abs()))
                    .fold(f64::INFINITY, f64::min);
                assert_eq!(d.error, best, "{series:?} target {target}");
            }
        }
    }

    #[test]
    fn scaling_rounds_to_whole_ohms() {
        let d = DividerChoice { r1: 1.15, r2: 4.7, vout: 0.0, error: 0.0 };
        assert_eq!(d.scaled(4), (11_500.0, 47_000.0));
    }

    #[test]
    fn non_finite_inputs_yield_none() {
        assert!(best_divider(f64::NAN, 1.0, ESeries::E24).is_none());
    }
}
