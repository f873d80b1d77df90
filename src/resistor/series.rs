//! E-series tables and nearest-value lookup.
//!
//! Both tables hold one decade of mantissas in `[1, 10)`. A value is matched
//! by scaling it into that decade, picking the closest mantissa and scaling
//! back. The next decade's `1.0` is also a candidate so values just below a
//! power of ten round up (9.8k → 10k) instead of down to the last table entry.

use crate::domain::ESeries;

pub const E24: [f64; 24] = [
    1.0, 1.1, 1.2, 1.3, 1.5, 1.6, //
    1.8, 2.0, 2.2, 2.4, 2.7, 3.0, //
    3.3, 3.6, 3.9, 4.3, 4.7, 5.1, //
    5.6, 6.2, 6.8, 7.5, 8.2, 9.1,
];

pub const E96: [f64; 96] = [
    1.00, 1.02, 1.05, 1.07, 1.10, 1.13, 1.15, 1.18, 1.21, //
    1.24, 1.27, 1.30, 1.33, 1.37, 1.40, 1.43, 1.47, 1.50, //
    1.54, 1.58, 1.62, 1.65, 1.69, 1.74, 1.78, 1.82, 1.87, //
    1.91, 1.96, 2.00, 2.05, 2.10, 2.16, 2.21, 2.26, 2.32, //
    2.37, 2.43, 2.49, 2.55, 2.61, 2.67, 2.74, 2.80, 2.87, //
    2.94, 3.01, 3.09, 3.16, 3.24, 3.32, 3.40, 3.48, 3.57, //
    3.65, 3.74, 3.83, 3.92, 4.02, 4.12, 4.22, 4.32, 4.42, //
    4.53, 4.64, 4.75, 4.87, 4.99, 5.11, 5.23, 5.36, 5.49, //
    5.62, 5.76, 5.90, 6.04, 6.19, 6.34, 6.49, 6.65, 6.81, //
    6.98, 7.15, 7.32, 7.50, 7.68, 7.87, 8.06, 8.25, 8.45, //
    8.66, 8.87, 9.09, 9.31, 9.53, 9.76,
];

/// Smallest non-zero value produced when stepping up from zero (Ω).
const STEP_FROM_ZERO: f64 = 10.0;

/// Mantissa table for a series.
pub fn table(series: ESeries) -> &'static [f64] {
    match series {
        ESeries::E24 => &E24,
        ESeries::E96 => &E96,
    }
}

/// Nearest standard value to `r`, in whole ohms. Non-positive inputs map to `0`.
pub fn nearest_standard(r: f64, series: ESeries) -> f64 {
    if !(r.is_finite() && r > 0.0) {
        return 0.0;
    }
    let decade = decade_of(r);
    let scaled = r / decade;

    let mut best = 10.0;
    let mut best_dist = (scaled - 10.0).abs();
    for &m in table(series) {
        let dist = (scaled - m).abs();
        if dist < best_dist {
            best = m;
            best_dist = dist;
        }
    }
    snap(best * decade)
}

/// Next standard value above (`up = true`) or below `r`.
///
/// Stepping down from the lowest value (1 Ω) gives `0`, stepping up from `0`
/// gives 10 Ω.
pub fn step_standard(r: f64, series: ESeries, up: bool) -> f64 {
    let current = nearest_standard(r, series);
    if current <= 0.0 {
        return if up { STEP_FROM_ZERO } else { 0.0 };
    }

    let values = table(series);
    let decade = decade_of(current);
    let mantissa = current / decade;
    let idx = values
        .iter()
        .enumerate()
        .min_by(|a, b| {
            (a.1 - mantissa)
                .abs()
                .partial_cmp(&(b.1 - mantissa).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    if up {
        if idx + 1 < values.len() {
            snap(values[idx + 1] * decade)
        } else {
            snap(10.0 * decade)
        }
    } else if current <= 1.0 {
        0.0
    } else if idx > 0 {
        snap(values[idx - 1] * decade)
    } else {
        snap(values[values.len() - 1] * decade / 10.0)
    }
}

/// `10^floor(log10 r)`, corrected for rounding in `log10`.
fn decade_of(r: f64) -> f64 {
    let mut decade = 10f64.powf(r.log10().floor());
    if r / decade >= 10.0 - 1e-9 {
        decade *= 10.0;
    } else if r / decade < 1.0 - 1e-9 {
        decade /= 10.0;
    }
    decade
}

/// Whole ohms; also removes floating-point noise from table products
/// (`1.1 * 1000`).
fn snap(r: f64) -> f64 {
    r.round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_sorted_and_in_one_decade() {
        for series in [ESeries::E24, ESeries::E96] {
            let t = table(series);
            assert!(t.windows(2).all(|w| w[0] < w[1]));
            assert_eq!(t[0], 1.0);
            assert!(*t.last().unwrap() < 10.0);
        }
        assert_eq!(E24.len(), 24);
        assert_eq!(E96.len(), 96);
    }

    #[test]
    fn nearest_e24_values() {
        assert_eq!(nearest_standard(100.0, ESeries::E24), 100.0);
        assert_eq!(nearest_standard(4650.0, ESeries::E24), 4700.0);
        assert_eq!(nearest_standard(1140.0, ESeries::E24), 1100.0);
        assert_eq!(nearest_standard(9800.0, ESeries::E24), 10_000.0);
        assert_eq!(nearest_standard(0.0, ESeries::E24), 0.0);
        assert_eq!(nearest_standard(-5.0, ESeries::E24), 0.0);
    }

    #[test]
    fn sub_ohm_values_round_to_whole_ohms() {
        assert_eq!(nearest_standard(0.47, ESeries::E24), 0.0);
        assert_eq!(nearest_standard(0.68, ESeries::E24), 1.0);
        assert_eq!(nearest_standard(0.47, ESeries::E96), 0.0);
    }

    #[test]
    fn nearest_e96_values() {
        assert_eq!(nearest_standard(4700.0, ESeries::E96), 4750.0);
        assert_eq!(nearest_standard(10_000.0, ESeries::E96), 10_000.0);
        assert_eq!(nearest_standard(1234.0, ESeries::E96), 1240.0);
    }

    #[test]
    fn powers_of_ten_stay_put() {
        for r in [1.0, 10.0, 100.0, 1000.0, 1e4, 1e5, 1e6] {
            assert_eq!(nearest_standard(r, ESeries::E24), r);
        }
    }

    #[test]
    fn stepping_walks_the_table() {
        assert_eq!(step_standard(100.0, ESeries::E24, true), 110.0);
        assert_eq!(step_standard(100.0, ESeries::E24, false), 91.0);
        assert_eq!(step_standard(910.0, ESeries::E24, true), 1000.0);
        assert_eq!(step_standard(0.0, ESeries::E24, true), 10.0);
        assert_eq!(step_standard(1.0, ESeries::E24, false), 0.0);
        assert_eq!(step_standard(0.0, ESeries::E24, false), 0.0);
    }
}
