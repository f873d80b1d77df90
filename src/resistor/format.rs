//! Compact resistor notation.
//!
//! The multiplier letter replaces the decimal point: `4K7` is 4.7 kΩ, `1M5` is
//! 1.5 MΩ. Values under 1 kΩ are written with a trailing `R` (`220R`).
//! E24 values keep one decimal and E96 values two, with trailing zeros
//! dropped (`10K`, `1K05`).

use crate::domain::ESeries;

/// Format a resistance (Ω) for display.
pub fn format_resistor(r: f64, series: ESeries) -> String {
    let decimals = match series {
        ESeries::E24 => 1,
        ESeries::E96 => 2,
    };

    if r >= 1e6 {
        with_multiplier(r / 1e6, decimals, 'M')
    } else if r >= 1e3 {
        with_multiplier(r / 1e3, decimals, 'K')
    } else if r.fract() == 0.0 {
        format!("{}R", r as u64)
    } else {
        format!("{r}R")
    }
}

fn with_multiplier(v: f64, decimals: usize, letter: char) -> String {
    let fixed = format!("{v:.decimals$}");
    fixed.trim_end_matches('0').replace('.', &letter.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_common_values() {
        assert_eq!(format_resistor(100.0, ESeries::E24), "100R");
        assert_eq!(format_resistor(0.0, ESeries::E24), "0R");
        assert_eq!(format_resistor(1500.0, ESeries::E24), "1K5");
        assert_eq!(format_resistor(47_000.0, ESeries::E24), "47K");
        assert_eq!(format_resistor(10_000.0, ESeries::E24), "10K");
        assert_eq!(format_resistor(1_000_000.0, ESeries::E24), "1M");
        assert_eq!(format_resistor(2_200_000.0, ESeries::E24), "2M2");
    }

    #[test]
    fn e96_keeps_two_decimals() {
        assert_eq!(format_resistor(1050.0, ESeries::E96), "1K05");
        assert_eq!(format_resistor(4750.0, ESeries::E96), "4K75");
        assert_eq!(format_resistor(1500.0, ESeries::E96), "1K5");
        assert_eq!(format_resistor(12_100.0, ESeries::E96), "12K1");
    }
}
