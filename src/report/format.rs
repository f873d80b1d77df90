//! Formatted terminal output.
//!
//! Formatting lives here so the fitting and solver code stays free of
//! presentation concerns and output changes stay localized.
//!
//! Units on screen: `k` in mA/V², currents in mA, voltages in V, resistors in
//! standard notation (`4K7`).

use crate::domain::{DatasetStats, FitReport};
use crate::io::RowError;
use crate::resistor::format_resistor;
use crate::stage::{BiasTargets, CommonSourceStage};

/// At most this many skipped rows are listed individually.
const MAX_ROW_ERRORS: usize = 10;

/// Dataset stats, fitted parameters and fit diagnostics.
pub fn format_fit_summary(stats: &DatasetStats, fit: &FitReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Points: n={} | vgs=[{:.3}, {:.3}] V | id=[{:.3}, {:.3}] mA\n",
        stats.n_points,
        stats.vgs_min,
        stats.vgs_max,
        stats.id_min * 1000.0,
        stats.id_max * 1000.0
    ));
    out.push_str(&format!("Method: {}\n", fit.method.display_name()));

    out.push_str("\nEstimated parameters\n\n");
    match fit.uncertainty {
        Some(u) => {
            out.push_str(&format!(
                "{:<4} {:>5.2} ± {:.2} mA/V²\n",
                "K =",
                fit.params.k_ma(),
                u.k_err * 1000.0
            ));
            out.push_str(&format!("{:<4} {:>5.2} ± {:.2} V\n", "Vt =", fit.params.vt, u.vt_err));
        }
        None => {
            out.push_str(&format!("{:<4} {:>5.2} mA/V²\n", "K =", fit.params.k_ma()));
            out.push_str(&format!("{:<4} {:>5.2} V\n", "Vt =", fit.params.vt));
        }
    }

    let q = &fit.quality;
    out.push_str(&format!(
        "\nSSE={:.3e} A² RMSE={:.4} mA R²={}\n",
        q.sse,
        q.rmse * 1000.0,
        q.r_squared
            .map_or_else(|| "n/a".to_string(), |r2| format!("{r2:.5}"))
    ));

    out
}

/// Target quiescent point for a gain, as printed after a bare fit.
pub fn format_targets(targets: &BiasTargets, rd: f64) -> String {
    let mut out = String::new();
    out.push_str(&format!("Desired gain [{} dB]\n", targets.gain_db));
    out.push_str(&format!("Rd {rd}\n"));
    out.push_str(&format!("Vgsq = {:.3} V\n", targets.vgsq));
    out.push_str(&format!("Idq = {:.4} mA\n", targets.idq * 1000.0));
    if targets.vgq != targets.vgsq {
        out.push_str(&format!("Vgq = {:.3} V\n", targets.vgq));
    }
    out
}

/// Parameters, bias network, operating point and achieved gain of a stage.
pub fn format_design_report(stage: &CommonSourceStage) -> String {
    let mut out = String::new();
    let params = stage.params();
    let net = stage.network();
    let op = stage.operating_point();
    let series = stage.series();

    out.push_str("\nEstimated parameters\n\n");
    out.push_str(&format!("{:<4} {:>5.2} mA/V²\n", "K =", params.k_ma()));
    out.push_str(&format!("{:<4} {:>5.2} V\n\n", "Vt =", params.vt));

    out.push_str(&format!("Bias network ({})\n\n", series.display_name()));
    out.push_str(&format!("R1 = {:>5}\n", format_resistor(net.r1, series)));
    out.push_str(&format!("R2 = {:>5}\n", format_resistor(net.r2, series)));
    out.push_str(&format!("Rd = {:>5}\n", format_resistor(net.rd, series)));
    out.push_str(&format!("Rs = {:>5}\n", format_resistor(net.rs, series)));
    if net.rg > 0.0 {
        out.push_str(&format!("Rg = {:>5}\n", format_resistor(net.rg, series)));
    }

    out.push_str("\nOperating point\n\n");
    for (label, value) in [
        ("Vdd =", stage.vdd()),
        ("Vgsq =", op.vgs),
        ("Vdsq =", op.vds),
        ("Vdq =", op.vd),
        ("Vgq =", op.vg),
        ("Vsq =", op.vs),
    ] {
        out.push_str(&format!("{label:<6} {value:>5.2} V\n"));
    }
    out.push_str(&format!("{:<6} {:>5.2} mA\n\n", "Idq =", op.id * 1000.0));

    out.push_str(&format!("Achieved gain = {:.1} dB\n", stage.gain_db()));
    out.push_str(&format!(
        "Zi = {:.1} kΩ | Zo = {:.1} Ω | gm = {:.2} mS\n",
        stage.zi() / 1000.0,
        stage.zo(),
        op.gm * 1000.0
    ));

    let h = stage.headroom();
    out.push_str(&format!(
        "Headroom: Vov={:.2} V | Vds-Vov={:.2} V | Vd-Vg={:.2} V | Imax-Id={:.1} mA\n",
        h.overdrive,
        h.saturation,
        h.gate_drain,
        h.current * 1000.0
    ));

    out
}

/// Summary of skipped input rows.
pub fn format_row_errors(errors: &[RowError]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut out = format!("Skipped {} row(s):\n", errors.len());
    for e in errors.iter().take(MAX_ROW_ERRORS) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if errors.len() > MAX_ROW_ERRORS {
        out.push_str(&format!("  ... and {} more\n", errors.len() - MAX_ROW_ERRORS));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DesignConfig, FetParams, FitMethod, FitQuality, FitUncertainty};
    use crate::stage::bias_targets;

    fn fit() -> FitReport {
        FitReport {
            params: FetParams::new(0.045, 2.1),
            uncertainty: Some(FitUncertainty {
                k_err: 0.001,
                vt_err: 0.02,
            }),
            quality: FitQuality {
                sse: 1e-9,
                rmse: 1e-5,
                r_squared: Some(0.9995),
                n: 12,
            },
            method: FitMethod::Lm,
        }
    }

    #[test]
    fn fit_summary_lists_parameters_in_ma() {
        let stats = DatasetStats {
            n_points: 12,
            vgs_min: 2.2,
            vgs_max: 4.5,
            id_min: 0.0001,
            id_max: 0.2,
        };
        let s = format_fit_summary(&stats, &fit());
        assert!(s.contains("Estimated parameters"));
        assert!(s.contains("K =  45.00 ± 1.00 mA/V²"));
        assert!(s.contains("Vt =  2.10 ± 0.02 V"));
        assert!(s.contains("R²=0.99950"));
    }

    #[test]
    fn targets_are_printed_in_ma() {
        let t = bias_targets(&FetParams::new(0.05, 2.0), 20.0, 100.0, 0.0);
        let s = format_targets(&t, 100.0);
        assert!(s.contains("Desired gain [20 dB]"));
        assert!(s.contains("Vgsq = 3.000 V"));
        assert!(s.contains("Idq = 50.0000 mA"));
        assert!(!s.contains("Vgq"));
    }

    #[test]
    fn design_report_has_all_sections() {
        let cfg = DesignConfig {
            rd: 1000.0,
            ..DesignConfig::default()
        };
        let stage = CommonSourceStage::from_gain(FetParams::new(0.05, 2.0), &cfg).unwrap();
        let s = format_design_report(&stage);
        assert!(s.contains("Bias network (E24)"));
        assert!(s.contains("R1 =   68K"));
        assert!(s.contains("R2 =   15K"));
        assert!(s.contains("Rd =    1K"));
        assert!(s.contains("Operating point"));
        assert!(s.contains("Achieved gain = 24.5 dB"));
        assert!(!s.contains("Rg ="));
    }

    #[test]
    fn long_row_error_lists_are_truncated() {
        let errors: Vec<RowError> = (1..=12)
            .map(|line| RowError {
                line,
                message: "bad".to_string(),
            })
            .collect();
        let s = format_row_errors(&errors);
        assert!(s.starts_with("Skipped 12 row(s):"));
        assert!(s.contains("line 10: bad"));
        assert!(!s.contains("line 11"));
        assert!(s.contains("... and 2 more"));
        assert!(format_row_errors(&[]).is_empty());
    }
}
