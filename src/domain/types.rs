//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and stage design
//! - exported to JSON (model files, design reports)
//! - reloaded later to design a stage without re-fitting

use std::path::PathBuf;

use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Square-law parameters of an N-channel enhancement-mode FET.
///
/// `id = k * (vgs - vt)^2` in saturation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FetParams {
    /// Transconductance coefficient (A/V²).
    pub k: f64,
    /// Threshold voltage (V).
    pub vt: f64,
}

impl FetParams {
    pub fn new(k: f64, vt: f64) -> Self {
        Self { k, vt }
    }

    /// `k` expressed in mA/V², the unit used in all terminal output.
    pub fn k_ma(&self) -> f64 {
        self.k * 1000.0
    }

    pub fn is_valid(&self) -> bool {
        self.k.is_finite() && self.k > 0.0 && self.vt.is_finite()
    }
}

/// One-sigma parameter uncertainty derived from the fit covariance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitUncertainty {
    pub k_err: f64,
    pub vt_err: f64,
}

/// A single measured `(vgs, id)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Gate-source voltage (V).
    pub vgs: f64,
    /// Drain current (A).
    pub id: f64,
}

/// Summary stats about the measurements actually used for fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_points: usize,
    pub vgs_min: f64,
    pub vgs_max: f64,
    pub id_min: f64,
    pub id_max: f64,
}

/// Standard resistor series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum ESeries {
    /// 24 values per decade (5 % tolerance).
    #[default]
    E24,
    /// 96 values per decade (1 % tolerance).
    E96,
}

impl ESeries {
    pub fn from_flag(e96: bool) -> Self {
        if e96 { ESeries::E96 } else { ESeries::E24 }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ESeries::E24 => "E24",
            ESeries::E96 => "E96",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            ESeries::E24 => ESeries::E96,
            ESeries::E96 => ESeries::E24,
        }
    }
}

/// How the square-law parameters are estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum FitMethod {
    /// Nonlinear least squares (Levenberg–Marquardt) on `k` and `vt`.
    #[default]
    Lm,
    /// Bisection on the threshold voltage using the closed-form `k(vt)`.
    Bisect,
}

impl FitMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            FitMethod::Lm => "least squares (LM)",
            FitMethod::Bisect => "threshold bisection",
        }
    }
}

/// Fit output: parameters plus quality diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub params: FetParams,
    /// Not available for every method (bisection has no covariance).
    pub uncertainty: Option<FitUncertainty>,
    pub quality: FitQuality,
    pub method: FitMethod,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    /// `None` when the drain current does not vary (SST = 0).
    pub r_squared: Option<f64>,
    pub n: usize,
}

/// Options for the `fit` workflow as understood by the pipeline.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub data_path: PathBuf,
    pub method: FitMethod,
    /// Upper bracket for the threshold bisection (V); defaults to the
    /// smallest measured `vgs`.
    pub bisect_seed: Option<f64>,
    /// Also print the auxiliary bisection function over a voltage range.
    pub diagnose: bool,
    /// Gain target/drain resistor used to print the bias targets after fitting.
    pub targets: Option<(f64, f64)>,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub svg_path: Option<PathBuf>,
    pub export_model: Option<PathBuf>,
}

/// Stage-design inputs.
///
/// Defaults match a 12 V supply, 100 Ω drain resistor, grounded source and a
/// 25 dB gain target with a divider in the 10 kΩ decade.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignConfig {
    pub vdd: f64,
    pub rd: f64,
    pub rs: f64,
    pub gain_db: f64,
    /// Decade exponent applied to the divider mantissas (`10^odiv`).
    pub odiv: i32,
    pub series: ESeries,
    /// Optional input-impedance target; sets the gate series resistor.
    pub zi: Option<f64>,
    /// Maximum drain current allowed at the operating point (A).
    pub id_max: f64,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            vdd: 12.0,
            rd: 100.0,
            rs: 0.0,
            gain_db: 25.0,
            odiv: 4,
            series: ESeries::E24,
            zi: None,
            id_max: 0.1,
        }
    }
}

/// A saved device model (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub generated: DateTime<Local>,
    /// Measurement file the model was fitted from, if any.
    pub source: Option<String>,
    pub fit: FitReport,
    pub grid: TransferGrid,
}

/// Sampled fitted transfer curve `id(vgs)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferGrid {
    pub vgs: Vec<f64>,
    pub id: Vec<f64>,
}
