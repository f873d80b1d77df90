//! Shared pipeline logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! measurements -> fit -> bias targets -> network design -> operating point
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::path::{Path, PathBuf};

use tracing::info;

use crate::cli::DeviceArgs;
use crate::domain::{DesignConfig, FetParams, FitConfig, FitMethod, FitReport, Measurement};
use crate::error::AppError;
use crate::io::{MeasurementSet, load_measurements, read_model_json};
use crate::stage::{BiasTargets, CommonSourceStage, bias_targets};

/// Measurements plus the fit made from them.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub path: PathBuf,
    pub set: MeasurementSet,
    pub report: FitReport,
}

/// A device ready for stage design.
#[derive(Debug, Clone)]
pub struct Device {
    pub params: FetParams,
    /// Present when the parameters were fitted in this run.
    pub fit: Option<FitRun>,
    /// Human-readable origin (file path or "explicit parameters").
    pub origin: String,
}

impl Device {
    /// Measured points, if any (for plots).
    pub fn points(&self) -> &[Measurement] {
        self.fit.as_ref().map(|f| f.set.points.as_slice()).unwrap_or(&[])
    }
}

/// Load and fit a measurement file.
pub fn run_fit(config: &FitConfig) -> Result<FitRun, AppError> {
    fit_file(&config.data_path, config.method, config.bisect_seed)
}

fn fit_file(path: &Path, method: FitMethod, seed: Option<f64>) -> Result<FitRun, AppError> {
    let set = load_measurements(path)?;
    info!(path = %path.display(), n = set.points.len(), "measurements loaded");
    let report = crate::fit::fit_measurements(&set.points, method, seed)?;
    Ok(FitRun {
        path: path.to_path_buf(),
        set,
        report,
    })
}

/// Resolve the device parameters from a file, a model JSON, or `--k/--vt`.
pub fn resolve_device(args: &DeviceArgs) -> Result<Device, AppError> {
    if let Some(path) = &args.file {
        let run = fit_file(path, args.method.method, args.method.seed)?;
        return Ok(Device {
            params: run.report.params,
            origin: path.display().to_string(),
            fit: Some(run),
        });
    }

    if let Some(path) = &args.model {
        let model = read_model_json(path)?;
        info!(path = %path.display(), "model loaded");
        return Ok(Device {
            params: model.fit.params,
            fit: None,
            origin: path.display().to_string(),
        });
    }

    match (args.k, args.vt) {
        (Some(k), Some(vt)) => {
            let params = FetParams::new(k, vt);
            if !params.is_valid() {
                return Err(AppError::input(format!(
                    "Invalid device parameters: k={k} A/V², vt={vt} V (k must be > 0)."
                )));
            }
            Ok(Device {
                params,
                fit: None,
                origin: "explicit parameters".to_string(),
            })
        }
        _ => Err(AppError::input(
            "No device given: pass a measurement file, --model JSON, or --k and --vt.",
        )),
    }
}

/// Output of a stage design.
#[derive(Debug, Clone)]
pub struct DesignRun {
    pub targets: BiasTargets,
    pub stage: CommonSourceStage,
}

/// Design the stage for a device.
pub fn run_design(params: FetParams, config: &DesignConfig) -> Result<DesignRun, AppError> {
    let stage = CommonSourceStage::from_gain(params, config)?;
    let net = stage.network();
    let targets = bias_targets(&params, config.gain_db, net.rd, net.rs);
    info!(gain_db = stage.gain_db(), id = stage.operating_point().id, "stage designed");
    Ok(DesignRun { targets, stage })
}
