//! Read/write device model JSON files.
//!
//! A model file is the portable result of a fit:
//! - fitted `k`/`vt` plus uncertainty and quality
//! - where it came from (measurement file, timestamp)
//! - a sampled transfer curve for quick plotting elsewhere
//!
//! `design --model` and `tui --model` reload it to skip re-fitting.

use std::fs::File;
use std::path::Path;

use chrono::Local;

use crate::domain::{FitReport, ModelFile, TransferGrid};
use crate::error::AppError;
use crate::math::linspace;
use crate::models::predict;

const GRID_POINTS: usize = 101;

/// Build the model file for a fit. The grid spans `[vt, vgs_max]`.
pub fn build_model(fit: &FitReport, vgs_max: f64, source: Option<&Path>) -> ModelFile {
    ModelFile {
        tool: "fetbias".to_string(),
        generated: Local::now(),
        source: source.map(|p| p.display().to_string()),
        fit: fit.clone(),
        grid: build_grid(fit, vgs_max, GRID_POINTS),
    }
}

/// Write a model JSON file.
pub fn write_model_json(path: &Path, model: &ModelFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::input(format!("Failed to create model JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, model)
        .map_err(|e| AppError::input(format!("Failed to write model JSON: {e}")))?;
    Ok(())
}

/// Read a model JSON file.
pub fn read_model_json(path: &Path) -> Result<ModelFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::input(format!("Failed to open model JSON '{}': {e}", path.display()))
    })?;
    let model: ModelFile = serde_json::from_reader(file)
        .map_err(|e| AppError::input(format!("Invalid model JSON: {e}")))?;
    if !model.fit.params.is_valid() {
        return Err(AppError::input(format!(
            "Model '{}' has invalid parameters (k = {}, vt = {}).",
            path.display(),
            model.fit.params.k,
            model.fit.params.vt
        )));
    }
    Ok(model)
}

fn build_grid(fit: &FitReport, vgs_max: f64, n: usize) -> TransferGrid {
    let v0 = fit.params.vt;
    let mut v1 = vgs_max;
    if !v1.is_finite() || v1 <= v0 {
        v1 = v0 + 2.0;
    }
    let vgs = linspace(v0, v1, n.max(2));
    let id = vgs.iter().map(|&v| predict(&fit.params, v)).collect();
    TransferGrid { vgs, id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FetParams, FitMethod, FitQuality, Measurement};
    use crate::fit::fit_quality;

    fn report() -> FitReport {
        FitReport {
            params: FetParams::new(0.045, 2.1),
            uncertainty: None,
            quality: FitQuality {
                sse: 1e-9,
                rmse: 1e-5,
                r_squared: Some(0.999),
                n: 10,
            },
            method: FitMethod::Lm,
        }
    }

    #[test]
    fn grid_spans_threshold_to_max_vgs() {
        let m = build_model(&report(), 4.5, None);
        assert_eq!(m.grid.vgs.len(), GRID_POINTS);
        assert_eq!(m.grid.vgs[0], 2.1);
        assert_eq!(m.grid.id[0], 0.0);
        assert!((m.grid.vgs[100] - 4.5).abs() < 1e-12);
    }

    #[test]
    fn model_file_survives_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let m = build_model(&report(), 4.5, Some(Path::new("bench.txt")));
        write_model_json(&path, &m).unwrap();
        let back = read_model_json(&path).unwrap();
        assert_eq!(back.tool, "fetbias");
        assert_eq!(back.source.as_deref(), Some("bench.txt"));
        assert_eq!(back.fit, m.fit);
    }

    #[test]
    fn flat_current_model_reloads() {
        let pts: Vec<Measurement> = [2.5, 3.0, 3.5, 4.0]
            .iter()
            .map(|&vgs| Measurement { vgs, id: 0.01 })
            .collect();
        let mut r = report();
        r.quality = fit_quality(&pts, &r.params);
        assert_eq!(r.quality.r_squared, None);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.json");
        write_model_json(&path, &build_model(&r, 4.5, None)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"r_squared\": null"));
        let back = read_model_json(&path).unwrap();
        assert_eq!(back.fit.quality.r_squared, None);
        assert_eq!(back.fit.quality.n, 4);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let mut r = report();
        r.params.k = -1.0;
        write_model_json(&path, &build_model(&r, 4.5, None)).unwrap();
        assert!(read_model_json(&path).is_err());
    }
}
