//! Measurement file ingest.
//!
//! Turns a bench log of `vgs id` pairs into clean `Measurement`s that are safe
//! to fit.
//!
//! Accepted layout:
//! - one measurement per line, gate-source voltage (V) then drain current (A)
//! - columns separated by whitespace, commas or semicolons (detected once per file)
//! - `#` starts a comment anywhere on a line; blank lines are ignored
//! - extra columns are ignored
//!
//! Rows that do not parse are skipped and reported, the same way a header line
//! such as `vgs id` would be.

use std::path::Path;

use tracing::{debug, warn};

use crate::domain::{DatasetStats, Measurement};
use crate::error::{AppError, EXIT_NO_DATA};

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: measurements + stats + row errors.
#[derive(Debug, Clone)]
pub struct MeasurementSet {
    pub points: Vec<Measurement>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load measurements from a file.
pub fn load_measurements(path: &Path) -> Result<MeasurementSet, AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AppError::input(format!("File {} does not exist", path.display()))
        }
        _ => AppError::input(format!(
            "Failed to read measurement file '{}': {e}",
            path.display()
        )),
    })?;

    let set = parse_measurements(&text)?;
    debug!(
        path = %path.display(),
        rows = set.rows_read,
        used = set.points.len(),
        "loaded measurements"
    );
    Ok(set)
}

/// Parse measurements from text (the file contents).
pub fn parse_measurements(text: &str) -> Result<MeasurementSet, AppError> {
    let delimiter = detect_delimiter(text);

    // `#` may follow data or indentation, which the CSV reader's comment
    // option does not see. Cut comments per line, keeping line numbers.
    // The reader treats every separator literally; collapse tabs into spaces
    // so whitespace-separated files only need empty-field filtering.
    let mut input = String::with_capacity(text.len());
    for line in text.lines() {
        let data = line.split_once('#').map_or(line, |(data, _)| data);
        if delimiter == b' ' {
            input.push_str(&data.replace('\t', " "));
        } else {
            input.push_str(data);
        }
        input.push('\n');
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(input.as_bytes());

    let mut points = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                rows_read += 1;
                let line = e.position().map(|p| p.line() as usize).unwrap_or(idx + 1);
                row_errors.push(RowError {
                    line,
                    message: format!("parse error: {e}"),
                });
                continue;
            }
        };

        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 1);

        let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
        if fields.is_empty() {
            continue;
        }
        rows_read += 1;

        match parse_row(&fields) {
            Ok(m) => points.push(m),
            Err(message) => {
                warn!(line, %message, "skipping measurement row");
                row_errors.push(RowError { line, message });
            }
        }
    }

    if points.is_empty() {
        return Err(AppError::new(
            EXIT_NO_DATA,
            "No valid measurements found (expected two numeric columns: vgs id).",
        ));
    }

    let stats = compute_stats(&points)
        .ok_or_else(|| AppError::new(EXIT_NO_DATA, "No valid measurements found."))?;

    Ok(MeasurementSet {
        points,
        stats,
        row_errors,
        rows_read,
    })
}

fn detect_delimiter(text: &str) -> u8 {
    let first = text
        .lines()
        .map(|l| l.split_once('#').map_or(l, |(data, _)| data).trim())
        .find(|l| !l.is_empty())
        .unwrap_or("");

    if first.contains(',') {
        b','
    } else if first.contains(';') {
        b';'
    } else {
        b' '
    }
}

fn parse_row(fields: &[&str]) -> Result<Measurement, String> {
    if fields.len() < 2 {
        return Err(format!("expected two columns (vgs id), got {}", fields.len()));
    }
    let vgs = parse_f64(fields[0], "vgs")?;
    let id = parse_f64(fields[1], "id")?;
    Ok(Measurement { vgs, id })
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("invalid `{name}` value '{s}'"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("non-finite `{name}` value '{s}'"))
    }
}

fn compute_stats(points: &[Measurement]) -> Option<DatasetStats> {
    let mut vgs_min = f64::INFINITY;
    let mut vgs_max = f64::NEG_INFINITY;
    let mut id_min = f64::INFINITY;
    let mut id_max = f64::NEG_INFINITY;

    for p in points {
        vgs_min = vgs_min.min(p.vgs);
        vgs_max = vgs_max.max(p.vgs);
        id_min = id_min.min(p.id);
        id_max = id_max.max(p.id);
    }

    if !vgs_min.is_finite() || !vgs_max.is_finite() || !id_min.is_finite() || !id_max.is_finite() {
        return None;
    }

    Some(DatasetStats {
        n_points: points.len(),
        vgs_min,
        vgs_max,
        id_min,
        id_max,
    })
}
