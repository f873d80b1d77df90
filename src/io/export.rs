//! Write measurement files and design reports.
//!
//! Measurement files use the same two-column layout `ingest` reads, so a
//! synthetic sweep can be fed straight back into `fit` or `design`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::Measurement;
use crate::error::AppError;

/// Write a whitespace-separated `vgs id` file with a comment header.
pub fn write_measurements(path: &Path, points: &[Measurement], header: &str) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::input(format!("Failed to create measurement file '{}': {e}", path.display()))
    })?;
    write_measurements_to(&mut file, points, header)
        .map_err(|e| AppError::input(format!("Failed to write measurement file: {e}")))
}

/// Same as `write_measurements`, to any writer (stdout for `synth` without `-o`).
pub fn write_measurements_to<W: Write>(
    out: &mut W,
    points: &[Measurement],
    header: &str,
) -> std::io::Result<()> {
    for line in header.lines() {
        writeln!(out, "# {line}")?;
    }
    writeln!(out, "# vgs[V] id[A]")?;
    for p in points {
        writeln!(out, "{:.6} {:.9e}", p.vgs, p.id)?;
    }
    Ok(())
}

/// Write any serializable report as pretty JSON.
pub fn write_design_json<T: Serialize>(path: &Path, report: &T) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::input(format!("Failed to create design JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::input(format!("Failed to write design JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_measurements;

    #[test]
    fn written_measurements_parse_back() {
        let pts = vec![
            Measurement { vgs: 2.5, id: 0.0025 },
            Measurement { vgs: 3.0, id: 0.01 },
        ];
        let mut buf = Vec::new();
        write_measurements_to(&mut buf, &pts, "synthetic\nk=0.01").unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("# synthetic\n# k=0.01\n"));

        let set = parse_measurements(&text).unwrap();
        assert!(set.row_errors.is_empty());
        assert_eq!(set.points.len(), 2);
        assert!((set.points[1].id - 0.01).abs() < 1e-15);
    }
}
