//! SVG export of the transfer curve.
//!
//! Same content as the terminal plot, rendered with plotters:
//! measured points, fitted curve from `vt` upwards, and the quiescent point.

use std::path::Path;

use plotters::prelude::*;

use crate::domain::{FetParams, Measurement};
use crate::error::AppError;
use crate::math::linspace;
use crate::models::predict;

const SIZE: (u32, u32) = (900, 600);
const CURVE_POINTS: usize = 200;

/// Write an SVG chart of `id(vgs)` (mA) to `path`.
pub fn write_transfer_svg(
    path: &Path,
    points: &[Measurement],
    params: &FetParams,
    quiescent: Option<(f64, f64)>,
) -> Result<(), AppError> {
    draw_transfer(path, points, params, quiescent)
        .map_err(|e| AppError::input(format!("Failed to write SVG '{}': {e}", path.display())))
}

fn draw_transfer(
    path: &Path,
    points: &[Measurement],
    params: &FetParams,
    quiescent: Option<(f64, f64)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut x_min = params.vt;
    let mut x_max = params.vt;
    for v in points.iter().map(|p| p.vgs).chain(quiescent.map(|(v, _)| v)) {
        x_min = x_min.min(v);
        x_max = x_max.max(v);
    }
    if x_max <= x_min {
        x_max = x_min + 2.0;
    }

    let curve: Vec<(f64, f64)> = linspace(params.vt.max(x_min), x_max, CURVE_POINTS)
        .into_iter()
        .map(|v| (v, predict(params, v) * 1000.0))
        .collect();
    let measured: Vec<(f64, f64)> = points.iter().map(|p| (p.vgs, p.id * 1000.0)).collect();

    let y_max = measured
        .iter()
        .chain(curve.iter())
        .map(|&(_, y)| y)
        .chain(quiescent.map(|(_, i)| i * 1000.0))
        .filter(|y| y.is_finite())
        .fold(0.0f64, f64::max)
        .max(1e-3)
        * 1.05;
    let y_min = measured.iter().map(|&(_, y)| y).fold(0.0f64, f64::min);

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("K = {:.2} mA/V², Vt = {:.2} V", params.k_ma(), params.vt),
            ("sans-serif", 20),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Vgs (V)")
        .y_desc("Id (mA)")
        .draw()?;

    chart
        .draw_series(LineSeries::new(curve, &BLUE))?
        .label("fit")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(measured.iter().map(|&p| Circle::new(p, 3, BLACK.filled())))?
        .label("measured")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLACK.filled()));

    if let Some((vgs, id)) = quiescent {
        chart
            .draw_series(std::iter::once(Circle::new((vgs, id * 1000.0), 5, RED.filled())))?
            .label("Q")
            .legend(|(x, y)| Circle::new((x + 10, y), 5, RED.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
