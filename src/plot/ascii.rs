//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid, deterministic output (golden tests).
//!
//! Plot elements:
//! - measured points: `o`
//! - fitted transfer curve: `-` line
//! - quiescent point: `Q`
//! - zero line of a generic series: `.`

use crate::domain::{FetParams, Measurement};
use crate::math::linspace;
use crate::models::predict;

/// Plot measured `id(vgs)` with the fitted curve and an optional quiescent
/// point `(vgs, id)`. Currents are shown in mA.
pub fn render_transfer_plot(
    points: &[Measurement],
    params: &FetParams,
    quiescent: Option<(f64, f64)>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = transfer_range(points, params, quiescent);
    let curve: Vec<(f64, f64)> = linspace(params.vt.max(x_min), x_max, width)
        .into_iter()
        .map(|v| (v, predict(params, v) * 1000.0))
        .collect();
    let observed: Vec<(f64, f64)> = points.iter().map(|p| (p.vgs, p.id * 1000.0)).collect();
    let marker = quiescent.map(|(v, i)| (v, i * 1000.0));

    let mut ys: Vec<f64> = observed.iter().chain(curve.iter()).map(|&(_, y)| y).collect();
    ys.extend(marker.map(|(_, y)| y));
    let (y_min, y_max) = y_range(&ys).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let frame = Frame {
        x_min,
        x_max,
        y_min,
        y_max,
        width,
        height,
    };
    let mut grid = vec![vec![' '; width]; height];
    frame.draw_curve(&mut grid, &curve);
    for &(x, y) in &observed {
        grid[frame.row(y)][frame.col(x)] = 'o';
    }
    if let Some((x, y)) = marker {
        grid[frame.row(y)][frame.col(x)] = 'Q';
    }

    let header = format!(
        "Plot: vgs=[{x_min:.3}, {x_max:.3}] V | id=[{y_min:.2}, {y_max:.2}] mA\n"
    );
    finish(header, grid)
}

/// Plot a sampled curve `(x, y)`; the `y = 0` line is dotted when in range.
pub fn render_series_plot(
    series: &[(f64, f64)],
    width: usize,
    height: usize,
    x_label: &str,
    y_label: &str,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let xs: Vec<f64> = series.iter().map(|&(x, _)| x).collect();
    let ys: Vec<f64> = series.iter().map(|&(_, y)| y).collect();
    let (x_min, x_max) = y_range(&xs).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = y_range(&ys).unwrap_or((-1.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let frame = Frame {
        x_min,
        x_max,
        y_min,
        y_max,
        width,
        height,
    };
    let mut grid = vec![vec![' '; width]; height];
    if y_min < 0.0 && y_max > 0.0 {
        let row = frame.row(0.0);
        grid[row].iter_mut().for_each(|c| *c = '.');
    }
    // The curve overwrites the axis where they cross.
    let mut curve_grid = vec![vec![' '; width]; height];
    frame.draw_curve(&mut curve_grid, series);
    for (row, curve_row) in grid.iter_mut().zip(curve_grid) {
        for (c, cc) in row.iter_mut().zip(curve_row) {
            if cc != ' ' {
                *c = cc;
            }
        }
    }

    let header = format!(
        "Plot: {x_label}=[{x_min:.3}, {x_max:.3}] | {y_label}=[{y_min:.3e}, {y_max:.3e}]\n"
    );
    finish(header, grid)
}

fn finish(mut out: String, grid: Vec<Vec<char>>) -> String {
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn transfer_range(
    points: &[Measurement],
    params: &FetParams,
    quiescent: Option<(f64, f64)>,
) -> (f64, f64) {
    let mut xs: Vec<f64> = points.iter().map(|p| p.vgs).collect();
    xs.push(params.vt);
    xs.extend(quiescent.map(|(v, _)| v));
    y_range(&xs).unwrap_or((params.vt, params.vt + 2.0))
}

fn y_range(values: &[f64]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values.iter().filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

struct Frame {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    width: usize,
    height: usize,
}

impl Frame {
    fn col(&self, x: f64) -> usize {
        let u = ((x - self.x_min) / (self.x_max - self.x_min)).clamp(0.0, 1.0);
        (u * (self.width as f64 - 1.0)).round() as usize
    }

    fn row(&self, y: f64) -> usize {
        let u = ((y - self.y_min) / (self.y_max - self.y_min)).clamp(0.0, 1.0);
        // top row is y_max
        (self.height as f64 - 1.0 - (u * (self.height as f64 - 1.0))).round() as usize
    }

    fn draw_curve(&self, grid: &mut [Vec<char>], curve: &[(f64, f64)]) {
        let mut prev = None;
        for &(x, y) in curve.iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
            let (c, r) = (self.col(x), self.row(y));
            match prev {
                Some((c0, r0)) => draw_line(grid, c0, r0, c, r, '-'),
                None => grid[r][c] = '-',
            }
            prev = Some((c, r));
        }
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
