//! Plotters-powered transfer-curve chart widget for Ratatui.
//!
//! Plotters output is rendered into the Ratatui buffer using
//! `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A render-only chart description; all series and bounds are computed
/// outside the render call.
pub struct TransferChart<'a> {
    /// Fitted `id(vgs)` curve (mA).
    pub curve: &'a [(f64, f64)],
    /// Measured points (mA).
    pub points: &'a [(f64, f64)],
    /// Source load line `id = (vg - vgs) / Rs` (mA); empty for a grounded source.
    pub load_line: &'a [(f64, f64)],
    /// Quiescent point (mA).
    pub quiescent: Option<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl<'a> Widget for TransferChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite())
            || x1 <= x0
            || y1 <= y0
        {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            // Axis labels are drawn by the caller in terminal cells; plotters
            // only draws the axes.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_labels(0)
                .y_labels(0)
                .axis_style(&WHITE)
                .draw()?;

            let curve_color = RGBColor(0, 255, 255); // cyan
            let load_color = RGBColor(255, 255, 0); // yellow
            let q_color = RGBColor(255, 0, 0); // red

            chart.draw_series(LineSeries::new(self.curve.iter().copied(), &curve_color))?;
            if !self.load_line.is_empty() {
                chart.draw_series(LineSeries::new(self.load_line.iter().copied(), &load_color))?;
            }

            // `Circle` radii are mapped incorrectly by the ratatui backend;
            // pixels read as clean dots in a terminal.
            chart.draw_series(self.points.iter().map(|&(x, y)| Pixel::new((x, y), WHITE)))?;
            if let Some(q) = self.quiescent {
                chart.draw_series(std::iter::once(Pixel::new(q, q_color)))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
