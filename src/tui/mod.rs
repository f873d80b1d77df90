//! Ratatui-based stage explorer.
//!
//! Shows the transfer curve with the measured points, the quiescent point and
//! the source load line, next to a settings panel. Gain, divider decade and
//! series changes redesign the network; supply and resistor changes re-solve
//! the existing network, stepping resistors through standard values. A change
//! that would leave saturation is rejected and the reason shown in the status
//! line.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::app::pipeline::{Device, resolve_device};
use crate::cli::TuiArgs;
use crate::domain::DesignConfig;
use crate::error::AppError;
use crate::math::linspace;
use crate::models::predict;
use crate::resistor::{format_resistor, step_standard};
use crate::stage::CommonSourceStage;

mod plotters_chart;

use plotters_chart::TransferChart;

/// Start the TUI.
pub fn run(args: TuiArgs) -> Result<(), AppError> {
    // Resolve (and fit) before touching the terminal so errors print normally.
    let device = resolve_device(&args.device)?;
    let mut app = App::new(device, args.stage.to_config());

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::numeric(format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::numeric(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::numeric(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Vdd,
    Gain,
    Odiv,
    Series,
    R1,
    R2,
    Rd,
    Rs,
}

const FIELDS: [Field; 8] = [
    Field::Vdd,
    Field::Gain,
    Field::Odiv,
    Field::Series,
    Field::R1,
    Field::R2,
    Field::Rd,
    Field::Rs,
];

const VDD_STEP: f64 = 0.5;
const GAIN_STEP: f64 = 1.0;
const ODIV_RANGE: (i32, i32) = (0, 7);

struct App {
    device: Device,
    config: DesignConfig,
    /// `None` until a design lands in saturation.
    stage: Option<CommonSourceStage>,
    selected_field: usize,
    status: String,
}

impl App {
    fn new(device: Device, config: DesignConfig) -> Self {
        let mut app = Self {
            device,
            config: config.clone(),
            stage: None,
            selected_field: 0,
            status: String::new(),
        };
        app.redesign(config);
        app
    }

    fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::numeric(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::numeric(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::numeric(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user quits.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.selected_field = self.selected_field.saturating_sub(1),
            KeyCode::Down => self.selected_field = (self.selected_field + 1).min(FIELDS.len() - 1),
            KeyCode::Left => self.adjust(false),
            KeyCode::Right => self.adjust(true),
            KeyCode::Char('r') => self.redesign(self.config.clone()),
            _ => {}
        }
        false
    }

    fn field(&self) -> Field {
        FIELDS[self.selected_field]
    }

    fn adjust(&mut self, up: bool) {
        let sign = if up { 1.0 } else { -1.0 };
        let field = self.field();
        let series = self.config.series;
        let mut next = self.config.clone();

        match field {
            Field::Gain => {
                next.gain_db += sign * GAIN_STEP;
                self.redesign(next);
            }
            Field::Odiv => {
                next.odiv = (next.odiv + if up { 1 } else { -1 }).clamp(ODIV_RANGE.0, ODIV_RANGE.1);
                self.redesign(next);
            }
            Field::Series => {
                next.series = next.series.toggle();
                self.redesign(next);
            }
            Field::Vdd => {
                let vdd = (next.vdd + sign * VDD_STEP).max(VDD_STEP);
                self.tune(|s| s.set_vdd(vdd), |c| c.vdd = vdd, format!("Vdd = {vdd:.1} V"));
            }
            Field::Rd => {
                let rd = step_standard(next.rd, series, up).max(1.0);
                self.tune(
                    |s| s.set_rd(rd),
                    |c| c.rd = rd,
                    format!("Rd = {}", format_resistor(rd, series)),
                );
            }
            Field::Rs => {
                let rs = step_standard(next.rs, series, up);
                self.tune(
                    |s| s.set_rs(rs),
                    |c| c.rs = rs,
                    format!("Rs = {}", format_resistor(rs, series)),
                );
            }
            Field::R1 | Field::R2 => {
                let Some(stage) = &mut self.stage else {
                    self.status = "No valid network to tune; change Gain/Rd first.".to_string();
                    return;
                };
                let net = stage.network();
                let (label, result) = if field == Field::R1 {
                    let r1 = step_standard(net.r1, series, up);
                    (format!("R1 = {}", format_resistor(r1, series)), stage.set_r1(r1))
                } else {
                    let r2 = step_standard(net.r2, series, up);
                    (format!("R2 = {}", format_resistor(r2, series)), stage.set_r2(r2))
                };
                self.status = match result {
                    Ok(()) => label,
                    Err(e) => format!("{label}: {e}"),
                };
            }
        }
    }

    /// Re-solve the current network after a supply/drain/source change.
    ///
    /// Without a valid network the change is applied to the settings and the
    /// network is redesigned instead.
    fn tune(
        &mut self,
        apply: impl FnOnce(&mut CommonSourceStage) -> Result<(), crate::stage::RegionError>,
        update: impl FnOnce(&mut DesignConfig),
        label: String,
    ) {
        match &mut self.stage {
            Some(stage) => match apply(stage) {
                Ok(()) => {
                    update(&mut self.config);
                    self.status = label;
                }
                Err(e) => self.status = format!("{label}: {e}"),
            },
            None => {
                let mut next = self.config.clone();
                update(&mut next);
                self.redesign(next);
            }
        }
    }

    /// Design from the gain target. A failure keeps the previous network;
    /// with no previous network the settings still move so the user can walk
    /// out of the failing region.
    fn redesign(&mut self, next: DesignConfig) {
        match CommonSourceStage::from_gain(self.device.params, &next) {
            Ok(stage) => {
                self.status = format!(
                    "Designed for {:.0} dB: achieved {:.1} dB",
                    next.gain_db,
                    stage.gain_db()
                );
                let net = stage.network();
                self.config = DesignConfig {
                    rd: net.rd,
                    rs: net.rs,
                    ..next
                };
                self.stage = Some(stage);
            }
            Err(e) => {
                self.status = format!("Redesign rejected: {e}");
                if self.stage.is_none() {
                    self.config = next;
                }
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let p = self.device.params;
        let mut lines = vec![Line::from(vec![
            Span::styled("fetbias", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" | {}", self.device.origin)),
        ])];

        let fit_line = match &self.device.fit {
            Some(run) => format!(
                "K = {:.2} mA/V² | Vt = {:.2} V | {} | n={} | R²={}",
                p.k_ma(),
                p.vt,
                run.report.method.display_name(),
                run.report.quality.n,
                run.report
                    .quality
                    .r_squared
                    .map_or_else(|| "n/a".to_string(), |r2| format!("{r2:.4}"))
            ),
            None => format!("K = {:.2} mA/V² | Vt = {:.2} V", p.k_ma(), p.vt),
        };
        lines.push(Line::from(Span::styled(fit_line, Style::default().fg(Color::Gray))));

        let widget = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(widget, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(34)])
            .split(area);
        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(FIELDS.len() as u16 + 2), Constraint::Min(0)])
            .split(chunks[1]);

        self.draw_chart(frame, chunks[0]);
        self.draw_settings(frame, side[0]);
        self.draw_operating_point(frame, side[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Transfer curve").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let series = chart_series(&self.device, self.stage.as_ref());
        let (chart_rect, insets) = chart_layout(inner);
        let widget = TransferChart {
            curve: &series.curve,
            points: &series.points,
            load_line: &series.load_line,
            quiescent: series.quiescent,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, series.x_bounds, series.y_bounds);
        }
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let series = self.config.series;
        let net = self.stage.as_ref().map(|s| s.network());
        let r = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format_resistor(v, series));

        let items: Vec<ListItem> = FIELDS
            .iter()
            .map(|f| {
                let text = match f {
                    Field::Vdd => format!("Vdd:    {:.1} V", self.config.vdd),
                    Field::Gain => format!("Gain:   {:.0} dB", self.config.gain_db),
                    Field::Odiv => format!("Odiv:   {}", self.config.odiv),
                    Field::Series => format!("Series: {}", series.display_name()),
                    Field::R1 => format!("R1:     {}", r(net.map(|n| n.r1))),
                    Field::R2 => format!("R2:     {}", r(net.map(|n| n.r2))),
                    Field::Rd => format!("Rd:     {}", format_resistor(self.config.rd, series)),
                    Field::Rs => format!("Rs:     {}", format_resistor(self.config.rs, series)),
                };
                ListItem::new(text)
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_operating_point(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Operating point").borders(Borders::ALL);
        let Some(stage) = &self.stage else {
            let msg = Paragraph::new("No valid design")
                .style(Style::default().fg(Color::Yellow))
                .block(block);
            frame.render_widget(msg, area);
            return;
        };

        let op = stage.operating_point();
        let h = stage.headroom();
        let lines: Vec<Line> = [
            format!("Vgsq = {:>6.2} V", op.vgs),
            format!("Vdsq = {:>6.2} V", op.vds),
            format!("Vdq  = {:>6.2} V", op.vd),
            format!("Vgq  = {:>6.2} V", op.vg),
            format!("Vsq  = {:>6.2} V", op.vs),
            format!("Idq  = {:>6.2} mA", op.id * 1000.0),
            format!("Gain = {:>6.1} dB", stage.gain_db()),
            format!("Zi   = {:>6.1} kΩ", stage.zi() / 1000.0),
            format!("Vd-Vg  {:>6.2} V", h.gate_drain),
            format!("Imax-Id {:>5.1} mA", h.current * 1000.0),
        ]
        .into_iter()
        .map(Line::from)
        .collect();

        frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  r redesign  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Chart data in display units (V, mA).
struct ChartSeries {
    curve: Vec<(f64, f64)>,
    points: Vec<(f64, f64)>,
    load_line: Vec<(f64, f64)>,
    quiescent: Option<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

fn chart_series(device: &Device, stage: Option<&CommonSourceStage>) -> ChartSeries {
    let params = device.params;
    let points: Vec<(f64, f64)> = device
        .points()
        .iter()
        .map(|p| (p.vgs, p.id * 1000.0))
        .collect();
    let quiescent = stage.map(|s| {
        let op = s.operating_point();
        (op.vgs, op.id * 1000.0)
    });

    let mut x0 = params.vt;
    let mut x1 = params.vt;
    for &(x, _) in points.iter().chain(quiescent.iter()) {
        x0 = x0.min(x);
        x1 = x1.max(x);
    }
    if let Some(s) = stage {
        // Leave room for the gate voltage (load line end) and some overdrive.
        x1 = x1.max(s.operating_point().vg);
    }
    if x1 <= x0 {
        x1 = x0 + 2.0;
    }
    x1 += 0.1 * (x1 - x0);

    let curve: Vec<(f64, f64)> = linspace(params.vt.max(x0), x1, 200)
        .into_iter()
        .map(|v| (v, predict(&params, v) * 1000.0))
        .collect();

    let mut y_max = points
        .iter()
        .chain(quiescent.iter())
        .map(|&(_, y)| y)
        .fold(0.0_f64, f64::max);
    if let Some((_, qy)) = quiescent {
        // Keep the quiescent point in the lower part of the chart.
        y_max = y_max.max(2.0 * qy);
    }
    if y_max <= 0.0 {
        y_max = curve.iter().map(|&(_, y)| y).fold(1.0, f64::max);
    }
    let y_bounds = [0.0, y_max * 1.05];

    let load_line = stage
        .and_then(|s| {
            let line: Vec<(f64, f64)> = linspace(x0, x1, 100)
                .into_iter()
                .filter_map(|v| s.source_load_line(v).map(|i| (v, i * 1000.0)))
                .filter(|&(_, y)| y >= y_bounds[0] && y <= y_bounds[1])
                .collect();
            (!line.is_empty()).then_some(line)
        })
        .unwrap_or_default();

    ChartSeries {
        curve,
        points,
        load_line,
        quiescent,
        x_bounds: [x0, x1],
        y_bounds,
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = format!("{x_val:.2}");
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        let width = label.len() as u16;
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.1}");
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        let width = label.len() as u16;
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("Vgs (V)")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new("Id (mA)")
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FetParams;

    fn app(rd: f64) -> App {
        let device = Device {
            params: FetParams::new(0.05, 2.0),
            fit: None,
            origin: "test".to_string(),
        };
        App::new(
            device,
            DesignConfig {
                rd,
                ..DesignConfig::default()
            },
        )
    }

    fn select(app: &mut App, field: Field) {
        app.selected_field = FIELDS.iter().position(|f| *f == field).unwrap();
    }

    #[test]
    fn starts_with_a_valid_design() {
        let app = app(1000.0);
        assert!(app.stage.is_some());
        assert!(app.status.starts_with("Designed for 25 dB"));
    }

    #[test]
    fn failing_initial_design_still_lets_settings_move() {
        let mut app = app(100.0);
        assert!(app.stage.is_none());
        assert!(app.status.contains("Too much current") || app.status.contains("triode"));

        select(&mut app, Field::Rd);
        for _ in 0..30 {
            if app.stage.is_some() {
                break;
            }
            app.adjust(true);
        }
        assert!(app.stage.is_some());
        assert!(app.config.rd > 100.0);
    }

    #[test]
    fn rejected_tuning_keeps_network_and_reports_region() {
        let mut app = app(1000.0);
        let before = app.stage.clone();
        select(&mut app, Field::Vdd);
        for _ in 0..30 {
            app.adjust(false);
        }
        // The supply can only drop until the stage leaves saturation.
        assert!(app.stage.is_some());
        assert!(app.config.vdd > VDD_STEP);
        assert!(app.status.contains("Vdd"));
        assert_ne!(app.stage, before);
    }

    #[test]
    fn series_toggle_redesigns() {
        let mut app = app(1000.0);
        select(&mut app, Field::Series);
        app.adjust(true);
        assert_eq!(app.config.series, crate::domain::ESeries::E96);
        assert_eq!(app.stage.as_ref().unwrap().series(), crate::domain::ESeries::E96);
    }

    #[test]
    fn chart_contains_quiescent_point() {
        let app = app(1000.0);
        let s = chart_series(&app.device, app.stage.as_ref());
        let (qx, qy) = s.quiescent.unwrap();
        assert!(qx >= s.x_bounds[0] && qx <= s.x_bounds[1]);
        assert!(qy >= s.y_bounds[0] && qy <= s.y_bounds[1]);
        assert!(s.load_line.is_empty());
        assert_eq!(s.curve.len(), 200);
    }
}
