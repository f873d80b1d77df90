//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initializes logging
//! - runs the fit / design / resistor / synth workflows
//! - prints reports/plots and writes optional exports

use clap::Parser;
use tracing::debug;

use crate::cli::{Cli, Command, DesignArgs, FitArgs, ResistorCommand, SynthArgs, TuiArgs};
use crate::domain::{ESeries, FetParams, FitConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `fetbias` binary.
pub fn run() -> Result<(), AppError> {
    // Environment overrides (FETBIAS_*) may live in a local `.env`.
    dotenvy::dotenv().ok();

    let mut argv: Vec<String> = std::env::args().collect();
    if argv.len() == 1 {
        // No arguments: pick a measurement file, then design with defaults.
        let path = crate::cli::picker::prompt_for_measurement_path()?;
        argv.push(path.display().to_string());
    }
    let argv = rewrite_args(argv);
    let cli = Cli::parse_from(argv);

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    debug!(?cli, "parsed arguments");

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Design(args) => handle_design(args),
        Command::Resistor { command } => handle_resistor(command),
        Command::Synth(args) => handle_synth(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);

    if config.diagnose {
        // The aux function only needs the data, not a successful fit.
        let set = crate::io::load_measurements(&config.data_path)?;
        print!("{}", crate::report::format_row_errors(&set.row_errors));
        let stop = set.stats.vgs_max.max(10.0);
        let series = crate::fit::aux_polynomial(&set.points, 0.0, stop, config.plot_width);
        println!(
            "{}",
            crate::plot::render_series_plot(&series, config.plot_width, config.plot_height, "vt", "d(vt)")
        );
        println!("A good --seed lies just above the zero crossing of d(vt).");
        return Ok(());
    }

    let run = pipeline::run_fit(&config)?;
    print!("{}", crate::report::format_row_errors(&run.set.row_errors));
    println!("{}", crate::report::format_fit_summary(&run.set.stats, &run.report));

    if let Some((gain_db, rd)) = config.targets {
        let targets = crate::stage::bias_targets(&run.report.params, gain_db, rd, 0.0);
        println!("{}", crate::report::format_targets(&targets, rd));
    }

    if config.plot {
        let plot = crate::plot::render_transfer_plot(
            &run.set.points,
            &run.report.params,
            None,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    if let Some(path) = &config.svg_path {
        crate::plot::write_transfer_svg(path, &run.set.points, &run.report.params, None)?;
    }
    if let Some(path) = &config.export_model {
        let model = crate::io::build_model(&run.report, run.set.stats.vgs_max, Some(run.path.as_path()));
        crate::io::write_model_json(path, &model)?;
    }

    Ok(())
}

fn handle_design(args: DesignArgs) -> Result<(), AppError> {
    let device = pipeline::resolve_device(&args.device)?;
    if let Some(fit) = &device.fit {
        print!("{}", crate::report::format_row_errors(&fit.set.row_errors));
    }

    let config = args.stage.to_config();
    let run = pipeline::run_design(device.params, &config)?;
    let op = run.stage.operating_point();
    println!("{}", crate::report::format_design_report(&run.stage));

    if args.plot {
        let plot = crate::plot::render_transfer_plot(
            device.points(),
            &device.params,
            Some((op.vgs, op.id)),
            args.size.width,
            args.size.height,
        );
        println!("{plot}");
    }
    if let Some(path) = &args.svg {
        crate::plot::write_transfer_svg(path, device.points(), &device.params, Some((op.vgs, op.id)))?;
    }
    if let Some(path) = &args.json {
        let report = crate::report::DesignReport::new(&run.stage, Some(run.targets));
        crate::io::write_design_json(path, &report)?;
    }

    Ok(())
}

fn handle_resistor(command: ResistorCommand) -> Result<(), AppError> {
    match command {
        ResistorCommand::Nearest { value, e96 } => {
            let series = ESeries::from_flag(e96);
            let r = crate::resistor::nearest_standard(value, series);
            println!("{} ({} Ω, {})", crate::resistor::format_resistor(r, series), r, series.display_name());
        }
        ResistorCommand::Divider {
            vdd,
            target,
            e96,
            odiv,
        } => {
            let series = ESeries::from_flag(e96);
            let d = crate::resistor::best_divider(vdd, target, series).ok_or_else(|| {
                AppError::input(format!("Cannot build a divider from {vdd} V to {target} V."))
            })?;
            let (r1, r2) = d.scaled(odiv);
            println!("R1 = {:>5}", crate::resistor::format_resistor(r1, series));
            println!("R2 = {:>5}", crate::resistor::format_resistor(r2, series));
            println!("Vout = {:.3} V (error {:.3} V)", d.vout, d.error);
        }
    }
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = crate::data::SynthConfig {
        params: FetParams::new(args.k, args.vt),
        vgs_start: args.vmin,
        vgs_stop: args.vmax,
        count: args.n,
        noise_rel: args.noise,
        vgs_noise: args.vgs_noise,
        seed: args.seed,
    };
    let points = crate::data::generate_measurements(&config)?;
    let header = format!(
        "synthetic sweep: k={} A/V^2 vt={} V noise={} seed={}",
        args.k, args.vt, args.noise, args.seed
    );

    match &args.output {
        Some(path) => crate::io::write_measurements(path, &points, &header),
        None => {
            let stdout = std::io::stdout();
            crate::io::write_measurements_to(&mut stdout.lock(), &points, &header)
                .map_err(|e| AppError::input(format!("Failed to write to stdout: {e}")))
        }
    }
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    crate::tui::run(args)
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        data_path: args.file.clone(),
        method: args.method.method,
        bisect_seed: args.method.seed,
        diagnose: args.diagnose,
        targets: args.gain.zip(args.rd),
        plot: args.plot && !args.no_plot,
        plot_width: args.size.width,
        plot_height: args.size.height,
        svg_path: args.svg.clone(),
        export_model: args.export_model.clone(),
    }
}

/// Rewrite argv for the shorthand invocations.
///
/// Rules:
/// - `fetbias FILE ...`                     -> `fetbias design FILE ...`
/// - `fetbias --log-level debug FILE ...`   -> `fetbias --log-level debug design FILE ...`
/// - `fetbias --help/--version/-h`          -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    // Skip leading global `--log-level` flags.
    let mut idx = 1;
    while let Some(arg) = argv.get(idx) {
        if arg == "--log-level" {
            idx += 2;
        } else if arg.starts_with("--log-level=") {
            idx += 1;
        } else {
            break;
        }
    }

    let Some(arg) = argv.get(idx) else {
        return argv;
    };
    let is_subcommand = matches!(
        arg.as_str(),
        "fit" | "design" | "resistor" | "synth" | "tui" | "help"
    );
    if is_subcommand || arg.starts_with('-') {
        return argv;
    }

    argv.insert(idx, "design".to_string());
    argv
}
