//! Command-line parsing for the FET bias calculator.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting and stage-design code. Conversion into domain configs happens here;
//! dispatch lives in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DesignConfig, ESeries, FitMethod};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "fetbias",
    version,
    about = "N-channel FET characterization and common-source bias design"
)]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit k and vt to a measurement file and print the estimate.
    Fit(FitArgs),
    /// Design a voltage-divider biased common-source stage for a gain target.
    Design(DesignArgs),
    /// Standard resistor helpers.
    Resistor {
        #[command(subcommand)]
        command: ResistorCommand,
    },
    /// Generate a synthetic measurement file from known parameters.
    Synth(SynthArgs),
    /// Launch the interactive stage explorer.
    Tui(TuiArgs),
}

/// Options for fitting a measurement file.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Measurement file: two columns, vgs (V) and id (A).
    pub file: PathBuf,

    #[command(flatten)]
    pub method: MethodArgs,

    /// Print the auxiliary bisection function to help choose a seed.
    #[arg(long)]
    pub diagnose: bool,

    /// Print the bias targets for this gain (dB); needs --rd.
    #[arg(long, requires = "rd")]
    pub gain: Option<f64>,

    /// Drain resistor (Ω) for the --gain targets.
    #[arg(long, requires = "gain")]
    pub rd: Option<f64>,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    #[command(flatten)]
    pub size: PlotSizeArgs,

    /// Write the transfer curve chart to an SVG file.
    #[arg(long, value_name = "PATH")]
    pub svg: Option<PathBuf>,

    /// Export the fitted model (params + fitted grid) to JSON.
    #[arg(long = "export-model", value_name = "PATH")]
    pub export_model: Option<PathBuf>,
}

/// Fit method selection shared by every command that may fit a file.
#[derive(Debug, Args, Clone)]
pub struct MethodArgs {
    /// Parameter estimation method.
    #[arg(long, value_enum, default_value_t = FitMethod::Lm)]
    pub method: FitMethod,

    /// Upper bracket (V) for --method bisect; defaults to the lowest measured vgs.
    #[arg(long)]
    pub seed: Option<f64>,
}

#[derive(Debug, Args, Clone)]
pub struct PlotSizeArgs {
    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Where the device parameters come from: a measurement file, a saved model,
/// or explicit values.
#[derive(Debug, Args, Clone)]
pub struct DeviceArgs {
    /// Measurement file to fit.
    #[arg(conflicts_with_all = ["model", "k"])]
    pub file: Option<PathBuf>,

    /// Model JSON written by `fit --export-model`.
    #[arg(long, value_name = "JSON", conflicts_with = "k")]
    pub model: Option<PathBuf>,

    /// Transconductance coefficient (A/V²).
    #[arg(long, requires = "vt")]
    pub k: Option<f64>,

    /// Threshold voltage (V).
    #[arg(long, requires = "k")]
    pub vt: Option<f64>,

    #[command(flatten)]
    pub method: MethodArgs,
}

/// Stage-design parameters.
#[derive(Debug, Args, Clone)]
pub struct StageArgs {
    /// Supply voltage (V).
    #[arg(long, env = "FETBIAS_VDD", default_value_t = 12.0)]
    pub vdd: f64,

    /// Drain resistor (Ω), snapped to the series.
    #[arg(long, default_value_t = 100.0)]
    pub rd: f64,

    /// Source resistor (Ω), snapped to the series.
    #[arg(long, default_value_t = 0.0)]
    pub rs: f64,

    /// Target voltage gain (dB).
    #[arg(long, default_value_t = 25.0)]
    pub gain: f64,

    /// Divider decade: both divider resistors are scaled by 10^odiv.
    #[arg(long, default_value_t = 4, allow_negative_numbers = true)]
    pub odiv: i32,

    /// Use the E96 series instead of E24.
    #[arg(long, env = "FETBIAS_E96")]
    pub e96: bool,

    /// Input impedance target (Ω); adds a gate series resistor.
    #[arg(long)]
    pub zi: Option<f64>,

    /// Maximum drain current at the operating point (A).
    #[arg(long = "id-max", env = "FETBIAS_ID_MAX", default_value_t = 0.1)]
    pub id_max: f64,
}

impl StageArgs {
    pub fn to_config(&self) -> DesignConfig {
        DesignConfig {
            vdd: self.vdd,
            rd: self.rd,
            rs: self.rs,
            gain_db: self.gain,
            odiv: self.odiv,
            series: ESeries::from_flag(self.e96),
            zi: self.zi,
            id_max: self.id_max,
        }
    }
}

/// Options for the `design` command.
#[derive(Debug, Args, Clone)]
pub struct DesignArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    #[command(flatten)]
    pub stage: StageArgs,

    /// Render the transfer curve with the quiescent point in the terminal.
    #[arg(long)]
    pub plot: bool,

    #[command(flatten)]
    pub size: PlotSizeArgs,

    /// Write the transfer curve chart to an SVG file.
    #[arg(long, value_name = "PATH")]
    pub svg: Option<PathBuf>,

    /// Write the design (network, operating point, headroom) to JSON.
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum ResistorCommand {
    /// Nearest standard value to a resistance (Ω).
    Nearest {
        value: f64,

        /// Use the E96 series instead of E24.
        #[arg(long, env = "FETBIAS_E96")]
        e96: bool,
    },
    /// Best standard divider from a supply to a target voltage.
    Divider {
        vdd: f64,

        target: f64,

        /// Use the E96 series instead of E24.
        #[arg(long, env = "FETBIAS_E96")]
        e96: bool,

        /// Divider decade: both resistors are scaled by 10^odiv.
        #[arg(long, default_value_t = 4, allow_negative_numbers = true)]
        odiv: i32,
    },
}

/// Options for the `synth` command.
#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Transconductance coefficient (A/V²).
    #[arg(long)]
    pub k: f64,

    /// Threshold voltage (V).
    #[arg(long)]
    pub vt: f64,

    /// First gate voltage of the sweep (V); defaults to vt + 0.2.
    #[arg(long)]
    pub vmin: Option<f64>,

    /// Last gate voltage of the sweep (V).
    #[arg(long, default_value_t = 5.0)]
    pub vmax: f64,

    /// Number of points.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub n: usize,

    /// Relative one-sigma noise on the drain current.
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    /// One-sigma noise on the gate voltage reading (V).
    #[arg(long, default_value_t = 0.0)]
    pub vgs_noise: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output file (stdout when omitted).
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Options for the `tui` command.
#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    #[command(flatten)]
    pub stage: StageArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn design_defaults_follow_the_bench_setup() {
        let cli = Cli::try_parse_from(argv("fetbias design bench.txt")).unwrap();
        let Command::Design(args) = cli.command else {
            panic!("expected design");
        };
        let cfg = args.stage.to_config();
        assert_eq!(cfg.gain_db, 25.0);
        assert_eq!(cfg.rd, 100.0);
        assert_eq!(cfg.odiv, 4);
        assert_eq!(args.device.file, Some(PathBuf::from("bench.txt")));
        assert_eq!(args.device.method.method, FitMethod::Lm);
        assert_eq!(cli.log_level, tracing::Level::WARN);
    }

    #[test]
    fn explicit_parameters_and_negative_odiv() {
        let cli = Cli::try_parse_from(argv(
            "fetbias design --k 0.05 --vt 2 --rd 1000 --odiv -1 --e96 --log-level debug",
        ))
        .unwrap();
        let Command::Design(args) = cli.command else {
            panic!("expected design");
        };
        assert_eq!(args.device.k, Some(0.05));
        assert_eq!(args.stage.odiv, -1);
        assert_eq!(args.stage.to_config().series, ESeries::E96);
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn file_and_model_conflict() {
        assert!(Cli::try_parse_from(argv("fetbias design bench.txt --model m.json")).is_err());
        assert!(Cli::try_parse_from(argv("fetbias design --k 0.05")).is_err());
    }
}
