//! Headless chase camera and lean stabilizer tuner.
//!
//! Writes CSV telemetry (one row per 60 Hz step) to stdout or a file and a
//! `#`-prefixed summary to stderr.
//!
//! Run with: cargo run -p rig-tuning -- lean --yaw-rate 0.5
//! Example: cargo run -p rig-tuning -- --preset scooter chase --obstacles 80 > chase.csv

use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand, ValueEnum};
use rig_tuning::{
    bike::BikeParams,
    presets::Preset,
    scenario::{
        ChaseReport, ChaseScenario, LeanReport, LeanScenario, WARP_OFFSET, run_chase, run_lean,
    },
    telemetry::{
        FileTelemetryOutput, NullTelemetryOutput, StdoutTelemetryOutput, TELEMETRY_PATH,
        TelemetryOutput,
    },
};
use vehicle_rig::{CameraMode, RigConfig};

#[derive(Parser, Debug)]
#[command(name = "rig-tuning")]
#[command(about = "Headless chase camera and lean stabilizer tuner", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Built-in configuration preset.
    #[arg(long, global = true, value_enum)]
    preset: Option<Preset>,

    /// Telemetry destination.
    #[arg(long, global = true, value_enum, default_value_t = OutputKind::Stdout)]
    output: OutputKind,

    /// Telemetry file for `--output file`.
    #[arg(long, global = true, default_value = TELEMETRY_PATH)]
    telemetry_path: PathBuf,

    /// Log more (repeat for trace output).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow a target driving through a field of boxes.
    Chase(ChaseArgs),
    /// Ride an inverted-pendulum motorcycle.
    Lean(LeanArgs),
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputKind {
    Stdout,
    File,
    Discard,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Chase,
    FreeOrbit,
}

impl From<ModeArg> for CameraMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Chase => Self::Chase,
            ModeArg::FreeOrbit => Self::FreeOrbit,
        }
    }
}

#[derive(Args, Debug)]
struct ChaseArgs {
    /// Simulated time in seconds.
    #[arg(long, default_value_t = 20.0)]
    duration: f32,

    /// Target speed in m/s.
    #[arg(long, default_value_t = 8.0)]
    speed: f32,

    /// Target yaw rate in rad/s; zero drives straight.
    #[arg(long, default_value_t = 0.2, allow_negative_numbers = true)]
    yaw_rate: f32,

    /// Camera mode; defaults to the configured one.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Hold x-ray for the whole run.
    #[arg(long)]
    xray: bool,

    /// Number of boxes scattered around the path.
    #[arg(long, default_value_t = 40)]
    obstacles: usize,

    /// Seed for obstacle placement.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Leave the camera controls idle instead of running the input script.
    #[arg(long)]
    no_script: bool,
}

#[derive(Args, Debug)]
struct LeanArgs {
    /// Simulated time in seconds.
    #[arg(long, default_value_t = 10.0)]
    duration: f32,

    /// Ground speed in m/s.
    #[arg(long, default_value_t = 10.0)]
    speed: f32,

    /// Yaw rate in rad/s; positive turns left.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    yaw_rate: f32,

    /// Starting roll in degrees; positive leans right.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    initial_roll: f32,

    /// Ride without the stabilizer.
    #[arg(long)]
    unstabilized: bool,

    /// Teleport the bike at this time in seconds.
    #[arg(long)]
    warp_at: Option<f32>,

    /// Teleport without resetting the stabilizer.
    #[arg(long, requires = "warp_at")]
    skip_warp_reset: bool,

    /// Peak random roll impulse per step, in N·m·s.
    #[arg(long, default_value_t = 0.0)]
    noise: f32,

    /// Seed for the disturbance noise.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Bike mass in kilograms.
    #[arg(long, default_value_t = 200.0)]
    mass: f32,
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let default_filter = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();
}

fn load_config(cli: &Cli) -> vehicle_rig::Result<RigConfig> {
    match (&cli.config, cli.preset) {
        (Some(path), _) => RigConfig::load(path),
        (None, Some(preset)) => {
            tracing::debug!("Using preset {:?}", preset);
            preset.config()
        }
        (None, None) => Ok(RigConfig::default()),
    }
}

fn telemetry_output(cli: &Cli) -> Box<dyn TelemetryOutput> {
    match cli.output {
        OutputKind::Stdout => Box::new(StdoutTelemetryOutput),
        OutputKind::File => Box::new(FileTelemetryOutput::new(&cli.telemetry_path)),
        OutputKind::Discard => Box::new(NullTelemetryOutput),
    }
}

fn run(cli: &Cli) -> vehicle_rig::Result<()> {
    let config = load_config(cli)?;

    match &cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Chase(args) => {
            let scenario = ChaseScenario {
                duration: args.duration,
                speed: args.speed,
                yaw_rate: args.yaw_rate,
                mode: args.mode.map_or(config.camera.mode, CameraMode::from),
                xray: args.xray,
                obstacles: args.obstacles,
                seed: args.seed,
                scripted_input: !args.no_script,
                ..Default::default()
            };
            let mut output = telemetry_output(cli);
            let report = run_chase(&config, &scenario, output.as_mut())?;
            print_chase_summary(&scenario, &report);
        }
        Command::Lean(args) => {
            let bike = BikeParams {
                mass: args.mass,
                ..Default::default()
            }
            .pivoting_on(config.stabilizer.support_offset);
            let scenario = LeanScenario {
                duration: args.duration,
                speed: args.speed,
                yaw_rate: args.yaw_rate,
                initial_roll: args.initial_roll.to_radians(),
                stabilized: !args.unstabilized,
                warp_at: args.warp_at,
                reset_on_warp: !args.skip_warp_reset,
                noise: args.noise,
                seed: args.seed,
                bike,
            };
            let mut output = telemetry_output(cli);
            let report = run_lean(&config, &scenario, output.as_mut())?;
            print_lean_summary(&scenario, &report);
        }
    }
    Ok(())
}

fn print_chase_summary(scenario: &ChaseScenario, report: &ChaseReport) {
    eprintln!();
    eprintln!("# === chase ({:?}) ===", scenario.mode);
    eprintln!("# Steps: {}", report.steps);
    eprintln!("# Obstacles: {}", report.obstacles);
    eprintln!(
        "# Obstructed: {} steps ({:.1}%)",
        report.obstructed_steps,
        percent(report.obstructed_steps, report.steps)
    );
    eprintln!("# Clipped into obstacles: {} steps", report.clipped_steps);
    eprintln!(
        "# Range: {:.2} .. {:.2} m (final {:.2}, preferred {:.2})",
        report.min_range, report.max_range, report.final_range, report.final_preferred_range
    );
    eprintln!(
        "# Vertical FOV: {:.1} degrees",
        (2.0 * report.final_y_tangent.atan()).to_degrees()
    );
}

fn print_lean_summary(scenario: &LeanScenario, report: &LeanReport) {
    eprintln!();
    eprintln!(
        "# === lean ({}) ===",
        if scenario.stabilized {
            "stabilized"
        } else {
            "unstabilized"
        }
    );
    eprintln!("# Steps: {}", report.steps);
    eprintln!(
        "# Balanced lean: {:.2} degrees",
        report.balanced_lean.to_degrees()
    );
    eprintln!("# Final roll: {:.2} degrees", report.final_roll.to_degrees());
    eprintln!("# Max |roll|: {:.2} degrees", report.max_abs_roll.to_degrees());
    eprintln!("# Max impulse: {:.3} N·m·s", report.max_impulse);
    match report.fell_at {
        Some(time) => eprintln!("# Fell at: {time:.2} s"),
        None => eprintln!("# Fell at: (stayed up)"),
    }
    match report.settled_at {
        Some(time) => eprintln!("# Settled at: {time:.2} s"),
        None => eprintln!("# Settled at: (not settled)"),
    }
    if report.warped {
        eprintln!("# Warped by {WARP_OFFSET} (reset: {})", scenario.reset_on_warp);
    }
    if report.degenerate_steps + report.dropped_steps > 0 {
        eprintln!(
            "# Skipped steps: {} degenerate, {} non-finite",
            report.degenerate_steps, report.dropped_steps
        );
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, whole: usize) -> f32 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f32 / whole as f32
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("# ERROR: {error}");
            ExitCode::FAILURE
        }
    }
}
