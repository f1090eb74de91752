//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Swerve Odometry - high-rate drivetrain odometry sampling
#[derive(Parser, Debug)]
#[command(
    name = "swerve-odometry",
    author,
    version,
    about = "Swerve drivetrain odometry sampling pipeline",
    long_about = "Samples swerve module encoders and the heading sensor on a background \n\
                  thread far faster than the control loop, and hands timestamped \n\
                  samples to the loop once per period. `run` drives it against \n\
                  simulated hardware."
)]
pub struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace, -vvv adds per-tick events)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SWERVE_ODOMETRY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SWERVE_ODOMETRY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the odometry pipeline against simulated hardware
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config/robot.toml",
        env = "SWERVE_ODOMETRY_CONFIG"
    )]
    pub config: PathBuf,

    /// Run time in seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "0", env = "SWERVE_ODOMETRY_DURATION")]
    pub duration: f64,

    /// Probability that any simulated sensor read fails
    #[arg(long, default_value = "0.0", env = "SWERVE_ODOMETRY_FAILURE_RATE")]
    pub failure_rate: f64,

    /// Steering encoder drift injected into every module at start (degrees)
    #[arg(long, default_value = "0.0")]
    pub drift_deg: f64,

    /// Simulated wheel speed (rad/s)
    #[arg(long, default_value = "10.0")]
    pub wheel_speed: f64,

    /// Simulated steering rate (rad/s)
    #[arg(long, default_value = "0.5")]
    pub steer_rate: f64,

    /// Simulated robot yaw rate (deg/s)
    #[arg(long, default_value = "30.0")]
    pub yaw_rate: f64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SWERVE_ODOMETRY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config/robot.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/robot.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
