//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig, SimScenario};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }
    let drive = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        frequency_hz = drive.odometry.frequency_hz,
        main_loop_period_s = drive.odometry.main_loop_period_s,
        modules = drive.modules.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&drive);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        drive,
        duration: duration_from_secs(args.duration)?,
        scenario: SimScenario {
            failure_rate: probability(args.failure_rate)?,
            drift_deg: args.drift_deg,
            wheel_speed_rad_per_sec: args.wheel_speed,
            steer_rate_rad_per_sec: args.steer_rate,
            yaw_rate_deg_per_sec: args.yaw_rate,
        },
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    };

    let pipeline = Pipeline::new(pipeline_config);
    info!("Starting pipeline...");

    let stats = pipeline
        .run(setup_shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        periods = stats.periods,
        samples = stats.samples,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline finished"
    );
    stats.print_summary();

    Ok(())
}

fn duration_from_secs(secs: f64) -> Result<Option<Duration>, CliError> {
    let invalid = || {
        CliError::invalid_argument("duration", format!("must be >= 0 and finite, got {secs}"))
    };
    if !secs.is_finite() || secs < 0.0 {
        return Err(invalid());
    }
    if secs == 0.0 {
        return Ok(None);
    }
    Duration::try_from_secs_f64(secs)
        .map(Some)
        .map_err(|_| invalid())
}

fn probability(p: f64) -> Result<f64, CliError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(CliError::invalid_argument(
            "failure-rate",
            format!("must be within [0, 1], got {p}"),
        ));
    }
    Ok(p)
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping pipeline...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(drive: &contracts::DriveConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Sampling:");
    println!("  Frequency: {} Hz", drive.odometry.frequency_hz);
    println!(
        "  Main loop: {} s ({:.1} ticks/period)",
        drive.odometry.main_loop_period_s,
        drive.odometry.ticks_per_period()
    );
    println!("\nModules ({}):", drive.modules.len());
    for module in &drive.modules {
        println!(
            "  - [{}] {} offset {:.2} deg",
            module.index, module.name, module.absolute_offset_deg
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_zero_is_unbounded() {
        assert_eq!(duration_from_secs(0.0).unwrap(), None);
        assert_eq!(
            duration_from_secs(1.5).unwrap(),
            Some(Duration::from_millis(1500))
        );
        assert!(duration_from_secs(-1.0).is_err());
        assert!(duration_from_secs(1e300).is_err());
    }

    #[test]
    fn test_probability_range() {
        assert!(probability(0.0).is_ok());
        assert!(probability(1.0).is_ok());
        assert!(probability(1.5).is_err());
        assert!(probability(f64::NAN).is_err());
    }
}
