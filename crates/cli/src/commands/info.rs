//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::DriveConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    sampling: SamplingInfo,
    gyro_yaw_rate_frequency_hz: f64,
    modules: Vec<ModuleInfo>,
}

#[derive(Serialize)]
struct SamplingInfo {
    frequency_hz: f64,
    main_loop_period_s: f64,
    ticks_per_period: f64,
    drift_interval_periods: u32,
    drift_threshold_deg: f64,
}

#[derive(Serialize)]
struct ModuleInfo {
    index: usize,
    name: String,
    absolute_offset_deg: f64,
    drive_gear_ratio: f64,
    turn_gear_ratio: f64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&build_config_info(&config))
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn build_config_info(config: &DriveConfig) -> ConfigInfo {
    let odometry = &config.odometry;
    ConfigInfo {
        sampling: SamplingInfo {
            frequency_hz: odometry.frequency_hz,
            main_loop_period_s: odometry.main_loop_period_s,
            ticks_per_period: odometry.ticks_per_period(),
            drift_interval_periods: odometry.drift.interval_periods,
            drift_threshold_deg: odometry.drift.threshold_deg,
        },
        gyro_yaw_rate_frequency_hz: config.gyro.yaw_rate_frequency_hz,
        modules: config
            .modules
            .iter()
            .map(|m| ModuleInfo {
                index: m.index,
                name: m.name.clone(),
                absolute_offset_deg: m.absolute_offset_deg,
                drive_gear_ratio: m.drive_gear_ratio.value(),
                turn_gear_ratio: m.turn_gear_ratio.value(),
            })
            .collect(),
    }
}

fn print_config_info(config: &DriveConfig) {
    let odometry = &config.odometry;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Swerve Odometry Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⏱  Sampling");
    println!("   ├─ Frequency: {} Hz", odometry.frequency_hz);
    println!("   ├─ Main loop: {} s", odometry.main_loop_period_s);
    println!("   ├─ Samples per period: {:.1}", odometry.ticks_per_period());
    println!(
        "   └─ Drift check: every {} periods, threshold {}°",
        odometry.drift.interval_periods, odometry.drift.threshold_deg
    );

    println!("\n🧭 Gyro");
    println!(
        "   └─ Yaw rate refresh: {} Hz",
        config.gyro.yaw_rate_frequency_hz
    );

    println!("\n🛞 Modules ({})", config.modules.len());
    for (i, module) in config.modules.iter().enumerate() {
        let prefix = if i == config.modules.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        println!(
            "   {} [{}] {} (offset {:.2}°, drive {:.3}:1, turn {:.3}:1)",
            prefix,
            module.index,
            module.name,
            module.absolute_offset_deg,
            module.drive_gear_ratio.value(),
            module.turn_gear_ratio.value()
        );
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_info() {
        let info = build_config_info(&DriveConfig::default());
        assert_eq!(info.modules.len(), 4);
        assert_eq!(info.modules[3].name, "back_right");
        assert!((info.sampling.ticks_per_period - 5.0).abs() < 1e-9);
    }
}
