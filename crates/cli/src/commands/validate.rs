//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::DriveConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    frequency_hz: f64,
    main_loop_period_s: f64,
    ticks_per_period: f64,
    module_count: usize,
    signal_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    frequency_hz: config.odometry.frequency_hz,
                    main_loop_period_s: config.odometry.main_loop_period_s,
                    ticks_per_period: config.odometry.ticks_per_period(),
                    module_count: config.modules.len(),
                    signal_count: 2 * config.modules.len() + 1,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &DriveConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let odometry = &config.odometry;

    if odometry.ticks_per_period() < 2.0 {
        warnings.push(format!(
            "only {:.1} samples per period - high-rate odometry gains little",
            odometry.ticks_per_period()
        ));
    }
    if odometry.frequency_hz > 1000.0 {
        warnings.push(format!(
            "sampling at {} Hz may saturate the sensor bus",
            odometry.frequency_hz
        ));
    }
    if config.gyro.yaw_rate_frequency_hz < 1.0 / odometry.main_loop_period_s {
        warnings.push("gyro yaw rate refreshes slower than the main loop".to_string());
    }
    for module in &config.modules {
        if !(0.0..360.0).contains(&module.absolute_offset_deg) {
            warnings.push(format!(
                "module '{}' offset {} deg is outside [0, 360)",
                module.name, module.absolute_offset_deg
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Sampling: {} Hz", summary.frequency_hz);
            println!("  Main loop: {} s", summary.main_loop_period_s);
            println!("  Samples per period: {:.1}", summary.ticks_per_period);
            println!("  Modules: {}", summary.module_count);
            println!("  Sampled signals: {}", summary.signal_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
