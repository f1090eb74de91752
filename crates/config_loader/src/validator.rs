//! Configuration validation
//!
//! Rules:
//! - exactly one module per index 0..MODULE_COUNT, names unique and non-empty
//! - gear ratios finite and > 0, offsets finite
//! - sampling frequency above the main loop frequency
//! - drift interval > 0, threshold > 0, precision <= 9 decimals
//! - re-seed precision finer than the drift threshold on every module
//! - yaw rate frequency > 0

use std::collections::HashSet;

use contracts::{ContractError, DriveConfig, GearRatio, MODULE_COUNT};

const MAX_PRECISION_DECIMALS: u32 = 9;

/// Validate a DriveConfig
///
/// Returns the first error encountered.
pub fn validate(config: &DriveConfig) -> Result<(), ContractError> {
    validate_module_table(config)?;
    validate_module_calibration(config)?;
    validate_odometry(config)?;
    validate_drift(config)?;
    validate_gyro(config)?;
    Ok(())
}

fn validate_module_table(config: &DriveConfig) -> Result<(), ContractError> {
    let mut indices = HashSet::new();
    let mut names = HashSet::new();

    for module in &config.modules {
        if module.index >= MODULE_COUNT {
            return Err(ContractError::config_validation(
                format!("modules[index={}]", module.index),
                format!("index must be < {MODULE_COUNT}"),
            ));
        }
        if !indices.insert(module.index) {
            return Err(ContractError::config_validation(
                format!("modules[index={}]", module.index),
                "duplicate module index",
            ));
        }
        if module.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("modules[{}].name", module.index),
                "module name cannot be empty",
            ));
        }
        if !names.insert(module.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("modules[{}].name", module.index),
                format!("duplicate module name '{}'", module.name),
            ));
        }
    }

    if let Some(missing) = (0..MODULE_COUNT).find(|i| !indices.contains(i)) {
        return Err(ContractError::config_validation(
            "modules",
            format!("no calibration for module index {missing}"),
        ));
    }
    Ok(())
}

fn validate_module_calibration(config: &DriveConfig) -> Result<(), ContractError> {
    for module in &config.modules {
        if !module.absolute_offset_deg.is_finite() {
            return Err(ContractError::config_validation(
                format!("modules[{}].absolute_offset_deg", module.index),
                "offset must be finite",
            ));
        }
        validate_ratio(
            &format!("modules[{}].drive_gear_ratio", module.index),
            module.drive_gear_ratio,
        )?;
        validate_ratio(
            &format!("modules[{}].turn_gear_ratio", module.index),
            module.turn_gear_ratio,
        )?;
    }
    Ok(())
}

fn validate_ratio(field: &str, ratio: GearRatio) -> Result<(), ContractError> {
    let value = ratio.value();
    if !value.is_finite() || value <= 0.0 {
        return Err(ContractError::config_validation(
            field,
            format!(
                "gear ratio must be finite and > 0, got {}/{}",
                ratio.numerator, ratio.denominator
            ),
        ));
    }
    Ok(())
}

fn validate_odometry(config: &DriveConfig) -> Result<(), ContractError> {
    let odometry = &config.odometry;

    if !odometry.main_loop_period_s.is_finite() || odometry.main_loop_period_s <= 0.0 {
        return Err(ContractError::config_validation(
            "odometry.main_loop_period_s",
            format!(
                "main_loop_period_s must be > 0, got {}",
                odometry.main_loop_period_s
            ),
        ));
    }

    let main_loop_hz = 1.0 / odometry.main_loop_period_s;
    if !odometry.frequency_hz.is_finite() || odometry.frequency_hz <= main_loop_hz {
        return Err(ContractError::config_validation(
            "odometry.frequency_hz",
            format!(
                "frequency_hz ({}) must exceed the main loop frequency ({main_loop_hz})",
                odometry.frequency_hz
            ),
        ));
    }
    Ok(())
}

fn validate_drift(config: &DriveConfig) -> Result<(), ContractError> {
    let drift = &config.odometry.drift;

    if drift.interval_periods == 0 {
        return Err(ContractError::config_validation(
            "odometry.drift.interval_periods",
            "interval_periods must be > 0",
        ));
    }
    if !drift.threshold_deg.is_finite() || drift.threshold_deg <= 0.0 {
        return Err(ContractError::config_validation(
            "odometry.drift.threshold_deg",
            format!("threshold_deg must be > 0, got {}", drift.threshold_deg),
        ));
    }
    if drift.precision_decimals > MAX_PRECISION_DECIMALS {
        return Err(ContractError::config_validation(
            "odometry.drift.precision_decimals",
            format!(
                "precision_decimals must be <= {MAX_PRECISION_DECIMALS}, got {}",
                drift.precision_decimals
            ),
        ));
    }

    // a re-seed truncated to 10^-precision motor rotations must land within
    // the threshold, or the same correction repeats every interval
    let step_rotations = 10f64.powi(-(drift.precision_decimals as i32));
    for module in &config.modules {
        let step_deg = step_rotations / module.turn_gear_ratio.value() * 360.0;
        if step_deg >= drift.threshold_deg {
            return Err(ContractError::config_validation(
                "odometry.drift.precision_decimals",
                format!(
                    "{} decimals give a {step_deg:.4} deg re-seed step on module '{}', \
                     not below threshold_deg ({})",
                    drift.precision_decimals, module.name, drift.threshold_deg
                ),
            ));
        }
    }
    Ok(())
}

fn validate_gyro(config: &DriveConfig) -> Result<(), ContractError> {
    let rate = config.gyro.yaw_rate_frequency_hz;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(ContractError::config_validation(
            "gyro.yaw_rate_frequency_hz",
            format!("yaw_rate_frequency_hz must be > 0, got {rate}"),
        ));
    }
    Ok(())
}
