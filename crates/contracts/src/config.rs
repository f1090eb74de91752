//! DriveConfig - calibration and sampling configuration
//!
//! Loaded once at startup by `config_loader`, never mutated afterwards. The
//! module table is keyed by module index so the sampling core stays free of
//! per-robot literals.

use serde::{Deserialize, Serialize};

/// Number of swerve modules on the drivetrain
pub const MODULE_COUNT: usize = 4;

/// Complete drivetrain odometry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Sampling thread settings
    #[serde(default)]
    pub odometry: OdometryConfig,

    /// Heading sensor settings
    #[serde(default)]
    pub gyro: GyroConfig,

    /// Per-module calibration table
    #[serde(default = "default_modules")]
    pub modules: Vec<ModuleConfig>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            odometry: OdometryConfig::default(),
            gyro: GyroConfig::default(),
            modules: default_modules(),
        }
    }
}

impl DriveConfig {
    /// Look up a module's calibration by index
    pub fn module(&self, index: usize) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.index == index)
    }
}

/// Sampling thread configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometryConfig {
    /// Sampling frequency (Hz), must exceed the main loop frequency
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,

    /// Main control loop period (seconds)
    #[serde(default = "default_main_loop_period_s")]
    pub main_loop_period_s: f64,

    /// Turn encoder drift correction
    #[serde(default)]
    pub drift: DriftCorrectionConfig,
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency_hz(),
            main_loop_period_s: default_main_loop_period_s(),
            drift: DriftCorrectionConfig::default(),
        }
    }
}

impl OdometryConfig {
    /// Sampling period in seconds
    pub fn period_s(&self) -> f64 {
        1.0 / self.frequency_hz
    }

    /// Expected number of ticks per main loop period
    pub fn ticks_per_period(&self) -> f64 {
        self.frequency_hz * self.main_loop_period_s
    }
}

fn default_frequency_hz() -> f64 {
    250.0
}

fn default_main_loop_period_s() -> f64 {
    0.02
}

/// Relative/absolute turn encoder reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftCorrectionConfig {
    /// Check every N main loop periods
    pub interval_periods: u32,

    /// Re-seed when the discrepancy exceeds this many degrees
    pub threshold_deg: f64,

    /// Decimal places kept (truncated) when re-seeding, in motor rotations
    pub precision_decimals: u32,
}

impl Default for DriftCorrectionConfig {
    fn default() -> Self {
        Self {
            interval_periods: 50,
            threshold_deg: 0.3,
            precision_decimals: 3,
        }
    }
}

/// Heading sensor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GyroConfig {
    /// Refresh rate of the directly read yaw-rate channel (Hz)
    pub yaw_rate_frequency_hz: f64,
}

impl Default for GyroConfig {
    fn default() -> Self {
        Self {
            yaw_rate_frequency_hz: 100.0,
        }
    }
}

/// Rational gear reduction: motor rotations per mechanism rotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GearRatio {
    pub numerator: f64,
    pub denominator: f64,
}

impl GearRatio {
    pub const fn new(numerator: f64, denominator: f64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Reduction as a single factor
    #[inline]
    pub fn value(&self) -> f64 {
        self.numerator / self.denominator
    }

    /// Standard swerve drive stage: 14T pinion, 45:15 and 22T bevel
    pub const fn swerve_drive() -> Self {
        Self::new(45.0 * 22.0, 14.0 * 15.0)
    }

    /// Standard swerve steering stage
    pub const fn swerve_turn() -> Self {
        Self::new(9424.0, 203.0)
    }
}

/// Calibration for one swerve module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Module index (0 = FL, 1 = FR, 2 = BL, 3 = BR)
    pub index: usize,

    /// Human readable name, used in signal ids and metrics
    pub name: String,

    /// Absolute encoder reading (degrees) when the module points forward
    pub absolute_offset_deg: f64,

    /// Drive motor reduction
    #[serde(default = "GearRatio::swerve_drive")]
    pub drive_gear_ratio: GearRatio,

    /// Steering motor reduction
    #[serde(default = "GearRatio::swerve_turn")]
    pub turn_gear_ratio: GearRatio,
}

fn default_modules() -> Vec<ModuleConfig> {
    [
        (0, "front_left", 89.87),
        (1, "front_right", 0.71),
        (2, "back_left", 183.99),
        (3, "back_right", 268.30),
    ]
    .into_iter()
    .map(|(index, name, offset)| ModuleConfig {
        index,
        name: name.to_string(),
        absolute_offset_deg: offset,
        drive_gear_ratio: GearRatio::swerve_drive(),
        turn_gear_ratio: GearRatio::swerve_turn(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_has_four_modules() {
        let config = DriveConfig::default();
        assert_eq!(config.modules.len(), MODULE_COUNT);
        assert_eq!(config.module(2).map(|m| m.name.as_str()), Some("back_left"));
        assert!(config.module(4).is_none());
    }

    #[test]
    fn test_ticks_per_period() {
        let config = OdometryConfig {
            frequency_hz: 200.0,
            ..Default::default()
        };
        assert!((config.ticks_per_period() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_gear_ratio_value() {
        let ratio = GearRatio::swerve_drive();
        assert!((ratio.value() - 990.0 / 210.0).abs() < 1e-12);
    }

    #[test]
    fn test_serde_defaults() {
        let config: DriveConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DriveConfig::default());
    }
}
