//! Drivetrain error types

use sampler::SamplerError;
use thiserror::Error;

/// Construction-time drivetrain errors
///
/// Runtime sensor trouble never surfaces here; it shows up as fewer samples.
#[derive(Debug, Error)]
pub enum DrivetrainError {
    /// No calibration entry for the requested module
    #[error("invalid module index {index}")]
    InvalidModuleIndex {
        /// Requested index
        index: usize,
    },

    /// Hardware provider has nothing for the requested slot
    #[error("no hardware for {slot}")]
    MissingHardware {
        /// Slot name, e.g. `module 2` or `gyro`
        slot: String,
    },

    /// Unusable configuration value
    #[error("invalid config at '{field}': {message}")]
    InvalidConfig {
        /// Offending field
        field: String,
        /// Reason
        message: String,
    },

    /// Signal registration failed
    #[error(transparent)]
    Sampler(#[from] SamplerError),
}

impl DrivetrainError {
    pub fn missing_hardware(slot: impl Into<String>) -> Self {
        Self::MissingHardware { slot: slot.into() }
    }

    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Drivetrain Result type alias
pub type Result<T> = std::result::Result<T, DrivetrainError>;
