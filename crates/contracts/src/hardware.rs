//! Hardware collaborator traits
//!
//! Vendor drivers (motor controllers with integrated encoders, duty-cycle
//! absolute encoders, IMUs) implement these traits outside the pipeline. The
//! pipeline knows nothing about bus framing or vendor status codes; any
//! failure is reported as a [`HardwareError`].
//!
//! Methods take `&self`: drivers are shared between the sampling thread (queued
//! position reads) and the main loop (direct reads, re-seeding).

use thiserror::Error;

/// Failure of a single hardware read or write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardwareError {
    /// Device did not answer in time
    #[error("device '{device}' timed out")]
    Timeout { device: String },

    /// Device answered with a non-OK status
    #[error("device '{device}' reported status: {status}")]
    Status { device: String, status: String },

    /// Device is not present on the bus
    #[error("device '{device}' is disconnected")]
    Disconnected { device: String },
}

impl HardwareError {
    pub fn timeout(device: impl Into<String>) -> Self {
        Self::Timeout {
            device: device.into(),
        }
    }

    pub fn status(device: impl Into<String>, status: impl Into<String>) -> Self {
        Self::Status {
            device: device.into(),
            status: status.into(),
        }
    }
}

/// High-resolution relative (incremental) encoder on a motor shaft.
pub trait RelativeEncoder: Send + Sync {
    /// Accumulated motor-shaft rotations.
    fn position(&self) -> Result<f64, HardwareError>;

    /// Motor-shaft velocity in rotations per minute.
    fn velocity(&self) -> Result<f64, HardwareError>;

    /// Overwrite the accumulated position, in motor-shaft rotations.
    fn set_position(&self, rotations: f64) -> Result<(), HardwareError>;
}

/// Low-resolution absolute encoder on the steering output.
pub trait AbsoluteEncoder: Send + Sync {
    /// Mechanism angle in rotations, `[0, 1)`.
    fn position(&self) -> Result<f64, HardwareError>;
}

/// Heading sensor.
pub trait Gyro: Send + Sync {
    /// Accumulated yaw in degrees (counter-clockwise positive, non-wrapping).
    fn yaw(&self) -> Result<f64, HardwareError>;

    /// Yaw rate in degrees per second.
    fn yaw_rate(&self) -> Result<f64, HardwareError>;

    /// Pitch in degrees.
    fn pitch(&self) -> Result<f64, HardwareError>;

    /// Roll in degrees.
    fn roll(&self) -> Result<f64, HardwareError>;
}
