//! Hardware channels exposed as sampler signal sources

use std::sync::Arc;

use contracts::{Gyro, RelativeEncoder, SignalSource};

/// Position channel of a relative encoder, in motor rotations
pub struct EncoderPosition {
    encoder: Arc<dyn RelativeEncoder>,
}

impl EncoderPosition {
    pub fn new(encoder: Arc<dyn RelativeEncoder>) -> Self {
        Self { encoder }
    }
}

impl SignalSource for EncoderPosition {
    fn sample(&self) -> Option<f64> {
        self.encoder.position().ok()
    }
}

/// Yaw channel of a heading sensor, in degrees
///
/// A reading only counts when yaw, pitch and roll all read OK; a partial
/// attitude frame means the yaw value itself cannot be trusted.
pub struct GyroYaw {
    gyro: Arc<dyn Gyro>,
}

impl GyroYaw {
    pub fn new(gyro: Arc<dyn Gyro>) -> Self {
        Self { gyro }
    }
}

impl SignalSource for GyroYaw {
    fn sample(&self) -> Option<f64> {
        let yaw = self.gyro.yaw().ok()?;
        self.gyro.pitch().ok()?;
        self.gyro.roll().ok()?;
        Some(yaw)
    }
}
