//! Per-period adapter outputs
//!
//! What the Pose Integrator receives once per main loop period: a direct
//! snapshot of each channel plus every sampled tick since the previous period.

use serde::{Deserialize, Serialize};

use crate::Rotation2d;

/// Position/velocity pair in physical units (rad, rad/s)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisSample {
    pub position: f64,
    pub velocity: f64,
}

/// One matched sampling tick of a swerve module
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleOdometrySample {
    /// Tick timestamp (seconds)
    pub timestamp: f64,

    /// Wheel rotation (rad) and wheel speed (rad/s)
    pub drive: AxisSample,

    /// Steering angle (rad) and steering rate (rad/s)
    pub turn: AxisSample,
}

/// Swerve module inputs for one main loop period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleInputs {
    /// Wheel rotation read directly this period (rad)
    pub drive_position_rad: f64,

    /// Wheel speed read directly this period (rad/s)
    pub drive_velocity_rad_per_sec: f64,

    /// Steering angle from the relative encoder
    pub turn_position: Rotation2d,

    /// Steering angle from the absolute encoder, offset applied
    pub turn_absolute_position: Rotation2d,

    /// Steering rate (rad/s)
    pub turn_velocity_rad_per_sec: f64,

    /// Absolute angle within 0.3° of straight ahead (calibration aid)
    pub turn_aligned: bool,

    /// Sampled ticks since the previous period, oldest first
    pub odometry: Vec<ModuleOdometrySample>,

    /// Queue entries without a counterpart in the other queues, discarded
    pub unmatched_samples: usize,

    /// The relative turn encoder was re-seeded this period
    pub drift_corrected: bool,
}

/// One matched sampling tick of the heading sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadingSample {
    /// Tick timestamp (seconds)
    pub timestamp: f64,

    /// Yaw (rad)
    pub yaw: f64,

    /// Yaw rate between this and the previous tick (rad/s)
    pub yaw_rate: f64,
}

/// Heading sensor inputs for one main loop period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GyroInputs {
    /// Direct yaw and yaw-rate reads succeeded
    pub connected: bool,

    /// Yaw read directly this period
    pub yaw_position: Rotation2d,

    /// Yaw rate from the rate-limited channel (rad/s)
    pub yaw_velocity_rad_per_sec: f64,

    /// Pitch (degrees), tip monitoring
    pub pitch_deg: f64,

    /// Roll (degrees), tip monitoring
    pub roll_deg: f64,

    /// Sampled ticks since the previous period, oldest first
    pub odometry: Vec<HeadingSample>,

    /// Queue entries without a counterpart, discarded
    pub unmatched_samples: usize,
}

impl ModuleInputs {
    /// Timestamp of the newest sample, if any
    pub fn latest_timestamp(&self) -> Option<f64> {
        self.odometry.last().map(|s| s.timestamp)
    }
}

impl GyroInputs {
    /// Timestamp of the newest sample, if any
    pub fn latest_timestamp(&self) -> Option<f64> {
        self.odometry.last().map(|s| s.timestamp)
    }
}
