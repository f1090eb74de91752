//! # Drivetrain
//!
//! Swerve module and heading adapters on top of the odometry sampler.
//!
//! Each adapter registers its high-rate channels with an [`OdometryThread`]
//! at construction time and, once per main loop period, turns the drained
//! queues plus a handful of direct reads into [`contracts::ModuleInputs`] or
//! [`contracts::GyroInputs`].
//!
//! [`OdometryThread`]: sampler::OdometryThread

mod drift;
mod drivetrain;
mod error;
mod heading;
mod module;
mod signals;
pub mod sim;
pub mod units;

pub use drift::DriftCorrector;
pub use drivetrain::{Drivetrain, DrivetrainInputs, HardwareProvider};
pub use error::{DrivetrainError, Result};
pub use heading::{HeadingAdapter, YAW_SIGNAL};
pub use module::{ModuleAdapter, ModuleHardware};
pub use signals::{EncoderPosition, GyroYaw};
