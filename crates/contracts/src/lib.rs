//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the odometry pipeline.
//! Business crates depend on this crate only; it depends on none of them.
//!
//! ## Time Model
//! - All timestamps are seconds (f64) read from a single [`Clock`]
//! - The sampling thread and the adapters must share the same clock instance
//!
//! ## Units
//! - Raw encoder positions are motor rotations, raw velocities are RPM
//! - Gyro readings are degrees and degrees/second
//! - Everything leaving an adapter is radians and radians/second

mod clock;
mod config;
mod error;
mod hardware;
mod inputs;
mod rotation;
mod signal;
mod signal_id;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::*;
pub use error::*;
pub use hardware::{AbsoluteEncoder, Gyro, HardwareError, RelativeEncoder};
pub use inputs::*;
pub use rotation::Rotation2d;
pub use signal::SignalSource;
pub use signal_id::SignalId;
