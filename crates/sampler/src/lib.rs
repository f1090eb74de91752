//! # Odometry Sampler
//!
//! High-frequency sampling of drivetrain signals on a dedicated thread.
//!
//! Responsibilities:
//! - Register signal sources before the thread starts
//! - Capture one timestamp and one value per source per tick, atomically
//! - Hand queued samples to the main loop through drain handles
//! - Count ticks, failed reads and scheduling overruns
//!
//! ## Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use contracts::{MonotonicClock, OdometryConfig};
//! use sampler::OdometryThread;
//!
//! let clock = Arc::new(MonotonicClock::new());
//! let mut thread = OdometryThread::new(&OdometryConfig::default(), clock)?;
//! let timestamps = thread.make_timestamp_queue();
//! let drive = thread.register_signal("front_left/drive", || Some(0.0))?;
//!
//! let _running = thread.start()?;
//!
//! // once per main loop period
//! let ts = timestamps.drain();
//! let values = drive.drain();
//! # Ok::<(), sampler::SamplerError>(())
//! ```
//!
//! ## Failure model
//!
//! A source returning `None` only skips its own entry for that tick. Every
//! timestamp queue still receives the tick, so per-source queues can be shorter
//! than the timestamp queue within one period.

mod error;
mod mock;
mod queue;
mod stats;
mod thread;

pub use error::{Result, SamplerError};
pub use mock::ScriptedSignal;
pub use queue::{DrainBatch, DrainedGroup, QueueGroup, SampleQueue, TimestampQueue};
pub use stats::{MetricsSnapshot, SamplerMetrics};
pub use thread::{OdometryThread, RunningOdometryThread};
