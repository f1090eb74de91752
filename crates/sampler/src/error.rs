//! Sampler error types

use contracts::SignalId;
use thiserror::Error;

/// Sampler construction errors
///
/// Only startup misconfiguration is an error. Failed sensor reads during a
/// tick are not.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// Sampling frequency must be finite and positive
    #[error("invalid sampling frequency: {frequency_hz} Hz")]
    InvalidFrequency {
        /// Rejected frequency
        frequency_hz: f64,
    },

    /// A signal with the same id is already registered
    #[error("signal {signal_id} is already registered")]
    DuplicateSignal {
        /// Signal id
        signal_id: SignalId,
    },

    /// Queues of one drain group come from different sampler instances
    #[error("queue {signal_id} belongs to a different odometry thread")]
    ForeignQueue {
        /// Signal id of the offending queue
        signal_id: SignalId,
    },

    /// The OS refused to spawn the sampling thread
    #[error("failed to spawn sampling thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Sampler Result type alias
pub type Result<T> = std::result::Result<T, SamplerError>;
