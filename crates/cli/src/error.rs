//! Error types for CLI operations.

use drivetrain::DrivetrainError;
use sampler::SamplerError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid command-line value
    #[error("Invalid argument --{name}: {message}")]
    InvalidArgument { name: &'static str, message: String },

    /// Drivetrain construction failed
    #[error("Failed to build drivetrain: {0}")]
    Drivetrain(#[from] DrivetrainError),

    /// Sampler creation or start failed
    #[error("Sampler error: {0}")]
    Sampler(#[from] SamplerError),

    /// The sampling thread exited while the loop was running
    #[error("Sampling thread stopped unexpectedly")]
    SamplerStopped,
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_argument(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
