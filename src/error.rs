//! Error type shared by the measurement pipeline.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, ObservabilityError>;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    /// Programming mistake on the caller side (no fields, empty name).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The live sink could not be reached or refused the write.
    #[error("sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("config: {0}")]
    Config(String),

    /// Ambient `current::send` called outside an observed request.
    #[error("no observability scope is active on this task")]
    OutsideScope,
}

impl ObservabilityError {
    /// True for the failures the dispatcher absorbs instead of surfacing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ObservabilityError::SinkUnavailable(_))
    }
}
