use thiserror::Error;

/// Failures surfaced by the chat core.
///
/// Every variant is recoverable: the session always returns to idle after
/// reporting one. The type is `Clone` so it can travel inside presentation
/// events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The inference service could not be reached, timed out, or dropped the
    /// connection mid-stream.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The inference service answered with an error or a payload we could not
    /// understand.
    #[error("Model error: {0}")]
    Model(String),

    /// A submission arrived while a stream was still active.
    #[error("Busy: {0}")]
    Busy(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DomainError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_model(&self) -> bool {
        matches!(self, Self::Model(_))
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
