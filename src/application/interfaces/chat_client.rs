use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::{ChatRequest, DomainError};

/// Lazy, ordered sequence of text fragments produced by one chat call.
///
/// The stream ends (`None`) when the answer is complete. An `Err` item ends
/// the answer early; nothing is yielded after it.
pub type FragmentStream = BoxStream<'static, Result<String, DomainError>>;

/// A streaming chat endpoint.
///
/// Implementors own transport and wire-format details. Consumers only see an
/// ordered stream of fragments.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Open a streaming chat call.
    ///
    /// Fails with [`DomainError::Transport`] when the service cannot be
    /// reached, or [`DomainError::Model`] when it refuses the request.
    async fn chat(&self, request: ChatRequest) -> Result<FragmentStream, DomainError>;

    /// Human-readable name of the backend, for logs and status lines.
    fn name(&self) -> &str;
}
