use super::{ChunkReveal, StreamId, Turn};
use crate::domain::DomainError;

/// Notifications published by a chat session to its presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Full transcript snapshot for a static re-render.
    TranscriptUpdated(Vec<Turn>),

    /// A submission was accepted and its stream is open.
    StreamStarted { stream: StreamId, prompt: Turn },

    /// Newly revealable chunks, in order. Never repeats a chunk.
    ChunksRevealed {
        stream: StreamId,
        chunks: Vec<ChunkReveal>,
    },

    /// The stream finished and `turn` holds the full answer.
    StreamCompleted { stream: StreamId, turn: Turn },

    /// The stream failed; its partial output was discarded. `prompt` is
    /// handed back so the caller can re-submit it.
    StreamFailed {
        stream: StreamId,
        prompt: Turn,
        error: DomainError,
    },

    /// The stream was cancelled by the caller.
    StreamCancelled { stream: StreamId, prompt: Turn },

    /// A submission was refused before any stream was opened.
    Rejected { prompt: String, error: DomainError },
}
