use uuid::Uuid;

use crate::domain::DomainError;

/// Identity of one `start` call. Events carrying a different id than the
/// active stream belong to a cancelled stream and are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(Uuid);

impl StreamId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short form is enough to correlate log lines.
        let full = self.0.simple().to_string();
        write!(f, "{}", &full[..8])
    }
}

/// One item of a fragment stream, tagged with the stream it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment { stream: StreamId, text: String },
    Completed { stream: StreamId },
    Failed { stream: StreamId, error: DomainError },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Fragment { .. })
    }
}
