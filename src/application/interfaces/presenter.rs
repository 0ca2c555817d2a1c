use crate::domain::SessionEvent;

/// Receives everything a chat session wants to show.
///
/// Called from the session's task; implementations must not block.
pub trait Presenter: Send + Sync {
    fn present(&self, event: SessionEvent);
}
