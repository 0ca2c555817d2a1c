use serde::Serialize;

use super::Turn;

/// Body of a streaming chat call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Turn>,
    pub stream: bool,
}

impl ChatRequest {
    /// A streaming request carrying only `turn` as context.
    pub fn streaming(model: impl Into<String>, turn: Turn) -> Self {
        Self {
            model: model.into(),
            messages: vec![turn],
            stream: true,
        }
    }

    /// Content of the last message, normally the user's prompt.
    pub fn prompt(&self) -> &str {
        self.messages.last().map(|t| t.content()).unwrap_or_default()
    }
}
