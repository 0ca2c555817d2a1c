use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use crate::connector::SessionCommand;
use crate::domain::{ChunkReveal, DomainError, FadeIn, SessionEvent, StreamId, Turn};

/// A revealed chunk and the moment it appeared.
#[derive(Debug, Clone)]
pub struct RevealedChunk {
    pub text: String,
    pub fade: FadeIn,
    pub at: Instant,
}

impl RevealedChunk {
    /// Fade progress in `[0.0, 1.0]` at `now`.
    pub fn opacity(&self, now: Instant) -> f32 {
        self.fade.progress(now.saturating_duration_since(self.at))
    }
}

/// The answer currently streaming in.
#[derive(Debug, Clone)]
pub struct StreamView {
    pub stream: StreamId,
    pub prompt: Turn,
    pub chunks: Vec<RevealedChunk>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// State of the terminal front end. Mirrors what the session publishes; it
/// never mutates the conversation itself.
pub struct App {
    pub model: String,
    pub backend: String,
    pub transcript: Vec<Turn>,
    pub streaming: Option<StreamView>,
    pub input: String,
    pub notice: Option<Notice>,
    /// Lines scrolled back from the bottom of the transcript.
    pub scroll_back: u16,
    pub should_quit: bool,
}

impl App {
    pub fn new(model: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            backend: backend.into(),
            transcript: Vec::new(),
            streaming: None,
            input: String::new(),
            notice: None,
            scroll_back: 0,
            should_quit: false,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Whether any revealed chunk is still fading in.
    pub fn is_animating(&self, now: Instant) -> bool {
        self.streaming
            .as_ref()
            .map(|view| view.chunks.iter().any(|c| c.opacity(now) < 1.0))
            .unwrap_or(false)
    }

    /// Translate a key press into an optional session command.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<SessionCommand> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
                self.should_quit = true;
                None
            }
            KeyCode::Esc => {
                if self.is_streaming() {
                    Some(SessionCommand::Cancel)
                } else {
                    self.notice = None;
                    None
                }
            }
            KeyCode::Enter => {
                let text = std::mem::take(&mut self.input);
                if text.trim().is_empty() {
                    return None;
                }
                self.notice = None;
                self.scroll_back = 0;
                Some(SessionCommand::Submit(text))
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::PageUp => {
                self.scroll_back = self.scroll_back.saturating_add(5);
                None
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(5);
                None
            }
            KeyCode::Char(c) if !ctrl => {
                self.input.push(c);
                None
            }
            _ => None,
        }
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) {
        self.handle_session_event_at(event, Instant::now());
    }

    pub fn handle_session_event_at(&mut self, event: SessionEvent, now: Instant) {
        match event {
            SessionEvent::TranscriptUpdated(turns) => {
                self.transcript = turns;
            }
            SessionEvent::StreamStarted { stream, prompt } => {
                self.streaming = Some(StreamView {
                    stream,
                    prompt,
                    chunks: Vec::new(),
                });
            }
            SessionEvent::ChunksRevealed { stream, chunks } => {
                if let Some(view) = self.streaming.as_mut().filter(|v| v.stream == stream) {
                    append_chunks(view, chunks, now);
                }
            }
            SessionEvent::StreamCompleted { stream, .. } => {
                self.end_stream(stream);
            }
            SessionEvent::StreamFailed {
                stream,
                prompt,
                error,
            } => {
                self.end_stream(stream);
                self.restore_prompt(prompt.content());
                self.notice = Some(error_notice(&error));
            }
            SessionEvent::StreamCancelled { stream, prompt } => {
                self.end_stream(stream);
                self.restore_prompt(prompt.content());
                self.notice = Some(Notice {
                    level: NoticeLevel::Info,
                    text: "Response cancelled.".to_string(),
                });
            }
            SessionEvent::Rejected { prompt, error } => {
                self.restore_prompt(&prompt);
                self.notice = Some(error_notice(&error));
            }
        }
    }

    fn end_stream(&mut self, stream: StreamId) {
        if self.streaming.as_ref().map(|v| v.stream) == Some(stream) {
            self.streaming = None;
        }
    }

    /// Put a returned prompt back in the input line unless the user already
    /// started typing something else.
    fn restore_prompt(&mut self, prompt: &str) {
        if self.input.is_empty() {
            self.input = prompt.to_string();
        }
    }
}

fn append_chunks(view: &mut StreamView, chunks: Vec<ChunkReveal>, now: Instant) {
    for chunk in chunks {
        if chunk.index != view.chunks.len() {
            debug!(
                "Skipping out-of-order chunk {} (have {})",
                chunk.index,
                view.chunks.len()
            );
            continue;
        }
        view.chunks.push(RevealedChunk {
            text: chunk.text,
            fade: chunk.fade,
            at: now,
        });
    }
}

fn error_notice(error: &DomainError) -> Notice {
    let text = match error {
        DomainError::Busy(_) => {
            "Still answering the previous question. Press Esc to cancel it first.".to_string()
        }
        DomainError::Transport(msg) => format!("Cannot reach the model server: {msg}"),
        DomainError::Model(msg) => format!("The model returned an error: {msg}"),
        other => other.to_string(),
    };
    Notice {
        level: NoticeLevel::Error,
        text,
    }
}
