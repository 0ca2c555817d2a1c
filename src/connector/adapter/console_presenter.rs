use std::io::Write;
use std::sync::Mutex;

use tracing::warn;

use crate::application::Presenter;
use crate::domain::SessionEvent;

struct ConsoleState<W> {
    out: W,
    revealed_words: usize,
}

/// Prints revealed chunks as they arrive and the unrevealed tail of the
/// answer once the stream completes. Used by the one-shot `ask` command.
pub struct ConsolePresenter<W: Write + Send> {
    state: Mutex<ConsoleState<W>>,
}

impl ConsolePresenter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            state: Mutex::new(ConsoleState {
                out,
                revealed_words: 0,
            }),
        }
    }

    pub fn into_inner(self) -> W {
        match self.state.into_inner() {
            Ok(state) => state.out,
            Err(poisoned) => poisoned.into_inner().out,
        }
    }

    fn write(state: &mut ConsoleState<W>, event: SessionEvent) -> std::io::Result<()> {
        match event {
            SessionEvent::StreamStarted { .. } => {
                state.revealed_words = 0;
            }
            SessionEvent::ChunksRevealed { chunks, .. } => {
                for chunk in &chunks {
                    state.out.write_all(chunk.text.as_bytes())?;
                }
                state.revealed_words += chunks.len() * 2;
                state.out.flush()?;
            }
            SessionEvent::StreamCompleted { turn, .. } => {
                let tail: Vec<&str> = turn
                    .content()
                    .split_whitespace()
                    .skip(state.revealed_words)
                    .collect();
                writeln!(state.out, "{}", tail.join(" "))?;
                state.out.flush()?;
                state.revealed_words = 0;
            }
            SessionEvent::StreamFailed { .. } | SessionEvent::StreamCancelled { .. } => {
                if state.revealed_words > 0 {
                    writeln!(state.out)?;
                }
                state.revealed_words = 0;
            }
            SessionEvent::TranscriptUpdated(_) | SessionEvent::Rejected { .. } => {}
        }
        Ok(())
    }
}

impl<W: Write + Send> Presenter for ConsolePresenter<W> {
    fn present(&self, event: SessionEvent) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = Self::write(&mut state, event) {
            warn!("Failed to write to console: {}", e);
        }
    }
}
