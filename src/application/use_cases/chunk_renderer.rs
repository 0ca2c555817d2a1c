use crate::domain::{derive_new_chunks, ChunkCursor, ChunkReveal, FadeIn, StreamBuffer};

/// Paces the reveal of a streaming answer in two-word chunks.
///
/// While streaming, only the settled part of the buffer is chunked, so a word
/// still being streamed is never shown half-written. Once the stream ends,
/// [`flush`](Self::flush) chunks the whole answer. Chunks already revealed are
/// never revealed again; the cursor only moves forward until
/// [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct ChunkRenderer {
    cursor: ChunkCursor,
    fade: FadeIn,
}

impl ChunkRenderer {
    pub fn new(fade: FadeIn) -> Self {
        Self {
            cursor: ChunkCursor::START,
            fade,
        }
    }

    pub fn cursor(&self) -> ChunkCursor {
        self.cursor
    }

    pub fn fade(&self) -> FadeIn {
        self.fade
    }

    /// Chunks of `buffer` that became revealable since the last call.
    pub fn observe(&mut self, buffer: &StreamBuffer) -> Vec<ChunkReveal> {
        self.reveal(buffer.settled_prefix())
    }

    /// Chunks of a finished answer not revealed yet. The last word is final
    /// now, so it pairs like any other; an odd trailing word stays hidden.
    pub fn flush(&mut self, buffer: &StreamBuffer) -> Vec<ChunkReveal> {
        self.reveal(buffer.as_str())
    }

    pub fn reset(&mut self) {
        self.cursor = ChunkCursor::START;
    }

    fn reveal(&mut self, text: &str) -> Vec<ChunkReveal> {
        let first = self.cursor.get();
        let derived = derive_new_chunks(text, self.cursor);
        self.cursor = derived.cursor;

        derived
            .chunks
            .into_iter()
            .enumerate()
            .map(|(offset, text)| ChunkReveal {
                index: first + offset,
                text,
                fade: self.fade,
            })
            .collect()
    }
}

impl Default for ChunkRenderer {
    fn default() -> Self {
        Self::new(FadeIn::default())
    }
}
