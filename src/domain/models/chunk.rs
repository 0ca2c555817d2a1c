use std::time::Duration;

/// Number of two-word chunks already handed to the presentation layer for
/// the current stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkCursor(usize);

impl ChunkCursor {
    pub const START: ChunkCursor = ChunkCursor(0);

    pub fn new(chunks: usize) -> Self {
        Self(chunks)
    }

    pub fn get(&self) -> usize {
        self.0
    }

    /// Index of the first word not yet covered by a rendered chunk.
    pub fn word_offset(&self) -> usize {
        self.0 * 2
    }
}

impl std::fmt::Display for ChunkCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Presentation directive attached to each revealed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeIn {
    duration: Duration,
}

impl FadeIn {
    pub const DEFAULT_MILLIS: u64 = 750;

    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Opacity in `[0.0, 1.0]` after `elapsed` since the reveal.
    pub fn progress(&self, elapsed: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}

impl Default for FadeIn {
    fn default() -> Self {
        Self::from_millis(Self::DEFAULT_MILLIS)
    }
}

/// A chunk scheduled for animated reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReveal {
    /// Position of the chunk within its stream, starting at 0.
    pub index: usize,
    pub text: String,
    pub fade: FadeIn,
}
