use crate::domain::ChunkCursor;

/// Output of [`derive_new_chunks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDerivation {
    pub chunks: Vec<String>,
    pub cursor: ChunkCursor,
}

/// Derive the two-word chunks of `buffer` that lie past `cursor`.
///
/// Words are whitespace-delimited. Only complete pairs are emitted: a
/// dangling odd word stays behind until its partner arrives. Each chunk is
/// `"<w1> <w2> "`. The returned cursor never moves backwards, so calling this
/// again with the same buffer yields nothing.
pub fn derive_new_chunks(buffer: &str, cursor: ChunkCursor) -> ChunkDerivation {
    let words: Vec<&str> = buffer.split_whitespace().collect();
    let paired = words.len() - words.len() % 2;
    let start = cursor.word_offset().min(paired);

    let chunks = words[start..paired]
        .chunks_exact(2)
        .map(|pair| format!("{} {} ", pair[0], pair[1]))
        .collect();

    ChunkDerivation {
        chunks,
        cursor: cursor.max(ChunkCursor::new(paired / 2)),
    }
}

/// The trailing word left unpaired by [`derive_new_chunks`], if any.
pub fn dangling_word(buffer: &str) -> Option<&str> {
    let words: Vec<&str> = buffer.split_whitespace().collect();
    if words.len() % 2 == 1 {
        words.last().copied()
    } else {
        None
    }
}
