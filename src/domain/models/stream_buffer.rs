/// Accumulated text of the stream currently in flight.
///
/// Fragments are appended verbatim; nothing else mutates the contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamBuffer {
    text: String,
    fragments: usize,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Text up to and including the last whitespace character.
    ///
    /// A trailing word without a separator may still grow with the next
    /// fragment ("qu" + "ick"), so it is excluded here.
    pub fn settled_prefix(&self) -> &str {
        match self
            .text
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
        {
            Some((idx, c)) => &self.text[..idx + c.len_utf8()],
            None => "",
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Number of fragments applied since the buffer was created.
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}
