//! Input chunk cursor.
//!
//! A [`Chunk`] wraps one buffer handed to the parser. The pre-tokenizer reads
//! it through [`Chunk::lookahead`], which never fails: running off the end of
//! the buffer is reported as `None`, distinct from any real character, so the
//! caller can retain its state and resume with the next chunk.

/// Cursor over one input buffer.
#[derive(Debug, Clone)]
pub struct Chunk<'a> {
    text: &'a str,
    index: usize,
}

impl<'a> Chunk<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, index: 0 }
    }

    /// Peek at the next character without consuming it.
    ///
    /// `None` means the chunk is exhausted, not that the stream has ended.
    #[inline]
    pub fn lookahead(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// The unconsumed tail of the buffer.
    #[inline]
    pub fn remaining(&self) -> &'a str {
        &self.text[self.index..]
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.index >= self.text.len()
    }

    /// Byte offset of the cursor within this chunk.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Consume the next character.
    #[inline]
    pub fn next_char(&mut self) -> Option<char> {
        let c = self.lookahead()?;
        self.index += c.len_utf8();
        Some(c)
    }

    /// Consume `len` bytes and return them as a borrowed slice.
    ///
    /// `len` must land on a character boundary.
    #[inline]
    pub fn take(&mut self, len: usize) -> &'a str {
        let run = &self.text[self.index..self.index + len];
        self.index += len;
        run
    }
}
