//! Streaming UTF-8 decoding across chunk boundaries.

/// Decodes a sequence of byte chunks into text.
///
/// A multi-byte character split between two chunks is held back until the
/// rest of it arrives, so the concatenated output always equals decoding the
/// concatenated input. Bytes that can never form valid UTF-8 decode to
/// U+FFFD instead of failing the stream.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Leading bytes of an incomplete character from the previous chunk.
    partial: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a decoder with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.partial);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut chunks = bytes.utf8_chunks().peekable();
        while let Some(piece) = chunks.next() {
            out.push_str(piece.valid());
            let invalid = piece.invalid();
            if invalid.is_empty() {
                continue;
            }
            if chunks.peek().is_none() && is_incomplete(invalid) {
                self.partial = invalid.to_vec();
            } else {
                out.push(char::REPLACEMENT_CHARACTER);
            }
        }
        out
    }

    /// Whether bytes of an unfinished character are being held back.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.partial.is_empty()
    }

    /// Flush at end of stream.
    ///
    /// An unfinished character can no longer complete and becomes a single
    /// U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.partial.is_empty() {
            String::new()
        } else {
            self.partial.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }
}

/// Whether `bytes` is the start of a character cut off by the chunk end.
fn is_incomplete(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_err_and(|e| e.error_len().is_none())
}
