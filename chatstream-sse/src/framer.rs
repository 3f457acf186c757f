//! Newline framing of decoded text.

/// Splits a stream of text fragments into complete lines.
///
/// Text after the last `\n` stays buffered until a later fragment
/// terminates it. Once the iterator returned by [`LineFramer::feed`] is
/// exhausted the buffer holds no `\n`.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: String,
}

impl LineFramer {
    /// Create a framer with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` and iterate over the lines it completes.
    ///
    /// The iterator is lazy: lines it does not reach stay buffered and come
    /// out of the next call.
    pub fn feed(&mut self, text: &str) -> Lines<'_> {
        self.push(text);
        Lines { framer: self }
    }

    /// Append `text` without reading any lines.
    pub fn push(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    /// Take the next complete line out of the buffer.
    ///
    /// The terminating `\n` and at most one `\r` before it are stripped.
    pub fn next_line(&mut self) -> Option<String> {
        let newline_pos = self.buf.find('\n')?;
        let mut line: String = self.buf.drain(..=newline_pos).collect();
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    /// Text waiting for its terminating newline.
    #[must_use]
    pub fn buffered(&self) -> &str {
        &self.buf
    }

    /// End of stream: discard whatever never received a newline.
    ///
    /// Returns the discarded text, or `None` if the buffer was empty.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

/// Lazy iterator over the lines completed by one [`LineFramer::feed`].
#[derive(Debug)]
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.framer.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_complete_lines_and_keeps_remainder() {
        let mut framer = LineFramer::new();
        let lines: Vec<String> = framer.feed("one\ntwo\nthr").collect();
        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(framer.buffered(), "thr");

        let lines: Vec<String> = framer.feed("ee\n").collect();
        assert_eq!(lines, vec!["three"]);
        assert_eq!(framer.buffered(), "");
    }

    #[test]
    fn strips_one_carriage_return() {
        let mut framer = LineFramer::new();
        let lines: Vec<String> = framer.feed("a\r\nb\r\r\n").collect();
        assert_eq!(lines, vec!["a", "b\r"]);
    }

    #[test]
    fn crlf_split_between_fragments() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed("data: x\r").count(), 0);
        let lines: Vec<String> = framer.feed("\n").collect();
        assert_eq!(lines, vec!["data: x"]);
    }

    #[test]
    fn blank_lines_are_yielded() {
        let mut framer = LineFramer::new();
        let lines: Vec<String> = framer.feed("a\n\n\nb\n").collect();
        assert_eq!(lines, vec!["a", "", "", "b"]);
    }

    #[test]
    fn unread_lines_survive_to_next_feed() {
        let mut framer = LineFramer::new();
        let mut lines = framer.feed("first\nsecond\n");
        assert_eq!(lines.next().as_deref(), Some("first"));
        drop(lines);

        let rest: Vec<String> = framer.feed("third\n").collect();
        assert_eq!(rest, vec!["second", "third"]);
    }

    #[test]
    fn finish_discards_unterminated_text() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed("data: {\"partial\"").count(), 0);
        assert_eq!(framer.finish().as_deref(), Some("data: {\"partial\""));
        assert_eq!(framer.finish(), None);
        assert_eq!(framer.buffered(), "");
    }
}
