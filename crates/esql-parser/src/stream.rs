// Character stream
//
// Position-tracking cursor over the query text. Offsets are bytes, columns
// are characters. memchr does the long jumps (line ends, closing quotes,
// triple-quote terminators) so comments and strings are skipped without
// per-character bookkeeping.

use memchr::{memchr, memchr_iter, memmem, memrchr};

/// A cursor over UTF-8 query text with 1-based line/column tracking.
#[derive(Debug, Clone)]
pub struct CharStream<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> CharStream<'a> {
    #[must_use]
    pub const fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// The character `offset` characters ahead of the cursor; `None` at EOF.
    #[must_use]
    pub fn peek(&self, offset: usize) -> Option<char> {
        self.rest().chars().nth(offset)
    }

    /// Consume one character. Returns `None` (and stays put) at EOF.
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.rest().chars().next()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    /// Consume characters while `pred` holds. Returns how many bytes were
    /// consumed.
    pub fn advance_while(&mut self, mut pred: impl FnMut(char) -> bool) -> usize {
        let start = self.pos;
        while let Some(ch) = self.peek(0) {
            if !pred(ch) {
                break;
            }
            self.advance();
        }
        self.pos - start
    }

    /// Move the cursor forward to byte offset `target`, updating line and
    /// column. `target` is clamped to the end of input and rounded down to
    /// a character boundary.
    pub fn advance_to(&mut self, target: usize) {
        let mut target = target.min(self.src.len());
        while !self.src.is_char_boundary(target) {
            target -= 1;
        }
        if target <= self.pos {
            return;
        }
        let segment = &self.src[self.pos..target];
        let bytes = segment.as_bytes();
        if let Some(last_newline) = memrchr(b'\n', bytes) {
            let newlines = memchr_iter(b'\n', bytes).count();
            self.line += u32::try_from(newlines).unwrap_or(u32::MAX);
            self.col = 1 + char_count(&segment[last_newline + 1..]);
        } else {
            self.col += char_count(segment);
        }
        self.pos = target;
    }

    /// Skip to the next `\n` and consume it, or to EOF when there is none.
    pub fn skip_line(&mut self) {
        match memchr(b'\n', self.rest().as_bytes()) {
            Some(idx) => self.advance_to(self.pos + idx + 1),
            None => self.advance_to(self.src.len()),
        }
    }

    /// Byte offset (relative to the cursor) of the next `needle` byte.
    #[must_use]
    pub fn find_byte(&self, needle: u8) -> Option<usize> {
        memchr(needle, self.rest().as_bytes())
    }

    /// Byte offset (relative to the cursor) of the next occurrence of `needle`.
    #[must_use]
    pub fn find(&self, needle: &str) -> Option<usize> {
        memmem::find(self.rest().as_bytes(), needle.as_bytes())
    }

    /// Byte offset (relative to the cursor) of the end of the current line,
    /// i.e. the next `\r` or `\n`, or the remaining length at EOF.
    #[must_use]
    pub fn line_end(&self) -> usize {
        let rest = self.rest().as_bytes();
        memchr::memchr2(b'\r', b'\n', rest).unwrap_or(rest.len())
    }

    #[must_use]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub const fn col(&self) -> u32 {
        self.col
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Text between two byte offsets. Out-of-range requests yield `""`.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        self.src.get(start..end).unwrap_or_default()
    }

    /// Unconsumed input.
    #[must_use]
    pub fn rest(&self) -> &'a str {
        self.src.get(self.pos..).unwrap_or_default()
    }

    #[must_use]
    pub const fn source(&self) -> &'a str {
        self.src
    }
}

fn char_count(s: &str) -> u32 {
    u32::try_from(s.chars().count()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_and_advance_track_columns_in_chars() {
        let mut s = CharStream::new("aé\nb");
        assert_eq!(s.peek(0), Some('a'));
        assert_eq!(s.peek(1), Some('é'));
        assert_eq!(s.advance(), Some('a'));
        assert_eq!(s.advance(), Some('é'));
        assert_eq!(s.position(), 3);
        assert_eq!(s.col(), 3);
        assert_eq!(s.advance(), Some('\n'));
        assert_eq!((s.line(), s.col()), (2, 1));
        assert_eq!(s.advance(), Some('b'));
        assert_eq!(s.advance(), None);
        assert_eq!(s.advance(), None);
        assert!(s.is_eof());
    }

    #[test]
    fn test_advance_to_counts_lines() {
        let mut s = CharStream::new("ab\ncd\nefg");
        s.advance_to(8);
        assert_eq!(s.position(), 8);
        assert_eq!((s.line(), s.col()), (3, 3));
        s.advance_to(2);
        assert_eq!(s.position(), 8);
        s.advance_to(1000);
        assert!(s.is_eof());
    }

    #[test]
    fn test_advance_to_rounds_to_char_boundary() {
        let mut s = CharStream::new("é!");
        s.advance_to(1);
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn test_skip_line() {
        let mut s = CharStream::new("// note\nFROM");
        s.skip_line();
        assert_eq!(s.rest(), "FROM");
        assert_eq!(s.line(), 2);
        let mut last = CharStream::new("// trailing");
        last.skip_line();
        assert!(last.is_eof());
    }

    #[test]
    fn test_find_and_line_end() {
        let s = CharStream::new("\"\"\"abc\"\"\" x\ny");
        assert_eq!(s.find("\"\"\"abc"), Some(0));
        assert_eq!(s.find_byte(b'x'), Some(10));
        assert_eq!(s.line_end(), 11);
    }

    #[test]
    fn test_slice_out_of_range_is_empty() {
        let s = CharStream::new("FROM");
        assert_eq!(s.slice(0, 4), "FROM");
        assert_eq!(s.slice(2, 10), "");
    }
}
