//! SIMD-accelerated XML scanning using memchr
//!
//! Uses memchr crate for fast byte searching with SIMD acceleration:
//! - SSE2 (default x86_64)
//! - AVX2 (runtime detection)
//! - NEON (aarch64)
//!
//! Also home to [`TextPosition`], the line/column bookkeeping the push
//! parser carries across chunks.

use super::encoding::Encoding;
use memchr::{memchr, memchr3, memchr_iter, memmem, memrchr};

/// Scanner for XML delimiter detection
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given input
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    /// Get the current position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Set the current position
    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Total input length
    #[inline]
    pub fn len(&self) -> usize {
        self.input.len()
    }

    /// Check if we've reached the end
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Get remaining bytes
    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos.min(self.input.len())..]
    }

    /// Get a slice from start to end positions
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.input[start..end]
    }

    /// Peek at current byte without advancing
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Peek at byte at offset from current position
    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Advance by n bytes
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    /// Skip whitespace characters (space, tab, newline, carriage return)
    #[inline]
    pub fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && is_whitespace(self.input[self.pos]) {
            self.pos += 1;
        }
    }

    /// Find next '<' (tag start) using SIMD
    #[inline]
    pub fn find_tag_start(&self) -> Option<usize> {
        memchr(b'<', self.remaining()).map(|i| self.pos + i)
    }

    /// Find the '>' that ends a tag, skipping quoted attribute values
    ///
    /// Starts at the current position with `quote` open (`None` outside a
    /// value). When the input ends first, returns the quote still open so a
    /// later search can carry on from the end.
    pub fn find_tag_end_quoted(&self, mut quote: Option<u8>) -> Result<usize, Option<u8>> {
        let mut pos = self.pos;

        while pos < self.input.len() {
            let rest = &self.input[pos..];
            match quote {
                Some(q) => match memchr(q, rest) {
                    Some(i) => {
                        pos += i + 1;
                        quote = None;
                    }
                    None => return Err(quote),
                },
                None => match memchr3(b'>', b'"', b'\'', rest) {
                    Some(i) if rest[i] == b'>' => return Ok(pos + i),
                    Some(i) => {
                        quote = Some(rest[i]);
                        pos += i + 1;
                    }
                    None => return Err(None),
                },
            }
        }
        Err(quote)
    }

    /// Find the next occurrence of a byte sequence, returning its start
    #[inline]
    pub fn find_sequence(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(self.remaining(), needle).map(|i| self.pos + i)
    }

    /// Check if input starts with a byte sequence at current position
    #[inline]
    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.remaining().starts_with(needle)
    }

    /// True when the input runs out part way through `needle`
    #[inline]
    pub fn is_truncated(&self, needle: &[u8]) -> bool {
        let rest = self.remaining();
        rest.len() < needle.len() && needle.starts_with(rest)
    }

    /// Read an XML name (starts with letter/underscore/colon, continues with name chars)
    pub fn read_name(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;

        if start >= self.input.len() || !is_name_start_char(self.input[start]) {
            return None;
        }

        self.pos += 1;
        while self.pos < self.input.len() && is_name_char(self.input[self.pos]) {
            self.pos += 1;
        }

        Some(&self.input[start..self.pos])
    }
}

/// Line and column of a byte in the document
///
/// Lines are 1-based and counted on `\n`; columns are 0-based byte offsets
/// from the last line break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPosition {
    pub line: u64,
    pub column: u64,
}

impl TextPosition {
    /// Position of the first byte of a document
    pub fn start() -> Self {
        TextPosition { line: 1, column: 0 }
    }

    /// Move past `bytes`
    pub fn advance(&mut self, bytes: &[u8]) {
        self.advance_in(bytes, Encoding::Utf8);
    }

    /// Move past `bytes` transcoded from `encoding`
    ///
    /// Columns count bytes of the original input, not of the UTF-8 it was
    /// transcoded to.
    pub fn advance_in(&mut self, bytes: &[u8], encoding: Encoding) {
        match memrchr(b'\n', bytes) {
            Some(last) => {
                self.line += memchr_iter(b'\n', bytes).count() as u64;
                self.column = encoding.input_len(&bytes[last + 1..]) as u64;
            }
            None => self.column += encoding.input_len(bytes) as u64,
        }
    }
}

impl Default for TextPosition {
    fn default() -> Self {
        Self::start()
    }
}

/// Check if byte is valid XML name start character
/// Allows ASCII letters, underscore, colon, and non-ASCII (UTF-8 Unicode)
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

/// Check if byte is valid XML name character
/// Allows ASCII alphanumeric, punctuation, and non-ASCII (UTF-8 Unicode)
#[inline]
pub fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

/// XML whitespace: space, tab, newline, carriage return
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tag_start() {
        let scanner = Scanner::new(b"hello <world>");
        assert_eq!(scanner.find_tag_start(), Some(6));
    }

    #[test]
    fn test_find_tag_end_quoted() {
        let scanner = Scanner::new(b"<a attr=\">test\" b='\"'>content");
        assert_eq!(scanner.find_tag_end_quoted(None), Ok(21));
    }

    #[test]
    fn test_find_tag_end_unterminated_quote() {
        let scanner = Scanner::new(b"<a attr=\"> still open");
        assert_eq!(scanner.find_tag_end_quoted(None), Err(Some(b'"')));

        let scanner = Scanner::new(b"<a attr='x' ");
        assert_eq!(scanner.find_tag_end_quoted(None), Err(None));
    }

    #[test]
    fn test_find_tag_end_resumes_inside_quote() {
        // continuation of a value whose opening quote was already seen
        let scanner = Scanner::new(b"> still value\" x='>'>");
        assert_eq!(scanner.find_tag_end_quoted(Some(b'"')), Ok(20));
    }

    #[test]
    fn test_read_name() {
        let mut scanner = Scanner::new(b"element-name>");
        assert_eq!(scanner.read_name(), Some(b"element-name" as &[u8]));
        assert_eq!(scanner.position(), 12);
    }

    #[test]
    fn test_read_name_rejects_digit_start() {
        let mut scanner = Scanner::new(b"1abc");
        assert_eq!(scanner.read_name(), None);
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn test_is_truncated() {
        let mut scanner = Scanner::new(b"<![CD");
        assert!(scanner.is_truncated(b"<![CDATA["));
        assert!(!scanner.is_truncated(b"<!--"));
        scanner.set_position(5);
        assert!(scanner.is_truncated(b"<!--"));
    }

    #[test]
    fn test_skip_whitespace() {
        let mut scanner = Scanner::new(b"  \t\n hello");
        scanner.skip_whitespace();
        assert_eq!(scanner.position(), 5);
    }

    #[test]
    fn test_text_position() {
        let mut pos = TextPosition::start();
        pos.advance(b"<a>");
        assert_eq!(pos, TextPosition { line: 1, column: 3 });
        pos.advance(b"\n  <b>\n<c");
        assert_eq!(pos, TextPosition { line: 3, column: 2 });
        pos.advance(b"");
        assert_eq!(pos, TextPosition { line: 3, column: 2 });
    }

    #[test]
    fn test_text_position_counts_input_bytes() {
        let mut pos = TextPosition::start();
        // "\u{e9}t\u{e9}" came in as three ISO-8859-1 bytes
        pos.advance_in("\u{e9}t\u{e9}".as_bytes(), Encoding::Latin1);
        assert_eq!(pos, TextPosition { line: 1, column: 3 });
        pos.advance_in("\n\u{e9}".as_bytes(), Encoding::Latin1);
        assert_eq!(pos, TextPosition { line: 2, column: 1 });
    }
}
