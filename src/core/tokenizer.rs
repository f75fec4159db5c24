//! XML Tokenizer - incremental token extraction over a growing buffer
//!
//! Extracts XML tokens from whatever prefix of the document is buffered:
//! - Element start/end tags (attributes parsed and decoded)
//! - Text content (entity references decoded)
//! - CDATA sections
//! - Comments
//! - Processing instructions and the XML declaration
//! - DOCTYPE declarations (skipped as a whole, internal subset included)
//!
//! A construct that is cut off by the end of the buffer is left untouched:
//! [`Tokenizer::next_token`] returns `Ok(None)` and [`Tokenizer::position`]
//! marks the first byte that must be kept for the next chunk. Once the
//! final chunk has been buffered the same situation is an error.
//!
//! How far the cut-off construct was searched is reported as a [`Resume`].
//! Handing it back for the next, longer buffer lets the search continue
//! where it stopped, so a long token costs time proportional to its length
//! however many chunks it spans.

use super::attributes::{parse_attributes, Attribute};
use super::entities::{check_chars, decode_text, utf8};
use super::scanner::{is_whitespace, Scanner};
use crate::error::ErrorKind;
use memchr::memmem;
use std::borrow::Cow;
use std::fmt;

const COMMENT_OPEN: &[u8] = b"<!--";
const CDATA_OPEN: &[u8] = b"<![CDATA[";
const DOCTYPE_OPEN: &[u8] = b"<!DOCTYPE";

/// Type of XML token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: <element>
    StartTag,
    /// Element end tag: </element>
    EndTag,
    /// Empty element: <element/>
    EmptyTag,
    /// Text content
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?target ...?>
    ProcessingInstruction,
    /// XML declaration: <?xml ...?>
    XmlDeclaration,
    /// DOCTYPE declaration
    DocType,
}

/// A parsed XML token
#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in input (start, end)
    pub span: (usize, usize),
    /// For tags and PIs: the name or target
    pub name: Option<&'a str>,
    /// For text/cdata/comments: the content (owned if entities were decoded)
    pub content: Option<Cow<'a, str>>,
    /// For start and empty tags: attributes in document order
    pub attributes: Vec<Attribute<'a>>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
            attributes: Vec::new(),
        }
    }

    fn with_name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    fn with_content(mut self, content: Cow<'a, str>) -> Self {
        self.content = Some(content);
        self
    }

    fn with_attributes(mut self, attributes: Vec<Attribute<'a>>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Error raised by the tokenizer, positioned at a byte of its input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenError {
    pub kind: ErrorKind,
    pub position: usize,
}

impl TokenError {
    pub fn new(kind: ErrorKind, position: usize) -> Self {
        TokenError { kind, position }
    }

    /// Shift the position by `base` (for errors raised on a sub-slice)
    pub fn offset(self, base: usize) -> Self {
        TokenError {
            kind: self.kind,
            position: self.position + base,
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.kind, self.position)
    }
}

type TokenResult<'a> = Result<Option<Token<'a>>, TokenError>;

/// Search progress on a construct that ran out of input
///
/// Offsets are relative to the first byte of the construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resume {
    /// Bytes already searched for the terminator without finding it
    pub scanned: usize,
    /// Quote open at `scanned`
    pub quote: Option<u8>,
    /// Internal subset nesting at `scanned` (DOCTYPE only)
    pub depth: usize,
}

/// Incremental XML tokenizer over the currently buffered input
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    /// No more input will follow this buffer
    is_final: bool,
    /// Progress carried in for the construct at offset 0
    resume: Resume,
    /// Progress on the construct that stopped the last `next_token`
    stalled: Resume,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer over `input`; `is_final` says whether more input can follow
    pub fn new(input: &'a [u8], is_final: bool) -> Self {
        Self::with_resume(input, is_final, Resume::default())
    }

    /// Like [`new`](Self::new), continuing the search on the construct at
    /// offset 0 from an earlier [`stalled`](Self::stalled)
    ///
    /// `input` must start with the same bytes the earlier tokenizer saw
    /// from its [`position`](Self::position) on.
    pub fn with_resume(input: &'a [u8], is_final: bool, resume: Resume) -> Self {
        Tokenizer {
            scanner: Scanner::new(input),
            is_final,
            resume,
            stalled: Resume::default(),
        }
    }

    /// First byte not yet turned into a token
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Progress on the construct at [`position`](Self::position) after
    /// `next_token` returned `Ok(None)`
    pub fn stalled(&self) -> Resume {
        self.stalled
    }

    /// Get the next complete token
    ///
    /// `Ok(None)` means the buffer is exhausted (or ends part way through a
    /// construct and more input may follow).
    pub fn next_token(&mut self) -> TokenResult<'a> {
        self.stalled = Resume::default();
        match self.scanner.peek() {
            None => Ok(None),
            Some(b'<') => self.parse_markup(),
            Some(_) => self.parse_text(),
        }
    }

    /// Parse markup starting with '<'
    fn parse_markup(&mut self) -> TokenResult<'a> {
        let start = self.scanner.position();

        match self.scanner.peek_at(1) {
            None => self.incomplete(start, ErrorKind::UnclosedToken),
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start),
            Some(_) => self.parse_start_tag(start),
        }
    }

    /// Parse a start tag or empty element tag
    fn parse_start_tag(&mut self, start: usize) -> TokenResult<'a> {
        self.scanner.set_position(start + 1);
        let name = match self.read_name()? {
            Some(name) => name,
            None => return self.incomplete(start, ErrorKind::UnclosedToken),
        };
        let name_end = self.scanner.position();

        match self.scanner.peek() {
            Some(b) if is_whitespace(b) || b == b'>' || b == b'/' => {}
            _ => return Err(TokenError::new(ErrorKind::InvalidToken, name_end)),
        }

        // Find the end of the tag, handling quoted attributes
        let carried = self.carried(start);
        self.scanner.set_position(name_end.max(start + carried.scanned));
        let end = match self.scanner.find_tag_end_quoted(carried.quote) {
            Ok(end) => end,
            Err(quote) => {
                self.stalled = Resume {
                    scanned: self.scanner.len() - start,
                    quote,
                    depth: 0,
                };
                return self.incomplete(start, ErrorKind::UnclosedToken);
            }
        };

        let is_empty = end > name_end && self.scanner.slice(end - 1, end) == b"/";
        let attr_end = if is_empty { end - 1 } else { end };
        let attributes = parse_attributes(self.scanner.slice(name_end, attr_end))
            .map_err(|e| e.offset(name_end))?;

        self.scanner.set_position(end + 1);

        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        Ok(Some(
            Token::new(kind, (start, end + 1))
                .with_name(name)
                .with_attributes(attributes),
        ))
    }

    /// Parse an end tag
    fn parse_end_tag(&mut self, start: usize) -> TokenResult<'a> {
        self.scanner.set_position(start + 2);
        let name = match self.read_name()? {
            Some(name) => name,
            None => return self.incomplete(start, ErrorKind::UnclosedToken),
        };

        // Only whitespace may follow the name
        self.scanner.skip_whitespace();
        match self.scanner.peek() {
            Some(b'>') => {}
            Some(_) => return Err(TokenError::new(ErrorKind::InvalidToken, self.scanner.position())),
            None => return self.incomplete(start, ErrorKind::UnclosedToken),
        }

        self.scanner.advance(1);
        Ok(Some(
            Token::new(TokenKind::EndTag, (start, self.scanner.position())).with_name(name),
        ))
    }

    /// Parse markup starting with '<!' (comment, CDATA, DOCTYPE)
    fn parse_bang_markup(&mut self, start: usize) -> TokenResult<'a> {
        self.scanner.set_position(start);

        if self.scanner.starts_with(COMMENT_OPEN) {
            self.parse_comment(start)
        } else if self.scanner.starts_with(CDATA_OPEN) {
            self.parse_cdata(start)
        } else if self.scanner.starts_with(DOCTYPE_OPEN) {
            self.parse_doctype(start)
        } else if [COMMENT_OPEN, CDATA_OPEN, DOCTYPE_OPEN]
            .iter()
            .any(|open| self.scanner.is_truncated(open))
        {
            self.incomplete(start, ErrorKind::UnclosedToken)
        } else {
            Err(TokenError::new(ErrorKind::InvalidToken, start + 2))
        }
    }

    /// Parse a comment <!--...-->
    fn parse_comment(&mut self, start: usize) -> TokenResult<'a> {
        let content_start = start + COMMENT_OPEN.len();

        // The first "--" must be the one that closes the comment
        let dashes = match self.search(start, content_start, b"--") {
            Some(pos) => pos,
            None => return self.incomplete(start, ErrorKind::UnclosedToken),
        };
        self.scanner.set_position(dashes + 2);
        match self.scanner.peek() {
            Some(b'>') => {}
            Some(_) => return Err(TokenError::new(ErrorKind::InvalidToken, dashes)),
            None => {
                self.stalled.scanned = dashes - start;
                return self.incomplete(start, ErrorKind::UnclosedToken);
            }
        }

        let content = self.checked_str(content_start, dashes)?;
        self.scanner.advance(1);
        Ok(Some(
            Token::new(TokenKind::Comment, (start, self.scanner.position()))
                .with_content(Cow::Borrowed(content)),
        ))
    }

    /// Parse a CDATA section <![CDATA[...]]>
    fn parse_cdata(&mut self, start: usize) -> TokenResult<'a> {
        let content_start = start + CDATA_OPEN.len();

        let close = match self.search(start, content_start, b"]]>") {
            Some(pos) => pos,
            None => return self.incomplete(start, ErrorKind::UnclosedCdataSection),
        };

        let content = self.checked_str(content_start, close)?;
        self.scanner.set_position(close + 3);
        Ok(Some(
            Token::new(TokenKind::CData, (start, self.scanner.position()))
                .with_content(Cow::Borrowed(content)),
        ))
    }

    /// Skip a DOCTYPE declaration, internal subset included
    fn parse_doctype(&mut self, start: usize) -> TokenResult<'a> {
        self.scanner.set_position(start + DOCTYPE_OPEN.len());
        match self.scanner.peek() {
            Some(b) if is_whitespace(b) => {}
            Some(_) => return Err(TokenError::new(ErrorKind::InvalidToken, self.scanner.position())),
            None => return self.incomplete(start, ErrorKind::UnclosedToken),
        }

        let carried = self.carried(start);
        let mut quote = carried.quote;
        let mut subset_depth = carried.depth;
        if start + carried.scanned > self.scanner.position() {
            self.scanner.set_position(start + carried.scanned);
        }
        loop {
            let b = match self.scanner.peek() {
                Some(b) => b,
                None => {
                    self.stalled = Resume {
                        scanned: self.scanner.position() - start,
                        quote,
                        depth: subset_depth,
                    };
                    return self.incomplete(start, ErrorKind::UnclosedToken);
                }
            };
            self.scanner.advance(1);

            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => subset_depth += 1,
                (None, b']') => subset_depth = subset_depth.saturating_sub(1),
                (None, b'>') if subset_depth == 0 => break,
                _ => {}
            }
        }

        let end = self.scanner.position();
        let body = self.checked_str(start + 2, end - 1)?;
        Ok(Some(
            Token::new(TokenKind::DocType, (start, end)).with_content(Cow::Borrowed(body)),
        ))
    }

    /// Parse a processing instruction or the XML declaration
    fn parse_pi(&mut self, start: usize) -> TokenResult<'a> {
        self.scanner.set_position(start + 2);
        let target = match self.read_name()? {
            Some(target) => target,
            None => return self.incomplete(start, ErrorKind::UnclosedToken),
        };
        let target_end = self.scanner.position();

        // Target must be followed by whitespace or the closing "?>"
        match self.scanner.peek() {
            Some(b) if is_whitespace(b) => {}
            Some(b'?') => {}
            _ => return Err(TokenError::new(ErrorKind::InvalidToken, target_end)),
        }

        let close = match self.search(start, target_end, b"?>") {
            Some(pos) => pos,
            None => return self.incomplete(start, ErrorKind::UnclosedToken),
        };

        // "xml" in any other case is reserved
        let is_xml_decl = target == "xml";
        if !is_xml_decl && target.eq_ignore_ascii_case("xml") {
            return Err(TokenError::new(ErrorKind::InvalidToken, start + 2));
        }

        let content = self.checked_str(target_end, close)?;
        self.scanner.set_position(close + 2);

        let kind = if is_xml_decl { TokenKind::XmlDeclaration } else { TokenKind::ProcessingInstruction };
        Ok(Some(
            Token::new(kind, (start, self.scanner.position()))
                .with_name(target)
                .with_content(Cow::Borrowed(content.trim_start_matches(|c: char| c.is_ascii_whitespace()))),
        ))
    }

    /// Parse text content up to the next '<'
    fn parse_text(&mut self) -> TokenResult<'a> {
        let start = self.scanner.position();

        self.scanner.set_position(start + self.carried(start).scanned);
        let found = self.scanner.find_tag_start();
        self.scanner.set_position(start);
        let end = match found {
            Some(end) => end,
            // Text may continue in the next chunk
            None if !self.is_final => {
                self.stalled.scanned = self.scanner.len() - start;
                return Ok(None);
            }
            None => self.scanner.len(),
        };

        // Trailing text of the final chunk may stop inside a character
        if end == self.scanner.len() {
            if let Err(err) = std::str::from_utf8(self.scanner.slice(start, end)) {
                if err.error_len().is_none() {
                    return Err(TokenError::new(ErrorKind::PartialChar, start + err.valid_up_to()));
                }
            }
        }

        let content = self.checked_str(start, end)?;
        // "]]>" only closes a CDATA section and may not appear in character data
        if let Some(i) = memmem::find(content.as_bytes(), b"]]>") {
            return Err(TokenError::new(ErrorKind::InvalidToken, start + i));
        }
        let decoded = decode_text(content).map_err(|e| e.offset(start))?;
        self.scanner.set_position(end);

        Ok(Some(Token::new(TokenKind::Text, (start, end)).with_content(decoded)))
    }

    /// Read a name at the current position
    ///
    /// `Ok(None)` when the buffer ends inside (or right before) the name.
    fn read_name(&mut self) -> Result<Option<&'a str>, TokenError> {
        let start = self.scanner.position();
        match self.scanner.read_name() {
            // The name may continue in the next chunk
            Some(_) | None if self.scanner.is_eof() => Ok(None),
            Some(raw) => utf8(raw).map(Some).map_err(|e| e.offset(start)),
            None => Err(TokenError::new(ErrorKind::InvalidToken, start)),
        }
    }

    /// Progress carried in for the construct starting at `start`
    fn carried(&self, start: usize) -> Resume {
        if start == 0 {
            self.resume
        } else {
            Resume::default()
        }
    }

    /// Find `needle` at or after `from`, resuming where an earlier search on
    /// the construct at `start` gave up
    fn search(&mut self, start: usize, from: usize, needle: &[u8]) -> Option<usize> {
        let from = from.max(start + self.carried(start).scanned);
        self.scanner.set_position(from.min(self.scanner.len()));
        let found = self.scanner.find_sequence(needle);
        if found.is_none() {
            // the needle may straddle the end of the buffer
            let searched = self.scanner.len().saturating_sub(needle.len() - 1);
            self.stalled.scanned = searched.max(from).min(self.scanner.len()) - start;
        }
        found
    }

    /// UTF-8 and XML character validation of `start..end`
    fn checked_str(&self, start: usize, end: usize) -> Result<&'a str, TokenError> {
        let text = utf8(self.scanner.slice(start, end)).map_err(|e| e.offset(start))?;
        check_chars(text).map_err(|e| e.offset(start))?;
        Ok(text)
    }

    /// The construct starting at `start` is cut off by the end of the buffer
    fn incomplete(&mut self, start: usize, kind: ErrorKind) -> TokenResult<'a> {
        self.scanner.set_position(start);
        if !self.is_final {
            return Ok(None);
        }

        match std::str::from_utf8(self.scanner.remaining()) {
            Err(err) if err.error_len().is_none() => {
                Err(TokenError::new(ErrorKind::PartialChar, start + err.valid_up_to()))
            }
            _ => Err(TokenError::new(kind, start)),
        }
    }
}
