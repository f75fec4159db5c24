//! Error types
//!
//! Three layers:
//! - [`ErrorKind`]: what went wrong inside the tokenizer (expat-compatible wording)
//! - [`ParseError`]: an error kind pinned to a line/column of the document
//! - [`Error`]: everything that can end a run, mapped to a process exit code

use std::fmt;
use std::io;

/// Kind of well-formedness (or resource) failure detected by the push parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Growing an internal buffer failed
    NoMemory,
    /// Markup where the document structure does not allow it
    Syntax,
    /// Input ended before the root element was opened or closed
    NoElements,
    /// A character or construct that cannot appear at this point
    InvalidToken,
    /// Input ended inside a tag, comment or other markup
    UnclosedToken,
    /// Input ended inside a multi-byte character
    PartialChar,
    /// End tag does not match the innermost open element
    TagMismatch,
    /// The same attribute name appears twice on one element
    DuplicateAttribute,
    /// Content after the root element was closed
    JunkAfterDocElement,
    /// Reference to an entity that was never declared
    UndefinedEntity,
    /// Character reference to a code point that is not an XML character
    BadCharRef,
    /// `<?xml ...?>` somewhere other than the very start of the document
    MisplacedXmlPi,
    /// Input ended inside a CDATA section
    UnclosedCdataSection,
    /// Input was fed after the final chunk
    Finished,
}

impl ErrorKind {
    /// Human-readable description, worded the way expat reports it
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::NoMemory => "out of memory",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::NoElements => "no element found",
            ErrorKind::InvalidToken => "not well-formed (invalid token)",
            ErrorKind::UnclosedToken => "unclosed token",
            ErrorKind::PartialChar => "partial character",
            ErrorKind::TagMismatch => "mismatched tag",
            ErrorKind::DuplicateAttribute => "duplicate attribute",
            ErrorKind::JunkAfterDocElement => "junk after document element",
            ErrorKind::UndefinedEntity => "undefined entity",
            ErrorKind::BadCharRef => "reference to invalid character number",
            ErrorKind::MisplacedXmlPi => "XML or text declaration not at start of entity",
            ErrorKind::UnclosedCdataSection => "unclosed CDATA section",
            ErrorKind::Finished => "parsing finished",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A parse failure and where in the document it was detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ErrorKind,
    /// 1-based line number
    pub line: u64,
    /// 0-based column within the line, in bytes of the original input
    pub column: u64,
    /// 0-based offset from the start of the input, in bytes as fed
    pub byte_offset: u64,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}, column {}", self.kind, self.line, self.column)
    }
}

impl std::error::Error for ParseError {}

/// Any failure that aborts a run
#[derive(Debug)]
pub enum Error {
    /// The parser instance could not be allocated
    ParserAlloc,
    /// The parser's scratch buffer could not be allocated
    BufferAlloc,
    /// The document is not well-formed
    Parse(ParseError),
    /// The chunk source failed
    Read(io::Error),
    /// Writing the outline failed
    Output(io::Error),
}

impl Error {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// The parse error, if this is one
    pub fn as_parse_error(&self) -> Option<&ParseError> {
        match self {
            Error::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ParserAlloc => f.write_str("Couldn't allocate memory for parser"),
            Error::BufferAlloc => f.write_str("Couldn't allocate memory for buffer"),
            Error::Parse(err) => write!(f, "Parse error at line {}:\n{}", err.line, err.kind),
            Error::Read(err) => write!(f, "Couldn't read input: {}", err),
            Error::Output(err) => write!(f, "Couldn't write output: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Read(err) | Error::Output(err) => Some(err),
            Error::ParserAlloc | Error::BufferAlloc => None,
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err)
    }
}
