//! Streaming XML Parser
//!
//! Push parser that is fed the document in chunks and reports elements to a
//! registered [`ElementHandler`] as soon as each tag is complete.
//!
//! Lifecycle:
//!
//! ```text
//! new(encoding) --> register(handler) --> feed(chunk, false)* --> feed(chunk, true)
//!                                     \-> get_buffer(n) + parse_buffer(len, final)
//! ```
//!
//! Bytes that end part way through a construct stay in the parser's buffer
//! until the rest arrives, so chunk boundaries never change the events.
//! After a failure, or after the final chunk, the parser refuses input.
//! Dropping the parser releases every buffer it owns.

use crate::core::encoding::{Encoding, UTF8_BOM};
use crate::core::scanner::{is_whitespace, TextPosition};
use crate::core::tokenizer::{Resume, Token, TokenError, TokenKind, Tokenizer};
use crate::error::{Error, ErrorKind, ParseError};
use crate::sax::{ElementHandler, StartElement};
use log::{debug, trace};

/// Initial capacity of the pending-input buffer
const INITIAL_CAPACITY: usize = 1024;

/// Where the tokenizer is relative to the root element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Before the root element
    Prolog,
    /// Inside the root element
    Content,
    /// After the root element closed
    Epilog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Parsing,
    Finished,
    Failed(ParseError),
}

/// Document-level structure checks on top of the token stream
#[derive(Debug)]
struct DocumentState {
    /// Names of currently open elements, innermost last
    open: Vec<String>,
    phase: Phase,
    seen_token: bool,
    seen_doctype: bool,
}

impl DocumentState {
    fn new() -> Self {
        DocumentState {
            open: Vec::new(),
            phase: Phase::Prolog,
            seen_token: false,
            seen_doctype: false,
        }
    }

    /// Check `token` against the document structure and report element events
    fn handle<H: ElementHandler>(&mut self, token: &Token<'_>, handler: &mut H) -> Result<(), TokenError> {
        let at = token.span.0;
        let is_first = !self.seen_token;
        self.seen_token = true;
        let fail = |kind| Err(TokenError::new(kind, at));

        match token.kind {
            TokenKind::XmlDeclaration if !is_first => fail(ErrorKind::MisplacedXmlPi),
            TokenKind::XmlDeclaration | TokenKind::Comment | TokenKind::ProcessingInstruction => Ok(()),

            TokenKind::DocType => {
                if self.phase != Phase::Prolog || self.seen_doctype {
                    return fail(ErrorKind::Syntax);
                }
                self.seen_doctype = true;
                Ok(())
            }

            TokenKind::StartTag | TokenKind::EmptyTag => {
                if self.phase == Phase::Epilog {
                    return fail(ErrorKind::JunkAfterDocElement);
                }
                let name = token.name.unwrap_or_default();
                let is_empty = token.kind == TokenKind::EmptyTag;

                handler.start_element(&StartElement::new(name, &token.attributes, is_empty));
                if is_empty {
                    handler.end_element(name);
                    if self.open.is_empty() {
                        self.phase = Phase::Epilog;
                    }
                } else {
                    self.open.push(name.to_owned());
                    self.phase = Phase::Content;
                }
                Ok(())
            }

            TokenKind::EndTag => {
                let name = token.name.unwrap_or_default();
                match self.open.last() {
                    Some(open) if open == name => {
                        self.open.pop();
                        handler.end_element(name);
                        if self.open.is_empty() {
                            self.phase = Phase::Epilog;
                        }
                        Ok(())
                    }
                    Some(_) => fail(ErrorKind::TagMismatch),
                    None if self.phase == Phase::Epilog => fail(ErrorKind::JunkAfterDocElement),
                    None => fail(ErrorKind::Syntax),
                }
            }

            TokenKind::Text => {
                if self.phase == Phase::Content {
                    return Ok(());
                }
                let content = token.content.as_deref().unwrap_or_default();
                if content.bytes().all(is_whitespace) {
                    Ok(())
                } else if self.phase == Phase::Epilog {
                    fail(ErrorKind::JunkAfterDocElement)
                } else {
                    fail(ErrorKind::Syntax)
                }
            }

            TokenKind::CData if self.phase == Phase::Content => Ok(()),
            TokenKind::CData => fail(ErrorKind::Syntax),
        }
    }

    /// The root element has been opened and closed
    fn is_complete(&self) -> bool {
        self.phase == Phase::Epilog
    }
}

/// Stateful push parser
///
/// `H` is the registered [`ElementHandler`]; a freshly created parser has
/// the no-op handler `()` and must be [`register`](StreamingParser::register)ed
/// before it can be fed.
pub struct StreamingParser<H = ()> {
    encoding: Encoding,
    /// Transcoded input not yet turned into tokens
    buffer: Vec<u8>,
    /// Caller-filled region handed out by `get_buffer`
    scratch: Vec<u8>,
    /// Line/column of `buffer[0]`
    origin: TextPosition,
    /// Input byte offset of `buffer[0]`
    offset: u64,
    /// Search progress on the incomplete construct at `buffer[0]`
    resume: Resume,
    bom_checked: bool,
    document: DocumentState,
    status: Status,
    handler: H,
}

impl StreamingParser<()> {
    /// Create a parser for input in the given encoding
    ///
    /// Fails with [`Error::ParserAlloc`] when the input buffer cannot be
    /// allocated.
    pub fn new(encoding: Encoding) -> Result<Self, Error> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve(INITIAL_CAPACITY)
            .map_err(|_| Error::ParserAlloc)?;

        debug!("created {} streaming parser", encoding);
        Ok(StreamingParser {
            encoding,
            buffer,
            scratch: Vec::new(),
            origin: TextPosition::start(),
            offset: 0,
            resume: Resume::default(),
            // a BOM only has meaning in UTF-8 input
            bom_checked: encoding != Encoding::Utf8,
            document: DocumentState::new(),
            status: Status::Parsing,
            handler: (),
        })
    }

    /// Attach the handler that receives element events
    pub fn register<H: ElementHandler>(self, handler: H) -> StreamingParser<H> {
        StreamingParser {
            encoding: self.encoding,
            buffer: self.buffer,
            scratch: self.scratch,
            origin: self.origin,
            offset: self.offset,
            resume: self.resume,
            bom_checked: self.bom_checked,
            document: self.document,
            status: self.status,
            handler,
        }
    }
}

impl<H: ElementHandler> StreamingParser<H> {
    /// Feed the next chunk of the document
    ///
    /// Element callbacks fire before this returns, zero or more times, in
    /// document order. `is_final` marks the last chunk, which may be empty.
    pub fn feed(&mut self, chunk: &[u8], is_final: bool) -> Result<(), ParseError> {
        self.check_status()?;

        if self
            .buffer
            .try_reserve(self.encoding.max_utf8_len(chunk.len()))
            .is_err()
        {
            let error = self.locate(TokenError::new(ErrorKind::NoMemory, self.buffer.len()));
            return Err(self.fail(error));
        }
        self.encoding.decode_into(chunk, &mut self.buffer);

        trace!(
            "fed {} bytes (final: {}), {} pending",
            chunk.len(),
            is_final,
            self.buffer.len()
        );
        self.process(is_final)
    }

    /// Scratch region of `len` bytes owned by the parser
    ///
    /// Copy input into it, then call [`parse_buffer`](Self::parse_buffer).
    pub fn get_buffer(&mut self, len: usize) -> Result<&mut [u8], Error> {
        self.scratch.clear();
        self.scratch
            .try_reserve(len)
            .map_err(|_| Error::BufferAlloc)?;
        self.scratch.resize(len, 0);
        Ok(&mut self.scratch[..])
    }

    /// Parse the first `len` bytes of the region returned by `get_buffer`
    pub fn parse_buffer(&mut self, len: usize, is_final: bool) -> Result<(), ParseError> {
        let scratch = std::mem::take(&mut self.scratch);
        let result = self.feed(&scratch[..len.min(scratch.len())], is_final);
        self.scratch = scratch;
        result
    }

    /// The registered handler
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The registered handler, mutably
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Release the parser and hand back its handler
    pub fn into_handler(self) -> H {
        debug!("releasing parser at byte {}", self.offset);
        self.handler
    }

    /// The error that stopped parsing, if any
    pub fn error(&self) -> Option<&ParseError> {
        match &self.status {
            Status::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// The final chunk has been parsed successfully
    pub fn is_finished(&self) -> bool {
        self.status == Status::Finished
    }

    /// Number of elements currently open
    pub fn open_elements(&self) -> usize {
        self.document.open.len()
    }

    /// 1-based line of the first unparsed byte
    pub fn current_line(&self) -> u64 {
        self.origin.line
    }

    /// 0-based column of the first unparsed byte
    pub fn current_column(&self) -> u64 {
        self.origin.column
    }

    /// Encoding the parser was created for
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn check_status(&self) -> Result<(), ParseError> {
        match &self.status {
            Status::Parsing => Ok(()),
            Status::Failed(err) => Err(err.clone()),
            Status::Finished => Err(self.locate(TokenError::new(ErrorKind::Finished, self.buffer.len()))),
        }
    }

    /// Tokenize as much of the buffer as possible
    fn process(&mut self, is_final: bool) -> Result<(), ParseError> {
        if !self.bom_checked {
            if !is_final && self.buffer.len() < UTF8_BOM.len() && UTF8_BOM.starts_with(&self.buffer) {
                return Ok(());
            }
            if self.buffer.starts_with(UTF8_BOM) {
                self.buffer.drain(..UTF8_BOM.len());
                self.offset += UTF8_BOM.len() as u64;
            }
            self.bom_checked = true;
        }

        let StreamingParser {
            buffer,
            document,
            handler,
            resume,
            ..
        } = self;

        let mut tokenizer = Tokenizer::with_resume(buffer.as_slice(), is_final, *resume);
        let outcome = loop {
            match tokenizer.next_token() {
                Ok(Some(token)) => {
                    if let Err(err) = document.handle(&token, handler) {
                        break Err(err);
                    }
                }
                Ok(None) => {
                    *resume = tokenizer.stalled();
                    break Ok(tokenizer.position());
                }
                Err(err) => break Err(err),
            }
        };

        let outcome = outcome.and_then(|consumed| {
            if is_final && !document.is_complete() {
                Err(TokenError::new(ErrorKind::NoElements, consumed))
            } else {
                Ok(consumed)
            }
        });

        match outcome {
            Ok(consumed) => {
                self.consume(consumed);
                if is_final {
                    debug!("document complete after {} bytes", self.offset);
                    self.status = Status::Finished;
                }
                Ok(())
            }
            Err(err) => {
                let error = self.locate(err);
                Err(self.fail(error))
            }
        }
    }

    /// Drop `n` tokenized bytes from the front of the buffer
    fn consume(&mut self, n: usize) {
        let consumed = &self.buffer[..n];
        self.origin.advance_in(consumed, self.encoding);
        self.offset += self.encoding.input_len(consumed) as u64;
        self.buffer.drain(..n);
    }

    /// Pin a tokenizer error to a line and column of the input
    fn locate(&self, err: TokenError) -> ParseError {
        let at = err.position.min(self.buffer.len());
        let before = &self.buffer[..at];
        let mut position = self.origin;
        position.advance_in(before, self.encoding);

        ParseError {
            kind: err.kind,
            line: position.line,
            column: position.column,
            byte_offset: self.offset + self.encoding.input_len(before) as u64,
        }
    }

    fn fail(&mut self, error: ParseError) -> ParseError {
        debug!("parse failed: {}", error);
        self.status = Status::Failed(error.clone());
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sax::{EventCollector, RecordedEvent};

    fn collector() -> StreamingParser<EventCollector> {
        StreamingParser::new(Encoding::Utf8)
            .unwrap()
            .register(EventCollector::new())
    }

    fn names(events: &[RecordedEvent]) -> Vec<String> {
        events
            .iter()
            .map(|e| match e {
                RecordedEvent::Start { name, .. } => format!("+{}", name),
                RecordedEvent::End { name, .. } => format!("-{}", name),
            })
            .collect()
    }

    fn parse_all(input: &[u8]) -> Result<StreamingParser<EventCollector>, ParseError> {
        let mut parser = collector();
        parser.feed(input, true)?;
        Ok(parser)
    }

    #[test]
    fn test_streaming_simple() {
        let mut parser = collector();
        parser.feed(b"<root>", false).unwrap();
        parser.feed(b"<item/>", false).unwrap();
        parser.feed(b"</root>", true).unwrap();

        assert!(parser.is_finished());
        assert_eq!(
            names(parser.handler().events()),
            ["+root", "+item", "-item", "-root"]
        );
    }

    #[test]
    fn test_streaming_chunks() {
        let mut parser = collector();
        parser.feed(b"<ro", false).unwrap();
        assert!(parser.handler().events().is_empty());
        parser.feed(b"ot a=\"x", false).unwrap();
        assert!(parser.handler().events().is_empty());
        parser.feed(b"y\"><i", false).unwrap();
        assert_eq!(parser.handler().events().len(), 1);
        parser.feed(b"tem/></root>", false).unwrap();
        parser.feed(b"", true).unwrap();

        let events = parser.into_handler().take_events();
        assert_eq!(
            events[0],
            RecordedEvent::Start {
                name: "root".to_string(),
                attributes: vec![("a".to_string(), "xy".to_string())],
                depth: 0,
            }
        );
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_split_multibyte_character() {
        let doc = "<a v=\"\u{30a1}\"/>".as_bytes();
        let split = doc.iter().position(|&b| b >= 0x80).unwrap() + 1;

        let mut parser = collector();
        parser.feed(&doc[..split], false).unwrap();
        parser.feed(&doc[split..], true).unwrap();

        match &parser.handler().events()[0] {
            RecordedEvent::Start { attributes, .. } => assert_eq!(attributes[0].1, "\u{30a1}"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_tag() {
        let err = parse_all(b"<a><b></a>").err().unwrap();
        assert_eq!(err.kind, ErrorKind::TagMismatch);
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 6);
        assert_eq!(err.byte_offset, 6);
    }

    #[test]
    fn test_error_line_number() {
        let err = parse_all(b"<a>\n  <b>\n  </c>\n</a>").err().unwrap();
        assert_eq!(err.kind, ErrorKind::TagMismatch);
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 2);
    }

    #[test]
    fn test_error_line_across_chunks() {
        let mut parser = collector();
        parser.feed(b"<a>\n\n", false).unwrap();
        parser.feed(b"<b>\n", false).unwrap();
        let err = parser.feed(b"</a>", true).unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(err.kind, ErrorKind::TagMismatch);
    }

    #[test]
    fn test_partial_output_before_error() {
        let mut parser = collector();
        let err = parser.feed(b"<a><b></a>", true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TagMismatch);
        assert_eq!(names(parser.handler().events()), ["+a", "+b"]);
    }

    #[test]
    fn test_no_elements() {
        assert_eq!(parse_all(b"").err().unwrap().kind, ErrorKind::NoElements);
        assert_eq!(parse_all(b"  \n").err().unwrap().kind, ErrorKind::NoElements);

        let err = parse_all(b"<a>\n<b/>").err().unwrap();
        assert_eq!(err.kind, ErrorKind::NoElements);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unclosed_token() {
        let err = parse_all(b"<a></a").err().unwrap();
        assert_eq!(err.kind, ErrorKind::UnclosedToken);
        assert_eq!(err.column, 3);
    }

    #[test]
    fn test_junk_after_document_element() {
        assert_eq!(parse_all(b"<a/><b/>").err().unwrap().kind, ErrorKind::JunkAfterDocElement);
        assert_eq!(parse_all(b"<a/>text").err().unwrap().kind, ErrorKind::JunkAfterDocElement);
        assert!(parse_all(b"<a/>\n<!-- trailing -->\n").is_ok());
    }

    #[test]
    fn test_text_before_root() {
        assert_eq!(parse_all(b"hello<a/>").err().unwrap().kind, ErrorKind::Syntax);
    }

    #[test]
    fn test_misplaced_declaration() {
        assert!(parse_all(b"<?xml version=\"1.0\"?><a/>").is_ok());
        let err = parse_all(b"\n<?xml version=\"1.0\"?><a/>").err().unwrap();
        assert_eq!(err.kind, ErrorKind::MisplacedXmlPi);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_byte_order_mark() {
        let mut parser = collector();
        parser.feed(b"\xEF\xBB", false).unwrap();
        parser.feed(b"\xBF<?xml version=\"1.0\"?><a/>", true).unwrap();
        assert_eq!(names(parser.handler().events()), ["+a", "-a"]);
    }

    #[test]
    fn test_skipped_constructs() {
        let doc = b"<!DOCTYPE r>\n<r><!-- c --><?pi d?><![CDATA[<x>]]>t&amp;t</r>";
        let parser = parse_all(doc).unwrap();
        assert_eq!(names(parser.handler().events()), ["+r", "-r"]);
    }

    #[test]
    fn test_feed_after_finish() {
        let mut parser = collector();
        parser.feed(b"<a/>", true).unwrap();
        let err = parser.feed(b"<b/>", false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Finished);
    }

    #[test]
    fn test_feed_after_failure_repeats_error() {
        let mut parser = collector();
        let first = parser.feed(b"<a></b>", false).unwrap_err();
        let second = parser.feed(b"</a>", true).unwrap_err();
        assert_eq!(first, second);
        assert_eq!(parser.error(), Some(&first));
    }

    #[test]
    fn test_get_buffer() {
        let mut parser = collector();
        let doc = b"<a><b/></a>";
        for (i, piece) in doc.chunks(4).enumerate() {
            let buf = parser.get_buffer(4).unwrap();
            buf[..piece.len()].copy_from_slice(piece);
            let is_final = i == 2;
            parser.parse_buffer(piece.len(), is_final).unwrap();
        }
        assert!(parser.is_finished());
        assert_eq!(parser.handler().events().len(), 4);
    }

    #[test]
    fn test_latin1_input() {
        let mut parser = StreamingParser::new(Encoding::Latin1)
            .unwrap()
            .register(EventCollector::new());
        parser.feed(b"<caf\xe9 n=\"\xe9t\xe9\"/>", true).unwrap();
        match &parser.handler().events()[0] {
            RecordedEvent::Start { name, attributes, .. } => {
                assert_eq!(name, "caf\u{e9}");
                assert_eq!(attributes[0].1, "\u{e9}t\u{e9}");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_long_constructs_are_searched_once() {
        let filler = "y".repeat(50_000);
        let docs = [
            format!("<r v=\"{}\" w='{}'/>", filler, filler),
            format!("<r>{}</r>", filler),
            format!("<r><!--{}--></r>", filler),
            format!("<r><?pi {}?></r>", filler),
            format!("<r><![CDATA[{}]]></r>", filler),
            format!("<!DOCTYPE r [<!ENTITY e \"{}\">]><r/>", filler),
        ];

        for doc in &docs {
            let mut parser = collector();
            for chunk in doc.as_bytes().chunks(10) {
                parser.feed(chunk, false).unwrap();
                // only the newest chunk is left to search on the next feed
                let unsearched = parser.buffer.len() - parser.resume.scanned;
                assert!(unsearched <= 10, "{} unsearched bytes in {:.20}", unsearched, doc);
            }
            parser.feed(b"", true).unwrap();
            assert_eq!(names(parser.handler().events()), ["+r", "-r"]);
        }
    }

    #[test]
    fn test_long_attribute_value_keeps_quote_state() {
        let value = "x>".repeat(20_000);
        let doc = format!("<a v=\"{}\"/>", value);

        let mut parser = collector();
        for chunk in doc.as_bytes().chunks(10) {
            parser.feed(chunk, false).unwrap();
            if parser.handler().events().is_empty() {
                assert_eq!(parser.resume.quote, Some(b'"'));
                assert_eq!(parser.resume.scanned, parser.buffer.len());
            }
        }
        parser.feed(b"", true).unwrap();

        match &parser.handler().events()[0] {
            RecordedEvent::Start { attributes, .. } => assert_eq!(attributes[0].1, value),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cdata_close_in_text() {
        let doc = b"<a>x]]>y</a>";
        for size in 1..=doc.len() {
            let mut parser = collector();
            let mut result = Ok(());
            for chunk in doc.chunks(size) {
                result = parser.feed(chunk, false);
                if result.is_err() {
                    break;
                }
            }
            let err = result.and_then(|_| parser.feed(b"", true)).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidToken, "chunk size {}", size);
            assert_eq!(err.byte_offset, 4, "chunk size {}", size);
        }

        assert!(parse_all(b"<a>]]</a>").is_ok());
        assert!(parse_all(b"<a><![CDATA[x]]></a>").is_ok());
    }

    #[test]
    fn test_latin1_error_position_counts_input_bytes() {
        let mut parser = StreamingParser::new(Encoding::Latin1)
            .unwrap()
            .register(EventCollector::new());
        parser.feed(b"<r a=\"\xe9\xe9\">", false).unwrap();
        let err = parser.feed(b"\n\xe9</s>", true).unwrap_err();

        assert_eq!(err.kind, ErrorKind::TagMismatch);
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 1);
        assert_eq!(err.byte_offset, 12);
    }

    #[test]
    fn test_open_elements_and_position() {
        let mut parser = collector();
        parser.feed(b"<a>\n <b>\n  te", false).unwrap();
        assert_eq!(parser.open_elements(), 2);
        // trailing text is held back until the next '<'
        assert_eq!(parser.current_line(), 2);
        assert_eq!(parser.current_column(), 4);
    }
}
