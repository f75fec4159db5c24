//! Outline rendering
//!
//! [`OutlineBuilder`] is an [`ElementHandler`] that writes one line per
//! element start:
//!
//! ```text
//! <indent><name> (<key>: <value>, <key>: <value>)
//! ```
//!
//! The indent is `depth * indent` spaces, where depth is the number of
//! elements open when the element starts. End events only decrement the
//! depth.

use crate::sax::{ElementHandler, StartElement};
use std::fmt::Write as _;
use std::io::{self, Write};

/// Default number of spaces per nesting level
pub const DEFAULT_INDENT: usize = 2;

/// Writes the element outline to `W`
///
/// Callbacks cannot return errors to the parser, so the first write error
/// is kept and every later line is skipped. The driver collects it through
/// [`ElementHandler::take_failure`].
#[derive(Debug)]
pub struct OutlineBuilder<W: Write> {
    out: W,
    depth: usize,
    indent: usize,
    /// Line being rendered, reused between elements
    line: String,
    lines: u64,
    error: Option<io::Error>,
    failed: bool,
}

impl<W: Write> OutlineBuilder<W> {
    /// Builder with the default two-space indent
    pub fn new(out: W) -> Self {
        Self::with_indent(out, DEFAULT_INDENT)
    }

    pub fn with_indent(out: W, indent: usize) -> Self {
        OutlineBuilder {
            out,
            depth: 0,
            indent,
            line: String::with_capacity(64),
            lines: 0,
            error: None,
            failed: false,
        }
    }

    /// Number of currently open elements
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Lines written so far
    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Flush and return the writer
    ///
    /// Reports a latched write error that was never taken.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn render(&mut self, event: &StartElement<'_>) {
        self.line.clear();
        for _ in 0..self.depth * self.indent {
            self.line.push(' ');
        }
        self.line.push_str(event.name());
        self.line.push_str(" (");
        for (i, (key, value)) in event.attributes().enumerate() {
            if i > 0 {
                self.line.push_str(", ");
            }
            // writing to a String cannot fail
            let _ = write!(self.line, "{}: {}", key, value);
        }
        self.line.push_str(")\n");
    }
}

impl<W: Write> ElementHandler for OutlineBuilder<W> {
    fn start_element(&mut self, event: &StartElement<'_>) {
        if !self.failed {
            self.render(event);
            match self.out.write_all(self.line.as_bytes()) {
                Ok(()) => self.lines += 1,
                Err(err) => {
                    self.failed = true;
                    self.error = Some(err);
                }
            }
        }
        self.depth += 1;
    }

    fn end_element(&mut self, _name: &str) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn take_failure(&mut self) -> Option<io::Error> {
        self.error.take()
    }
}
