//! Driver Loop
//!
//! Pulls chunks from a [`ChunkSource`] into the parser's scratch buffer and
//! parses them until the first short chunk or the first error.
//!
//! ```text
//! Feeding --chunk == max--> Feeding
//! Feeding --chunk <  max--> Done
//! Feeding --any failure---> Err(Error)
//! ```

use crate::core::encoding::Encoding;
use crate::error::Error;
use crate::outline::{OutlineBuilder, DEFAULT_INDENT};
use crate::reader::{ChunkSource, ReaderSource, SliceSource};
use crate::sax::ElementHandler;
use crate::strategy::StreamingParser;
use crate::DEFAULT_CHUNK_SIZE;
use log::{debug, trace};
use std::io::{Read, Write};

/// Settings for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// Maximum bytes per feed (at least 1)
    pub chunk_size: usize,
    pub encoding: Encoding,
    /// Spaces per nesting level in the outline
    pub indent: usize,
}

impl Default for DriverOptions {
    fn default() -> Self {
        DriverOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            encoding: Encoding::default(),
            indent: DEFAULT_INDENT,
        }
    }
}

impl DriverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk size (clamped to 1)
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }
}

/// Where the driver loop stands after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// More chunks follow
    Feeding,
    /// The final chunk has been parsed
    Done,
}

/// What a successful run did
#[derive(Debug)]
pub struct RunSummary<H> {
    /// Number of feed calls, the final one included
    pub feeds: u64,
    /// Bytes handed to the parser
    pub bytes: u64,
    pub handler: H,
}

/// Feeds one source into one parser
pub struct Driver<S, H> {
    source: S,
    parser: StreamingParser<H>,
    state: DriverState,
    feeds: u64,
    bytes: u64,
}

impl<S: ChunkSource, H: ElementHandler> Driver<S, H> {
    /// Create the parser and register `handler` with it
    pub fn new(source: S, handler: H, encoding: Encoding) -> Result<Self, Error> {
        let parser = StreamingParser::new(encoding)?.register(handler);
        Ok(Driver {
            source,
            parser,
            state: DriverState::Feeding,
            feeds: 0,
            bytes: 0,
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn parser(&self) -> &StreamingParser<H> {
        &self.parser
    }

    /// Read and parse one chunk
    pub fn step(&mut self) -> Result<DriverState, Error> {
        if self.state == DriverState::Done {
            return Ok(DriverState::Done);
        }

        let max = self.source.max_chunk();
        let buf = self.parser.get_buffer(max)?;
        let len = self.source.fill_chunk(buf).map_err(Error::Read)?.min(max);
        let is_final = len < max;

        trace!("feed #{}: {} bytes (final: {})", self.feeds + 1, len, is_final);
        let result = self.parser.parse_buffer(len, is_final);
        self.feeds += 1;
        self.bytes += len as u64;

        result?;
        if let Some(err) = self.parser.handler_mut().take_failure() {
            return Err(Error::Output(err));
        }

        if is_final {
            self.state = DriverState::Done;
        }
        Ok(self.state)
    }

    /// Release the parser
    pub fn finish(self) -> RunSummary<H> {
        RunSummary {
            feeds: self.feeds,
            bytes: self.bytes,
            handler: self.parser.into_handler(),
        }
    }
}

/// Parse everything `source` yields, reporting elements to `handler`
pub fn run<S, H>(source: S, handler: H, options: &DriverOptions) -> Result<RunSummary<H>, Error>
where
    S: ChunkSource,
    H: ElementHandler,
{
    let mut driver = Driver::new(source, handler, options.encoding)?;
    debug!(
        "parsing {} input in chunks of {} bytes",
        options.encoding,
        driver.source.max_chunk()
    );

    while driver.step()? == DriverState::Feeding {}

    let summary = driver.finish();
    debug!("parsed {} bytes in {} feeds", summary.bytes, summary.feeds);
    Ok(summary)
}

/// Write the outline of everything `source` yields to `out`
pub fn outline<S: ChunkSource, W: Write>(source: S, out: W, options: &DriverOptions) -> Result<W, Error> {
    let builder = OutlineBuilder::with_indent(out, options.indent);
    let summary = run(source, builder, options)?;
    summary.handler.finish().map_err(Error::Output)
}

/// Outline an in-memory document
pub fn outline_document<W: Write>(document: &[u8], out: W, options: &DriverOptions) -> Result<W, Error> {
    outline(SliceSource::new(document, options.chunk_size), out, options)
}

/// Outline a document read from `reader`
pub fn outline_reader<R: Read, W: Write>(reader: R, out: W, options: &DriverOptions) -> Result<W, Error> {
    outline(ReaderSource::new(reader, options.chunk_size), out, options)
}
