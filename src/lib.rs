//! xmloutline - chunk-fed push XML parsing
//!
//! Feeds a document to a streaming parser a few bytes at a time and prints
//! an indented outline of its elements and their attributes.
//!
//! Layers:
//! - core: scanner, tokenizer, entity and attribute decoding, encodings
//! - strategy: the push parser (`StreamingParser`)
//! - sax: element callbacks (`ElementHandler`)
//! - reader: chunk sources over slices and `Read` streams
//! - outline: the handler that renders the outline
//! - driver: the feed loop tying the pieces together
//!
//! ```
//! use xmloutline::{outline_document, DriverOptions};
//!
//! let out = outline_document(br#"<a x="1"><b/></a>"#, Vec::new(), &DriverOptions::default()).unwrap();
//! assert_eq!(out, b"a (x: 1)\n  b ()\n");
//! ```

pub mod core;
pub mod driver;
pub mod error;
pub mod outline;
pub mod reader;
pub mod sax;
pub mod strategy;

pub use crate::core::encoding::Encoding;
pub use driver::{outline, outline_document, outline_reader, run, Driver, DriverOptions, DriverState, RunSummary};
pub use error::{Error, ErrorKind, ParseError};
pub use outline::OutlineBuilder;
pub use reader::{ChunkSource, ReaderSource, SliceSource};
pub use sax::{ElementHandler, EventCollector, RecordedEvent, StartElement};
pub use strategy::StreamingParser;

// ============================================================================
// Defaults
// ============================================================================

/// Bytes handed to the parser per feed unless configured otherwise
///
/// At this size most tags arrive over several feeds.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Document outlined by the binary when no input is given
///
/// The `b` attribute of `abc` holds U+30A1 (KATAKANA LETTER SMALL A), a
/// three-byte UTF-8 character.
pub const SAMPLE_DOCUMENT: &str = concat!(
    "\n      <abc a=\"1\" b=\"\u{30a1}\">\n",
    "         abc text\n",
    "         <!-- XML comment -->\n",
    "         <def e=\"z\" f=\"3\">\n",
    "            def text\n",
    "            <xyz c=\"2\" d=\"y\">\n",
    "               xyz text\n",
    "            </xyz>\n",
    "         </def>\n",
    "         <ghk g=\"5\"/>\n",
    "      </abc>\n",
    "   "
);
