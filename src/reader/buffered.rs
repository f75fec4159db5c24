//! Stream-backed chunk source
//!
//! Reads chunks from any source implementing the Read trait. Each chunk is
//! filled completely unless the stream ends, so a short chunk reliably
//! marks the end of input.

use super::ChunkSource;
use log::trace;
use std::io::{self, Read};

/// Chunk source over a reader
pub struct ReaderSource<R: Read> {
    reader: R,
    max: usize,
    /// Total bytes read so far
    read: u64,
    eof: bool,
}

impl<R: Read> ReaderSource<R> {
    /// Create a source reading chunks of at most `max` bytes (clamped to 1)
    pub fn new(reader: R, max: usize) -> Self {
        ReaderSource {
            reader,
            max: max.max(1),
            read: 0,
            eof: false,
        }
    }

    /// Total bytes read from the underlying reader
    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    /// Get back the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ChunkSource for ReaderSource<R> {
    fn max_chunk(&self) -> usize {
        self.max
    }

    fn fill_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let want = self.max.min(buf.len());
        let mut filled = 0;

        while filled < want && !self.eof {
            match self.reader.read(&mut buf[filled..want]) {
                Ok(0) => self.eof = true,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        self.read += filled as u64;
        trace!("read chunk of {} bytes (eof: {})", filled, self.eof);
        Ok(filled)
    }
}
