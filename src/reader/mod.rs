//! XML Reader Module
//!
//! Sources that hand the document to the push parser in bounded chunks:
//! - SliceSource: chunks borrowed from an in-memory document
//! - ReaderSource: chunks read from any `std::io::Read`
//!
//! A chunk shorter than [`ChunkSource::max_chunk`] is the last one. When
//! the document length is an exact multiple of the chunk size the last
//! chunk is empty.

pub mod buffered;
pub mod slice;

pub use buffered::ReaderSource;
pub use slice::{Chunk, SliceSource};

use std::io;

/// Producer of document chunks
pub trait ChunkSource {
    /// Maximum number of bytes in one chunk (at least 1)
    fn max_chunk(&self) -> usize;

    /// Copy the next chunk into `buf` and return its length
    ///
    /// `buf` holds at least `max_chunk()` bytes. A return value below
    /// `max_chunk()` means the input is exhausted.
    fn fill_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<S: ChunkSource + ?Sized> ChunkSource for &mut S {
    fn max_chunk(&self) -> usize {
        (**self).max_chunk()
    }

    fn fill_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).fill_chunk(buf)
    }
}
