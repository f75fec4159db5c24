//! In-memory chunk source
//!
//! Splits a byte slice into chunks of a fixed maximum size without
//! copying.

use super::ChunkSource;
use std::io;

/// One piece of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub bytes: &'a [u8],
    /// No chunk follows this one
    pub is_final: bool,
}

/// Chunk source over a byte slice
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    input: &'a [u8],
    pos: usize,
    max: usize,
    done: bool,
}

impl<'a> SliceSource<'a> {
    /// Create a source yielding chunks of at most `max` bytes (clamped to 1)
    pub fn new(input: &'a [u8], max: usize) -> Self {
        SliceSource {
            input,
            pos: 0,
            max: max.max(1),
            done: false,
        }
    }

    /// Bytes not yet handed out
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Take the next chunk
    ///
    /// After the final chunk every call returns an empty final chunk.
    pub fn next_chunk(&mut self) -> Chunk<'a> {
        let end = (self.pos + self.max).min(self.input.len());
        let bytes = &self.input[self.pos..end];
        self.pos = end;

        let is_final = bytes.len() < self.max;
        if is_final {
            self.done = true;
        }
        Chunk { bytes, is_final }
    }
}

impl<'a> Iterator for SliceSource<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Chunk<'a>> {
        if self.done {
            None
        } else {
            Some(self.next_chunk())
        }
    }
}

impl ChunkSource for SliceSource<'_> {
    fn max_chunk(&self) -> usize {
        self.max
    }

    fn fill_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = self.next_chunk();
        buf[..chunk.bytes.len()].copy_from_slice(chunk.bytes);
        Ok(chunk.bytes.len())
    }
}
