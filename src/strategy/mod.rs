//! Parsing Strategy Module
//!
//! - Streaming push parser: chunks in, element callbacks out
//!
//! The parser never sees the whole document at once; each call to
//! `feed` handles whatever complete markup the buffered input holds.

pub mod streaming;

pub use streaming::StreamingParser;
