//! Tokenizer engine
//!
//! Everything below the push API:
//! - scanner: memchr-backed delimiter search and line/column tracking
//! - tokenizer: turns the buffered prefix of a document into tokens
//! - entities: reference decoding and character checks (Cow, zero-copy when possible)
//! - attributes: attribute lists of start tags
//! - encoding: input encodings, transcoded to UTF-8 on arrival

pub mod attributes;
pub mod encoding;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
