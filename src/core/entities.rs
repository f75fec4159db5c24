//! XML Entity Decoding
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Uses Cow for zero-copy when no entities are present. Errors carry the
//! offset of the offending byte relative to the decoded input.

use super::scanner::{is_name_char, is_name_start_char};
use super::tokenizer::TokenError;
use crate::error::ErrorKind;
use memchr::{memchr, memchr3};
use std::borrow::Cow;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded.
#[inline]
pub fn decode_text(input: &str) -> Result<Cow<'_, str>, TokenError> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode(input, false).map(Cow::Owned)
}

/// Decode an attribute value: entity references plus whitespace normalisation
///
/// Tab, newline and carriage return become a space; `\r\n` collapses to a
/// single space.
#[inline]
pub fn decode_attribute(input: &str) -> Result<Cow<'_, str>, TokenError> {
    if memchr3(b'&', b'\t', b'\n', input.as_bytes()).is_none()
        && memchr(b'\r', input.as_bytes()).is_none()
    {
        return Ok(Cow::Borrowed(input));
    }
    decode(input, true).map(Cow::Owned)
}

fn decode(input: &str, normalize: bool) -> Result<String, TokenError> {
    let bytes = input.as_bytes();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;
    let mut copied = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'&' => {
                result.push_str(&input[copied..pos]);
                let semi = memchr(b';', &bytes[pos..])
                    .ok_or(TokenError::new(ErrorKind::InvalidToken, pos))?;
                let entity = &bytes[pos + 1..pos + semi];
                result.push(decode_entity(entity).map_err(|kind| TokenError::new(kind, pos))?);
                pos += semi + 1;
                copied = pos;
            }
            b'\r' | b'\n' | b'\t' if normalize => {
                result.push_str(&input[copied..pos]);
                result.push(' ');
                if bytes[pos] == b'\r' && bytes.get(pos + 1) == Some(&b'\n') {
                    pos += 1;
                }
                pos += 1;
                copied = pos;
            }
            _ => pos += 1,
        }
    }

    result.push_str(&input[copied..]);
    Ok(result)
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &[u8]) -> Result<char, ErrorKind> {
    if let Some(digits) = entity.strip_prefix(b"#") {
        return decode_numeric_entity(digits);
    }

    match entity {
        b"lt" => Ok('<'),
        b"gt" => Ok('>'),
        b"amp" => Ok('&'),
        b"quot" => Ok('"'),
        b"apos" => Ok('\''),
        [first, rest @ ..] if is_name_start_char(*first) && rest.iter().all(|&b| is_name_char(b)) => {
            Err(ErrorKind::UndefinedEntity)
        }
        _ => Err(ErrorKind::InvalidToken),
    }
}

/// Decode a numeric character reference (digits after '#')
fn decode_numeric_entity(digits: &[u8]) -> Result<char, ErrorKind> {
    let (digits, radix) = match digits.split_first() {
        Some((b'x', hex)) => (hex, 16),
        _ => (digits, 10),
    };

    if digits.is_empty() || !digits.iter().all(|b| (*b as char).is_digit(radix)) {
        return Err(ErrorKind::InvalidToken);
    }

    // all ASCII digits at this point
    let text = std::str::from_utf8(digits).map_err(|_| ErrorKind::InvalidToken)?;
    let codepoint = u32::from_str_radix(text, radix).map_err(|_| ErrorKind::BadCharRef)?;

    if !is_valid_xml_char(codepoint) {
        return Err(ErrorKind::BadCharRef);
    }
    char::from_u32(codepoint).ok_or(ErrorKind::BadCharRef)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// View bytes as UTF-8, reporting the first bad byte as an invalid token
pub fn utf8(bytes: &[u8]) -> Result<&str, TokenError> {
    std::str::from_utf8(bytes)
        .map_err(|e| TokenError::new(ErrorKind::InvalidToken, e.valid_up_to()))
}

/// Reject characters outside the XML 1.0 Char production
pub fn check_chars(text: &str) -> Result<(), TokenError> {
    // control characters are the only ones reachable from valid UTF-8
    if text.bytes().all(|b| b >= 0x20 || matches!(b, b'\t' | b'\n' | b'\r'))
        && !text.contains(['\u{FFFE}', '\u{FFFF}'])
    {
        return Ok(());
    }
    match text.char_indices().find(|(_, c)| !is_valid_xml_char(*c as u32)) {
        Some((at, _)) => Err(TokenError::new(ErrorKind::InvalidToken, at)),
        None => Ok(()),
    }
}
