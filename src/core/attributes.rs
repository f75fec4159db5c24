//! XML Attribute Parsing
//!
//! Parses XML attributes from tag content.

use super::entities::{check_chars, decode_attribute, utf8};
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use super::tokenizer::TokenError;
use crate::error::ErrorKind;
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Attribute name, exactly as written
    pub name: &'a str,
    /// Attribute value (entities decoded, whitespace normalised)
    pub value: Cow<'a, str>,
}

impl<'a> Attribute<'a> {
    /// Create a new attribute
    pub fn new(name: &'a str, value: Cow<'a, str>) -> Self {
        Attribute { name, value }
    }
}

/// Parse attributes from raw tag content (after the element name)
///
/// Input should be the content between element name and '>' or '/>'.
/// Error positions are relative to `input`.
pub fn parse_attributes(input: &[u8]) -> Result<Vec<Attribute<'_>>, TokenError> {
    let mut attrs: Vec<Attribute<'_>> = Vec::new();
    let mut pos = 0;

    loop {
        let ws_start = pos;
        pos = skip_whitespace(input, pos);
        if pos >= input.len() {
            break;
        }

        // Attributes must be separated from the name and from each other
        if pos == ws_start || !is_name_start_char(input[pos]) {
            return Err(invalid(pos));
        }

        let name_start = pos;
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = utf8(&input[name_start..pos]).map_err(|e| e.offset(name_start))?;

        pos = skip_whitespace(input, pos);
        if input.get(pos) != Some(&b'=') {
            return Err(invalid(pos));
        }
        pos = skip_whitespace(input, pos + 1);

        let quote = match input.get(pos) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => return Err(invalid(pos)),
        };
        let value_start = pos + 1;
        let value_end = memchr(quote, &input[value_start..])
            .map(|i| value_start + i)
            .ok_or(invalid(pos))?;

        let raw = &input[value_start..value_end];
        if let Some(lt) = memchr(b'<', raw) {
            return Err(invalid(value_start + lt));
        }
        let raw = utf8(raw).map_err(|e| e.offset(value_start))?;
        check_chars(raw).map_err(|e| e.offset(value_start))?;
        let value = decode_attribute(raw).map_err(|e| e.offset(value_start))?;

        if attrs.iter().any(|a| a.name == name) {
            return Err(TokenError::new(ErrorKind::DuplicateAttribute, name_start));
        }
        attrs.push(Attribute::new(name, value));

        pos = value_end + 1;
    }

    Ok(attrs)
}

#[inline]
fn skip_whitespace(input: &[u8], mut pos: usize) -> usize {
    while pos < input.len() && is_whitespace(input[pos]) {
        pos += 1;
    }
    pos
}

#[inline]
fn invalid(pos: usize) -> TokenError {
    TokenError::new(ErrorKind::InvalidToken, pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_attributes() {
        let attrs = parse_attributes(b" id=\"test\" class=\"foo\"").unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, "id");
        assert_eq!(attrs[0].value, "test");
        assert_eq!(attrs[1].name, "class");
        assert_eq!(attrs[1].value, "foo");
    }

    #[test]
    fn test_single_quoted() {
        let attrs = parse_attributes(b" id='te\"st'").unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].value, "te\"st");
    }

    #[test]
    fn test_entity_in_value() {
        let attrs = parse_attributes(b" title=\"&lt;hello&gt;\"").unwrap();
        assert_eq!(attrs[0].value, "<hello>");
    }

    #[test]
    fn test_empty_attributes() {
        assert!(parse_attributes(b"").unwrap().is_empty());
        assert!(parse_attributes(b"   \n").unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_handling() {
        let attrs = parse_attributes(b"  id  =  \"test\"  ").unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].name, "id");
        assert_eq!(attrs[0].value, "test");
    }

    #[test]
    fn test_document_order_kept() {
        let attrs = parse_attributes(b" z=\"1\" a=\"2\" m=\"3\"").unwrap();
        let names: Vec<_> = attrs.iter().map(|a| a.name).collect();
        assert_eq!(names, ["z", "a", "m"]);
    }

    #[test]
    fn test_missing_separator() {
        let err = parse_attributes(b" a=\"1\"b=\"2\"").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidToken);
        assert_eq!(err.position, 6);
    }

    #[test]
    fn test_unquoted_value() {
        let err = parse_attributes(b" a=1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidToken);
        assert_eq!(err.position, 3);
    }

    #[test]
    fn test_lt_in_value() {
        let err = parse_attributes(b" a=\"x<y\"").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidToken);
        assert_eq!(err.position, 5);
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = parse_attributes(b" a=\"1\" a=\"2\"").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateAttribute);
        assert_eq!(err.position, 7);
    }
}
