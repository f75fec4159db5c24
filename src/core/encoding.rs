//! Input Encodings
//!
//! The parser is configured for one fixed input encoding at creation time.
//! Everything after this module works on UTF-8, so non-UTF-8 input is
//! transcoded as each chunk arrives.

use std::fmt;
use std::str::FromStr;

/// Byte order mark that may open a UTF-8 document
pub const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Fixed text encoding of the document being fed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8 (the default)
    #[default]
    Utf8,
    /// ISO-8859-1: every byte is the code point of the same value
    Latin1,
}

impl Encoding {
    /// Canonical label
    pub fn label(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Latin1 => "ISO-8859-1",
        }
    }

    /// Look up an encoding by label (case-insensitive)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Encoding::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Some(Encoding::Latin1),
            _ => None,
        }
    }

    /// Upper bound of UTF-8 bytes produced for `len` input bytes
    #[inline]
    pub fn max_utf8_len(self, len: usize) -> usize {
        match self {
            Encoding::Utf8 => len,
            Encoding::Latin1 => len * 2,
        }
    }

    /// Number of input bytes that transcoded to `decoded`
    pub fn input_len(self, decoded: &[u8]) -> usize {
        match self {
            Encoding::Utf8 => decoded.len(),
            // every non-ASCII byte became a lead byte plus one continuation byte
            Encoding::Latin1 => decoded.len() - decoded.iter().filter(|&&b| b & 0xC0 == 0x80).count(),
        }
    }

    /// Append `input`, transcoded to UTF-8, to `out`
    pub fn decode_into(self, input: &[u8], out: &mut Vec<u8>) {
        match self {
            Encoding::Utf8 => out.extend_from_slice(input),
            Encoding::Latin1 => {
                for &b in input {
                    if b < 0x80 {
                        out.push(b);
                    } else {
                        out.push(0xC0 | (b >> 6));
                        out.push(0x80 | (b & 0x3F));
                    }
                }
            }
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Encoding::from_label(s).ok_or_else(|| format!("unsupported encoding: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Encoding::from_label("UTF-8"), Some(Encoding::Utf8));
        assert_eq!(Encoding::from_label("latin1"), Some(Encoding::Latin1));
        assert_eq!(Encoding::from_label("ebcdic"), None);
        assert_eq!("iso-8859-1".parse::<Encoding>(), Ok(Encoding::Latin1));
        assert!("utf-16".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_latin1_to_utf8() {
        let mut out = Vec::new();
        Encoding::Latin1.decode_into(b"caf\xe9 \xff", &mut out);
        assert_eq!(std::str::from_utf8(&out).unwrap(), "caf\u{e9} \u{ff}");
        assert!(out.len() <= Encoding::Latin1.max_utf8_len(6));
        assert_eq!(Encoding::Latin1.input_len(&out), 6);
        assert_eq!(Encoding::Utf8.input_len(&out), out.len());
    }

    #[test]
    fn test_utf8_passthrough() {
        let mut out = Vec::new();
        Encoding::Utf8.decode_into("\u{30a1}".as_bytes(), &mut out);
        assert_eq!(out, "\u{30a1}".as_bytes());
    }
}
