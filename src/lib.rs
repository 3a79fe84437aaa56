//! # Recode - Streaming Character-Set Transcoding and Detection
//!
//! A character encoding conversion library with incremental streaming
//! adapters, plus charset and content-type detection with ranked,
//! confidence-scored candidates.
//!
//! ## Features
//!
//! - **One-shot conversion** between any two named encodings, sized exactly
//!   by a probe pass before allocation
//! - **Streaming decode reader** wrapping any [`std::io::Read`], carrying
//!   partial multi-byte sequences across arbitrarily sized reads
//! - **Streaming encode writer** converting complete chunks into any
//!   [`std::io::Write`] sink
//! - **Charset detection** returning ranked candidates with confidence
//!   scores and language tags
//! - **Content classification** that short-circuits detection on binary data
//!
//! ## Quick Start
//!
//! ```rust
//! use recode::convert;
//!
//! // Convert UTF-8 text to Shift_JIS and back
//! let sjis = convert("こんにちは世界".as_bytes(), "utf-8", "sjis")?;
//! let utf8 = convert(&sjis, "sjis", "utf-8")?;
//! assert_eq!(utf8, "こんにちは世界".as_bytes());
//! # Ok::<(), recode::Error>(())
//! ```
//!
//! Streaming decode with an ordinary reader loop:
//!
//! ```rust
//! use std::io::Read;
//! use recode::DecodeReader;
//!
//! let sjis: &[u8] = &[0x82, 0xB1, 0x82, 0xF1, 0x82, 0xC9, 0x82, 0xBF, 0x82, 0xCD];
//! let mut reader = DecodeReader::new(sjis, "sjis", "utf-8")?;
//!
//! let mut utf8 = String::new();
//! reader.read_to_string(&mut utf8)?;
//! assert_eq!(utf8, "こんにちは");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]

use std::fmt;

pub mod detection;
mod engine;
mod sniff;
mod stream;

pub use stream::{DecodeReader, EncodeWriter};

/// Result type for conversion and detection operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during conversion and detection
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Encoding label not recognized by the converter tables
    UnknownEncoding {
        /// The label that failed to resolve
        label: String,
    },
    /// Input bytes are not a valid sequence in the source encoding
    Malformed {
        /// Canonical name of the source encoding
        encoding: &'static str,
        /// Approximate byte offset of the malformed sequence within the
        /// most recent input chunk
        offset: usize,
    },
    /// Character has no representation in the target encoding
    Unmappable {
        /// The unmappable character
        character: char,
        /// Canonical name of the target encoding
        encoding: &'static str,
    },
    /// Detection was asked to classify an empty buffer
    EmptyInput,
    /// An engine invariant believed unreachable was violated; a fatal
    /// defect in this library or its converter tables, never retryable
    Internal(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownEncoding { label } => {
                write!(f, "Unknown encoding label '{}'", label)
            }
            Error::Malformed { encoding, offset } => {
                write!(f, "Malformed {} sequence near byte {}", encoding, offset)
            }
            Error::Unmappable {
                character,
                encoding,
            } => {
                write!(f, "Cannot encode character '{}' in {}", character, encoding)
            }
            Error::EmptyInput => write!(f, "Input buffer is empty"),
            Error::Internal(msg) => write!(f, "Internal invariant violated: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Convert a complete byte buffer from one encoding to another.
///
/// Runs in two passes over fresh converter state: a size probe that reports
/// the exact output length, then a materializing pass into a buffer of
/// exactly that length. A conversion is never partially applied; either both
/// passes succeed or an error is returned and no output is produced.
///
/// Encoding names are WHATWG labels, so common aliases like `"utf8"`,
/// `"sjis"` or `"latin1"` resolve to their canonical encodings.
///
/// Empty input yields an empty output buffer.
///
/// # Errors
///
/// [`Error::UnknownEncoding`] if either label fails to resolve,
/// [`Error::Malformed`] if the input is invalid in the source encoding, and
/// [`Error::Unmappable`] if a decoded character has no representation in the
/// target encoding.
///
/// # Examples
///
/// ```rust
/// let euro = recode::convert(&[0x80], "windows-1252", "utf-8")?;
/// assert_eq!(euro, "€".as_bytes());
/// # Ok::<(), recode::Error>(())
/// ```
pub fn convert(input: &[u8], from: &str, to: &str) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let from_encoding = engine::encoding_for_label(from)?;
    let to_encoding = engine::encoding_for_label(to)?;

    // probe pass: learn the exact destination length
    let required = engine::measure(from_encoding, to_encoding, input)?;

    // materializing pass into an exact-length buffer
    let mut output = vec![0u8; required];
    let produced = engine::materialize(from_encoding, to_encoding, input, &mut output)?;
    if produced != required {
        return Err(Error::Internal("size probe and conversion disagree"));
    }
    output.truncate(produced);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_sjis_round_trip() {
        let original = "こんにちは世界".as_bytes();

        let sjis = convert(original, "utf8", "sjis").unwrap();
        assert_eq!(sjis.len(), 14);

        let utf8 = convert(&sjis, "sjis", "utf8").unwrap();
        assert_eq!(utf8, original);
    }

    #[test]
    fn test_windows_1252_special_chars() {
        // Euro and trademark signs sit in the 0x80-0x9F range
        let output = convert(&[0x80, 0x99], "windows-1252", "utf-8").unwrap();
        assert_eq!(std::str::from_utf8(&output).unwrap(), "€™");

        let back = convert(&output, "utf-8", "windows-1252").unwrap();
        assert_eq!(back, &[0x80, 0x99]);
    }

    #[test]
    fn test_utf16_endianness_conversion() {
        // "Hi" in UTF-16LE
        let le_input = &[0x48, 0x00, 0x69, 0x00];
        let be_output = convert(le_input, "utf-16le", "utf-16be").unwrap();
        assert_eq!(be_output, &[0x00, 0x48, 0x00, 0x69]);

        let roundtrip = convert(&be_output, "utf-16be", "utf-16le").unwrap();
        assert_eq!(le_input, &roundtrip[..]);
    }

    #[test]
    fn test_utf16_surrogate_round_trip() {
        let input = "Hello 🌍!";

        let utf16 = convert(input.as_bytes(), "utf-8", "utf-16le").unwrap();
        // every BMP character is two bytes, the emoji is a surrogate pair
        assert_eq!(utf16.len(), (input.chars().count() + 1) * 2);

        let back = convert(&utf16, "utf-16le", "utf-8").unwrap();
        assert_eq!(back, input.as_bytes());
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let output = convert(b"", "utf-8", "sjis").unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_unknown_encoding_label() {
        let err = convert(b"hello", "utf-8", "klingon").unwrap_err();
        assert_eq!(
            err,
            Error::UnknownEncoding {
                label: "klingon".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_input_is_fatal() {
        // lone continuation byte is not valid UTF-8
        let err = convert(&[0x80], "utf-8", "sjis").unwrap_err();
        assert!(matches!(err, Error::Malformed { encoding: "UTF-8", .. }));
    }

    #[test]
    fn test_unmappable_character_is_fatal() {
        let err = convert("漢".as_bytes(), "utf-8", "windows-1252").unwrap_err();
        assert!(matches!(
            err,
            Error::Unmappable {
                character: '漢',
                encoding: "windows-1252"
            }
        ));
    }

    #[test]
    fn test_euc_jp_round_trip() {
        let original = "日本語のテキスト".as_bytes();

        let euc = convert(original, "utf-8", "euc-jp").unwrap();
        assert_ne!(euc, original);

        let back = convert(&euc, "euc-jp", "utf-8").unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_error_display() {
        let err = Error::UnknownEncoding {
            label: "x".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown encoding label 'x'");

        let err = Error::Unmappable {
            character: '円',
            encoding: "windows-1252",
        };
        assert_eq!(
            err.to_string(),
            "Cannot encode character '円' in windows-1252"
        );
    }
}
