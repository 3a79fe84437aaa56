//! Transcoding engine: encoding handles and the incremental conversion
//! primitive shared by the one-shot converter and the streaming adapters.
//!
//! Conversion pivots through UTF-8: the source decoder fills a reusable pivot
//! buffer, the target encoder drains it. Both coders run in strict
//! (`*_without_replacement`) mode so that malformed input and unmappable
//! characters surface as errors instead of substitution characters. UTF-16
//! targets are serialized from the pivot directly, code unit by code unit,
//! because the encoding tables treat UTF-16 as decode-only.

use encoding_rs::{Decoder, DecoderResult, Encoder, EncoderResult, Encoding};

use crate::{Error, Result};

/// Default staging buffer size, shared with the streaming adapters.
pub(crate) const DEFAULT_BUF_SIZE: usize = 4096;

/// Resolve an encoding label (WHATWG label, e.g. `"utf8"`, `"sjis"`,
/// `"windows-1252"`) to its encoding table.
pub(crate) fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| Error::UnknownEncoding {
        label: label.to_string(),
    })
}

/// Smallest number of bytes one code unit of `encoding` occupies.
pub(crate) fn min_code_unit_len(encoding: &'static Encoding) -> usize {
    match encoding.name() {
        "UTF-16LE" | "UTF-16BE" => 2,
        _ => 1,
    }
}

/// Largest number of bytes one source code unit can expand to in `encoding`,
/// including encoder state transitions. Conservative by design: the streaming
/// adapters size their output staging from this and the engine grows the
/// buffer itself in the rare case the bound is still exceeded.
pub(crate) fn max_code_unit_len(encoding: &'static Encoding) -> usize {
    match encoding.name() {
        // mode-switch escapes surround double-byte payloads
        "ISO-2022-JP" => 8,
        "UTF-8" | "UTF-16LE" | "UTF-16BE" => 4,
        "Shift_JIS" | "EUC-JP" | "EUC-KR" | "Big5" | "GBK" | "gb18030" | "replacement" => 4,
        _ => 1,
    }
}

/// Worst-case output size for converting `input_len` bytes between the two
/// encodings: `floor(input_len / min(from)) * max(to)`.
pub(crate) fn worst_case_output_len(
    input_len: usize,
    from: &'static Encoding,
    to: &'static Encoding,
) -> usize {
    (input_len / min_code_unit_len(from)) * max_code_unit_len(to)
}

/// Target side of the pivot. The encoding tables provide no UTF-16 encoder
/// (their output encoding substitutes UTF-8), so UTF-16 targets get a
/// stateless serialization arm instead.
enum Sink {
    Encoder(Encoder),
    Utf16 { big_endian: bool },
}

/// An open converter pair for one `(from, to)` encoding combination.
///
/// Owns the incremental decoder/encoder state, so a single `Transcoder` can
/// carry a partially consumed multi-byte sequence from one `convert_chunk`
/// call to the next (with `last = false`). After a call with `last = true`
/// the coder state is finished and the transcoder must not be reused.
pub(crate) struct Transcoder {
    decoder: Decoder,
    sink: Sink,
    pivot: Vec<u8>,
}

/// Encode one pivot chunk into `dst` starting at `produced`, growing `dst`
/// (at least doubling) whenever the target side runs out of room. Returns
/// the updated produced count.
fn encode_pivot(
    sink: &mut Sink,
    pivot_str: &str,
    dst: &mut Vec<u8>,
    mut produced: usize,
    last: bool,
) -> Result<usize> {
    match sink {
        Sink::Encoder(encoder) => {
            let mut consumed = 0;
            loop {
                let (result, read, wrote) = encoder.encode_from_utf8_without_replacement(
                    &pivot_str[consumed..],
                    &mut dst[produced..],
                    last,
                );
                consumed += read;
                produced += wrote;

                match result {
                    EncoderResult::Unmappable(character) => {
                        return Err(Error::Unmappable {
                            character,
                            encoding: encoder.encoding().name(),
                        });
                    }
                    EncoderResult::OutputFull => {
                        let grown = (dst.len() * 2).max(produced + DEFAULT_BUF_SIZE);
                        dst.resize(grown, 0);
                    }
                    EncoderResult::InputEmpty => {
                        if consumed >= pivot_str.len() {
                            return Ok(produced);
                        }
                    }
                }
            }
        }
        Sink::Utf16 { big_endian } => {
            // complete characters per pivot chunk, so this arm needs no state
            for unit in pivot_str.encode_utf16() {
                if produced + 2 > dst.len() {
                    let grown = (dst.len() * 2).max(produced + DEFAULT_BUF_SIZE);
                    dst.resize(grown, 0);
                }
                let bytes = if *big_endian {
                    unit.to_be_bytes()
                } else {
                    unit.to_le_bytes()
                };
                dst[produced..produced + 2].copy_from_slice(&bytes);
                produced += 2;
            }
            Ok(produced)
        }
    }
}

impl Transcoder {
    pub(crate) fn new(from: &'static Encoding, to: &'static Encoding) -> Self {
        let sink = match to.name() {
            "UTF-16LE" => Sink::Utf16 { big_endian: false },
            "UTF-16BE" => Sink::Utf16 { big_endian: true },
            _ => Sink::Encoder(to.new_encoder()),
        };

        Self {
            // the caller named the source encoding; a BOM is data, not a hint
            decoder: from.new_decoder_without_bom_handling(),
            sink,
            pivot: vec![0u8; DEFAULT_BUF_SIZE],
        }
    }

    /// Convert `src` into `dst`, writing from offset 0, and return the number
    /// of bytes produced. `dst` is grown (at least doubled) whenever the
    /// target side runs out of room; it is never shrunk.
    ///
    /// With `last = false` a trailing partial code unit is retained in the
    /// decoder for the next call. With `last = true` the input is final:
    /// a trailing partial unit is malformed, and the encoder flushes any
    /// pending state (such as an ISO-2022-JP shift-back) before returning.
    pub(crate) fn convert_chunk(
        &mut self,
        src: &[u8],
        dst: &mut Vec<u8>,
        last: bool,
    ) -> Result<usize> {
        let mut consumed = 0;
        let mut produced = 0;

        loop {
            let (dec_result, read, wrote) = self.decoder.decode_to_utf8_without_replacement(
                &src[consumed..],
                &mut self.pivot,
                last,
            );
            consumed += read;

            let decoder_done = match dec_result {
                DecoderResult::InputEmpty => true,
                DecoderResult::OutputFull => false,
                DecoderResult::Malformed(bad, extra) => {
                    let tail = bad as usize + extra as usize;
                    return Err(Error::Malformed {
                        encoding: self.decoder.encoding().name(),
                        offset: consumed.saturating_sub(tail),
                    });
                }
            };

            // The decoder guarantees valid UTF-8 made of complete characters.
            let pivot_str = std::str::from_utf8(&self.pivot[..wrote])
                .map_err(|_| Error::Internal("decoder produced invalid UTF-8"))?;

            produced = encode_pivot(&mut self.sink, pivot_str, dst, produced, last && decoder_done)?;

            if decoder_done {
                return Ok(produced);
            }
        }
    }
}

/// Size probe: run the conversion against an initially zero-capacity
/// destination and report the exact number of bytes the materializing pass
/// will produce. The destination-too-small condition is consumed internally;
/// any other failure is returned as-is.
pub(crate) fn measure(from: &'static Encoding, to: &'static Encoding, src: &[u8]) -> Result<usize> {
    let mut scratch = Vec::new();
    Transcoder::new(from, to).convert_chunk(src, &mut scratch, true)
}

/// Materializing pass: convert `src` into `dst` with fresh converter state
/// and return the number of bytes produced.
pub(crate) fn materialize(
    from: &'static Encoding,
    to: &'static Encoding,
    src: &[u8],
    dst: &mut Vec<u8>,
) -> Result<usize> {
    Transcoder::new(from, to).convert_chunk(src, dst, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_resolution() {
        assert_eq!(encoding_for_label("utf8").unwrap().name(), "UTF-8");
        assert_eq!(encoding_for_label("sjis").unwrap().name(), "Shift_JIS");
        assert_eq!(
            encoding_for_label(" Windows-1252 ").unwrap().name(),
            "windows-1252"
        );

        let err = encoding_for_label("no-such-charset").unwrap_err();
        assert_eq!(
            err,
            Error::UnknownEncoding {
                label: "no-such-charset".to_string()
            }
        );
    }

    #[test]
    fn code_unit_sizes() {
        let utf8 = encoding_for_label("utf-8").unwrap();
        let utf16 = encoding_for_label("utf-16le").unwrap();
        let sjis = encoding_for_label("shift_jis").unwrap();
        let latin1 = encoding_for_label("windows-1252").unwrap();

        assert_eq!(min_code_unit_len(utf8), 1);
        assert_eq!(min_code_unit_len(utf16), 2);
        assert_eq!(max_code_unit_len(utf8), 4);
        assert_eq!(max_code_unit_len(sjis), 4);
        assert_eq!(max_code_unit_len(latin1), 1);

        // 6 UTF-16 code units can become at most 6 * 4 UTF-8 bytes
        assert_eq!(worst_case_output_len(12, utf16, utf8), 24);
        // trailing partial unit does not count
        assert_eq!(worst_case_output_len(13, utf16, utf8), 24);
    }

    #[test]
    fn measure_matches_materialize() {
        let from = encoding_for_label("utf-8").unwrap();
        let to = encoding_for_label("shift_jis").unwrap();
        let input = "こんにちは世界".as_bytes();

        let required = measure(from, to, input).unwrap();
        let mut out = vec![0u8; required];
        let produced = materialize(from, to, input, &mut out).unwrap();

        assert_eq!(required, produced);
        assert_eq!(required, 14); // 7 double-byte characters
    }

    #[test]
    fn chunked_state_carries_partial_sequences() {
        let from = encoding_for_label("utf-8").unwrap();
        let to = encoding_for_label("shift_jis").unwrap();
        let input = "こんにちは".as_bytes();

        let mut transcoder = Transcoder::new(from, to);
        let mut dst = Vec::new();
        let mut total = 0;

        // feed one byte at a time, splitting every 3-byte character
        for (i, byte) in input.iter().enumerate() {
            let last = i == input.len() - 1;
            let mut step = Vec::new();
            let n = transcoder
                .convert_chunk(std::slice::from_ref(byte), &mut step, last)
                .unwrap();
            dst.extend_from_slice(&step[..n]);
            total += n;
        }

        assert_eq!(total, 10);
        let whole = measure(from, to, input).unwrap();
        assert_eq!(total, whole);
        assert_eq!(&dst[..2], &[0x82, 0xB1]); // こ
    }

    #[test]
    fn truncated_final_chunk_is_malformed() {
        let from = encoding_for_label("utf-8").unwrap();
        let to = encoding_for_label("shift_jis").unwrap();
        // first two bytes of a three-byte character
        let input = &"あ".as_bytes()[..2];

        let err = measure(from, to, input).unwrap_err();
        assert!(matches!(err, Error::Malformed { encoding: "UTF-8", .. }));
    }

    #[test]
    fn unmappable_character_is_reported() {
        let from = encoding_for_label("utf-8").unwrap();
        let to = encoding_for_label("windows-1252").unwrap();

        let err = measure(from, to, "price: 100円".as_bytes()).unwrap_err();
        assert_eq!(
            err,
            Error::Unmappable {
                character: '円',
                encoding: "windows-1252"
            }
        );
    }

    #[test]
    fn utf16_target_serializes_code_units() {
        let utf8 = encoding_for_label("utf-8").unwrap();
        let utf16le = encoding_for_label("utf-16le").unwrap();
        let utf16be = encoding_for_label("utf-16be").unwrap();

        let mut le = Vec::new();
        let n = Transcoder::new(utf8, utf16le)
            .convert_chunk(b"Hi", &mut le, true)
            .unwrap();
        assert_eq!(&le[..n], &[0x48, 0x00, 0x69, 0x00]);

        let mut be = Vec::new();
        let n = Transcoder::new(utf8, utf16be)
            .convert_chunk(b"Hi", &mut be, true)
            .unwrap();
        assert_eq!(&be[..n], &[0x00, 0x48, 0x00, 0x69]);

        // astral characters become surrogate pairs
        let mut pair = Vec::new();
        let n = Transcoder::new(utf8, utf16le)
            .convert_chunk("🌍".as_bytes(), &mut pair, true)
            .unwrap();
        assert_eq!(n, 4);
        assert_eq!(&pair[..n], &[0x3C, 0xD8, 0x0D, 0xDF]);
    }

    #[test]
    fn iso_2022_jp_flushes_shift_state() {
        let from = encoding_for_label("utf-8").unwrap();
        let to = encoding_for_label("iso-2022-jp").unwrap();

        let out_len = measure(from, to, "あ".as_bytes()).unwrap();
        // ESC $ B, two payload bytes, ESC ( B
        assert_eq!(out_len, 8);
    }
}
