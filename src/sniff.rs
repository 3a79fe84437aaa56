//! Content classification: decide what kind of bytes a buffer holds before
//! any charset analysis runs.
//!
//! Classification is signature-driven: a Unicode byte order mark wins, then
//! magic-number matching, then a NUL-byte scan separates the remaining
//! buffers into plain text and opaque binary.

/// How many leading bytes the NUL scan inspects.
const SAMPLE_SIZE: usize = 8192;

/// Classify `input` into a mime-style content category. Never returns an
/// empty string.
pub(crate) fn classify(input: &[u8]) -> String {
    // a byte order mark marks text regardless of what the bytes after it
    // look like (UTF-16/32 payloads are full of NULs)
    if has_bom(input) {
        return "text/plain".to_string();
    }

    if let Some(kind) = infer::get(input) {
        return kind.mime_type().to_string();
    }

    if input.iter().take(SAMPLE_SIZE).any(|&b| b == 0) {
        return "application/octet-stream".to_string();
    }

    "text/plain".to_string()
}

/// Whether a mime category names content the statistical charset detector
/// can meaningfully analyze.
pub(crate) fn is_textual(mime: &str) -> bool {
    mime.starts_with("text/")
        || matches!(
            mime,
            "application/json" | "application/xml" | "image/svg+xml"
        )
}

fn has_bom(input: &[u8]) -> bool {
    // UTF-32 before UTF-16: FF FE 00 00 starts with FF FE
    input.starts_with(&[0xFF, 0xFE, 0x00, 0x00])
        || input.starts_with(&[0x00, 0x00, 0xFE, 0xFF])
        || input.starts_with(&[0xEF, 0xBB, 0xBF])
        || input.starts_with(&[0xFF, 0xFE])
        || input.starts_with(&[0xFE, 0xFF])
}
