//! Charset detection with ranked, confidence-scored candidates
//!
//! Detection runs in two stages: a content classification pass decides
//! whether the bytes are text at all, and only textual content reaches the
//! statistical detection engines. Binary content short-circuits into a
//! single certain candidate carrying the observed content category, because
//! a statistical charset guess over binary data would only ever be noise.

use serde::Serialize;

use crate::sniff;
use crate::{Error, Result};

/// One charset candidate produced by detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Charset {
    /// Encoding name; empty when the input was not textual
    pub name: String,
    /// Confidence score from 0 to 100; 100 denotes certainty
    pub confidence: u8,
    /// Human language associated with the candidate, if the engine knows it
    pub language: String,
    /// Content category observed during classification
    pub mime: String,
}

/// Candidate as reported by the statistical engines, before mime tagging
struct Candidate {
    name: String,
    confidence: u8,
    language: String,
}

/// Encoding names the detection engines can report.
const DETECTABLE_ENCODINGS: &[&str] = &[
    "UTF-8",
    "UTF-16LE",
    "UTF-16BE",
    "Shift_JIS",
    "EUC-JP",
    "ISO-2022-JP",
    "EUC-KR",
    "ISO-2022-KR",
    "Big5",
    "GBK",
    "gb18030",
    "windows-874",
    "windows-1250",
    "windows-1251",
    "windows-1252",
    "windows-1253",
    "windows-1254",
    "windows-1255",
    "windows-1256",
    "windows-1257",
    "windows-1258",
    "ISO-8859-2",
    "ISO-8859-4",
    "ISO-8859-5",
    "ISO-8859-6",
    "ISO-8859-7",
    "ISO-8859-8",
    "ISO-8859-13",
    "KOI8-R",
    "KOI8-U",
    "IBM866",
    "x-mac-cyrillic",
    "TIS-620",
    "ascii",
];

/// Confidence boost applied to a candidate matching the declared encoding
const DECLARED_BOOST: u8 = 10;
/// Distance a corroborating candidate is ranked below the primary
const SECONDARY_GAP: u8 = 20;
/// Confidence of a corroborating candidate with no primary to rank under
const SECONDARY_FLOOR: u8 = 40;

/// Charset detector over byte buffers
///
/// One detector instance serves one logical caller at a time; independent
/// instances are freely usable from separate threads.
pub struct Detector {
    declared: Option<String>,
    filter_input: bool,
    max_sample_size: usize,
}

impl Default for Detector {
    fn default() -> Self {
        Self {
            declared: None,
            filter_input: false,
            max_sample_size: 8192,
        }
    }
}

impl Detector {
    /// Create a new detector with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector that feeds at most `max_sample_size` bytes to the
    /// statistical engines
    pub fn with_sample_size(max_sample_size: usize) -> Self {
        Self {
            max_sample_size,
            ..Self::default()
        }
    }

    /// Declare the encoding the input claims to be in (from a protocol
    /// header or document declaration); a matching statistical candidate is
    /// ranked with more confidence.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownEncoding`] if the label does not resolve.
    pub fn set_declared_encoding(&mut self, label: &str) -> Result<()> {
        let encoding = crate::engine::encoding_for_label(label)?;
        self.declared = Some(encoding.name().to_string());
        Ok(())
    }

    /// Enable or disable the markup input filter. When enabled, tags are
    /// stripped from the input before statistical analysis so that HTML/XML
    /// syntax does not skew the byte statistics. Returns the previous
    /// setting.
    pub fn enable_input_filter(&mut self, enabled: bool) -> bool {
        let previous = self.filter_input;
        self.filter_input = enabled;
        previous
    }

    /// Whether the markup input filter is enabled
    pub fn is_input_filter_enabled(&self) -> bool {
        self.filter_input
    }

    /// Encoding names this detector can report
    pub fn supported_encodings(&self) -> &'static [&'static str] {
        DETECTABLE_ENCODINGS
    }

    /// Detect the most likely charset of `input`.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyInput`] if `input` is empty.
    pub fn run(&mut self, input: &[u8]) -> Result<Charset> {
        let mut candidates = self.run_all(input)?;
        if candidates.is_empty() {
            return Err(Error::Internal("detection engine returned no candidates"));
        }
        Ok(candidates.remove(0))
    }

    /// Detect all charset candidates of `input`, ordered by confidence,
    /// highest first. The order among equally scored candidates is engine
    /// defined. Non-textual input yields exactly one candidate with an empty
    /// name, confidence 100 and the observed content category.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyInput`] if `input` is empty.
    pub fn run_all(&mut self, input: &[u8]) -> Result<Vec<Charset>> {
        if input.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mime = sniff::classify(input);
        if !sniff::is_textual(&mime) {
            // statistical detection over binary content is meaningless
            return Ok(vec![Charset {
                name: String::new(),
                confidence: 100,
                language: String::new(),
                mime,
            }]);
        }

        let sample = &input[..input.len().min(self.max_sample_size)];
        let candidates = if self.filter_input {
            self.statistical_candidates(&strip_markup(sample))
        } else {
            self.statistical_candidates(sample)
        };

        Ok(aggregate(&mime, candidates))
    }

    /// Collect ranked candidates from the statistical engines. The primary
    /// engine reports name, confidence and language; a second engine's guess
    /// corroborates or contradicts it and is ranked strictly below. The
    /// declared-encoding hint is applied here, inside the engine adapter,
    /// so the returned order is already final.
    fn statistical_candidates(&self, sample: &[u8]) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        if sample.is_empty() {
            // the input filter can strip a tags-only document down to nothing
            return candidates;
        }

        let (raw_name, confidence, language) = chardet::detect(sample);
        if !raw_name.is_empty() {
            let name = match chardet::charset2encoding(&raw_name) {
                "" => raw_name.clone(),
                normalized => normalized.to_string(),
            };
            let confidence = (confidence.clamp(0.0, 1.0) * 100.0).round() as u8;
            candidates.push(Candidate {
                name,
                confidence,
                language,
            });
        }

        let mut corroborator = chardetng::EncodingDetector::new();
        corroborator.feed(sample, true);
        let guess = corroborator.guess(None, true);

        let duplicate = candidates
            .iter()
            .any(|candidate| same_encoding(&candidate.name, guess.name()));
        if !duplicate {
            let confidence = match candidates.first() {
                Some(primary) => primary.confidence.saturating_sub(SECONDARY_GAP).max(5),
                None => SECONDARY_FLOOR,
            };
            candidates.push(Candidate {
                name: guess.name().to_string(),
                confidence,
                language: String::new(),
            });
        }

        if let Some(declared) = self.declared.as_deref() {
            for candidate in &mut candidates {
                if same_encoding(&candidate.name, declared) {
                    candidate.confidence = candidate
                        .confidence
                        .saturating_add(DECLARED_BOOST)
                        .min(100);
                }
            }
            // the boost may have reordered; stable sort keeps ties as-is
            candidates.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        }

        candidates
    }
}

/// Turn the engine's ranked candidate set into the caller-facing result
/// list, tagging every candidate with the observed content category. The
/// engine's own ordering is preserved verbatim.
fn aggregate(mime: &str, candidates: Vec<Candidate>) -> Vec<Charset> {
    candidates
        .into_iter()
        .map(|candidate| Charset {
            name: candidate.name,
            confidence: candidate.confidence,
            language: candidate.language,
            mime: mime.to_string(),
        })
        .collect()
}

/// Whether two encoding names refer to the same encoding, resolving labels
/// where possible and falling back to a case-insensitive comparison.
fn same_encoding(a: &str, b: &str) -> bool {
    match (
        encoding_rs::Encoding::for_label(a.as_bytes()),
        encoding_rs::Encoding::for_label(b.as_bytes()),
    ) {
        (Some(left), Some(right)) => left == right,
        _ => a.eq_ignore_ascii_case(b),
    }
}

/// Remove markup tags, replacing each with a single space so that words
/// separated only by tags stay separated.
fn strip_markup(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len());
    let mut in_tag = false;

    for &byte in input {
        match byte {
            b'<' if !in_tag => in_tag = true,
            b'>' if in_tag => {
                in_tag = false;
                output.push(b' ');
            }
            _ if !in_tag => output.push(byte),
            _ => {}
        }
    }

    output
}
