//! Probe set construction (made by FontLab https://www.fontlab.com/)
//!
//! A probe is a single visible character rendered off-screen to obtain a
//! geometric measurement. The probe set is built once from configured
//! codepoint ranges, shared read-only across all fonts, and must be
//! byte-for-byte reproducible: same ranges, same ordered identifiers.

use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

/// Inclusive range of Unicode codepoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodepointRange {
    pub start: u32,
    pub end: u32,
}

impl CodepointRange {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// Default measurement coverage: ASCII, Latin-1 supplement, Latin
/// Extended A/B and Additional, general punctuation, currency symbols,
/// letterlike symbols, arrows, and mathematical operators.
pub const DEFAULT_PROBE_RANGES: &[CodepointRange] = &[
    CodepointRange::new(0x0021, 0x007E),
    CodepointRange::new(0x00A1, 0x00FF),
    CodepointRange::new(0x0100, 0x017F),
    CodepointRange::new(0x0180, 0x024F),
    CodepointRange::new(0x1E00, 0x1EFF),
    CodepointRange::new(0x2010, 0x2027),
    CodepointRange::new(0x2030, 0x205F),
    CodepointRange::new(0x20A0, 0x20CF),
    CodepointRange::new(0x2100, 0x214F),
    CodepointRange::new(0x2190, 0x21FF),
    CodepointRange::new(0x2200, 0x22FF),
];

/// A single character probe with its canonical identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    /// Canonical identifier, e.g. `U+0041`.
    pub id: String,
    /// The character itself.
    pub ch: char,
}

/// Ordered, deduplicated sequence of probes.
#[derive(Debug, Clone, Default)]
pub struct ProbeSet {
    probes: Vec<Probe>,
}

impl ProbeSet {
    /// Build the probe set for the given ranges. Pure and deterministic;
    /// an empty result is valid.
    pub fn build(ranges: &[CodepointRange]) -> Self {
        let mut probes = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for range in ranges {
            for cp in range.start..=range.end {
                // Surrogate code units are not Unicode scalar values and
                // are rejected here, satisfying the Cs exclusion.
                let Some(ch) = char::from_u32(cp) else {
                    continue;
                };
                if !is_visible(ch) {
                    continue;
                }
                if seen.insert(cp) {
                    probes.push(Probe {
                        id: unicode_key(cp),
                        ch,
                    });
                }
            }
        }

        Self { probes }
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

/// Canonical probe identifier: uppercase hex, zero-padded to at least
/// four digits.
pub fn unicode_key(cp: u32) -> String {
    format!("U+{cp:04X}")
}

/// Whether a character is worth probing: the plain space is the only
/// admissible whitespace, and control, format, unassigned, and
/// private-use characters never render useful geometry.
pub fn is_visible(ch: char) -> bool {
    if ch.is_whitespace() && ch != ' ' {
        return false;
    }
    !matches!(
        ch.general_category(),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Unassigned
            | GeneralCategory::PrivateUse
            | GeneralCategory::Surrogate
    )
}
