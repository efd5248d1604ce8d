//! Script family detection by code-point range.

use serde::{Deserialize, Serialize};

/// Arabic, Arabic Supplement, Arabic Extended-A and presentation forms.
const ARABIC_RANGES: &[(u32, u32)] = &[
    (0x0600, 0x06FF),
    (0x0750, 0x077F),
    (0x08A0, 0x08FF),
    (0xFB50, 0xFDFF),
    (0xFE70, 0xFEFF),
];

/// CJK ideographs, kana, hangul and full-width forms.
const ASIAN_RANGES: &[(u32, u32)] = &[
    (0x1100, 0x11FF),
    (0x2E80, 0x2FDF),
    (0x3000, 0x303F),
    (0x3040, 0x309F),
    (0x30A0, 0x30FF),
    (0x3130, 0x318F),
    (0x31F0, 0x31FF),
    (0x3400, 0x4DBF),
    (0x4E00, 0x9FFF),
    (0xAC00, 0xD7AF),
    (0xF900, 0xFAFF),
    (0xFF00, 0xFFEF),
    (0x20000, 0x2A6DF),
];

/// Dominant script family of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptFamily {
    /// No letters at all.
    Empty,
    /// Contains Arabic-script characters.
    Arabic,
    /// Contains CJK/kana/hangul characters.
    Asian,
    /// Only Latin letters.
    Latin,
    /// Letters from some other script (Cyrillic, Devanagari, Greek, ...).
    Other,
}

/// Reading direction hint for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextDirection {
    LeftToRight,
    RightToLeft,
}

/// Returns whether any character falls inside the Arabic blocks.
pub fn contains_arabic_text(input: &str) -> bool {
    input.chars().any(|ch| in_ranges(ch, ARABIC_RANGES))
}

/// Returns whether any character falls inside the CJK/kana/hangul blocks.
pub fn contains_asian_text(input: &str) -> bool {
    input.chars().any(|ch| in_ranges(ch, ASIAN_RANGES))
}

/// Classifies text into one script family.
///
/// Arabic wins over Asian, which wins over Latin, so mixed input picks the
/// family that needs the most specialised rendering.
pub fn detect_script(input: &str) -> ScriptFamily {
    if contains_arabic_text(input) {
        return ScriptFamily::Arabic;
    }
    if contains_asian_text(input) {
        return ScriptFamily::Asian;
    }

    let mut saw_letter = false;
    for ch in input.chars().filter(|ch| ch.is_alphabetic()) {
        saw_letter = true;
        if !is_latin(ch) {
            return ScriptFamily::Other;
        }
    }

    if saw_letter {
        ScriptFamily::Latin
    } else {
        ScriptFamily::Empty
    }
}

/// Right-to-left when the text contains Arabic script.
pub fn text_direction(input: &str) -> TextDirection {
    if contains_arabic_text(input) {
        TextDirection::RightToLeft
    } else {
        TextDirection::LeftToRight
    }
}

fn in_ranges(ch: char, ranges: &[(u32, u32)]) -> bool {
    let code = u32::from(ch);
    ranges
        .iter()
        .any(|(start, end)| (*start..=*end).contains(&code))
}

fn is_latin(ch: char) -> bool {
    matches!(
        u32::from(ch),
        0x0041..=0x005A | 0x0061..=0x007A | 0x00C0..=0x024F | 0x1E00..=0x1EFF
    )
}
