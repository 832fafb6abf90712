//! Segment labels
//!
//! Labels arrive as UTF-8 and are stored bounded. Glyph-limited renderers
//! (Adafruit GFX classic font) index code page 437 instead, so the render
//! tick transliterates before handing a label over.

use core::fmt;

use heapless::{String, Vec};
use serde::de::{self, Deserializer, Visitor};

/// Maximum stored label length in bytes
pub const MAX_LABEL_LEN: usize = 31;

pub type Label = String<MAX_LABEL_LEN>;

/// Label as code page 437 glyph indices
pub type GlyphLabel = Vec<u8, MAX_LABEL_LEN>;

/// Glyph used for characters the legacy font does not have
const UNKNOWN_GLYPH: u8 = b'?';

/// Copy `text` into a bounded label, cutting at the last character
/// boundary that fits.
pub fn truncate(text: &str) -> Label {
    let mut label = Label::new();
    for ch in text.chars() {
        if label.push(ch).is_err() {
            break;
        }
    }
    label
}

/// Deserialize a label with [`truncate`], so overlong text is cut rather
/// than rejected.
pub fn deserialize_truncated<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Label, D::Error> {
    struct TruncatingVisitor;

    impl Visitor<'_> for TruncatingVisitor {
        type Value = Label;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a label string")
        }

        fn visit_str<E: de::Error>(self, text: &str) -> Result<Label, E> {
            Ok(truncate(text))
        }
    }

    deserializer.deserialize_str(TruncatingVisitor)
}

/// Map one character to its code page 437 index
fn cp437(ch: char) -> u8 {
    match ch {
        'ü' => 0x81,
        'ö' => 0x94,
        'ä' => 0x84,
        'Ü' => 0x9A,
        'Ö' => 0x99,
        'Ä' => 0x8E,
        'ß' => 0xE1,
        c if c.is_ascii() => c as u8,
        _ => UNKNOWN_GLYPH,
    }
}

/// Transliterate a label for a code page 437 renderer.
///
/// Every character maps to exactly one glyph, and every non-ASCII UTF-8
/// character is at least two bytes, so the result always fits.
pub fn transliterate_cp437(label: &str) -> GlyphLabel {
    let mut glyphs = GlyphLabel::new();
    for ch in label.chars() {
        if glyphs.push(cp437(ch)).is_err() {
            break;
        }
    }
    glyphs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passes_through() {
        assert_eq!(transliterate_cp437("Round 1").as_slice(), b"Round 1");
    }

    #[test]
    fn test_german_umlauts() {
        assert_eq!(
            transliterate_cp437("Übung").as_slice(),
            &[0x9A, b'b', b'u', b'n', b'g']
        );
        assert_eq!(
            transliterate_cp437("äöüÄÖÜß").as_slice(),
            &[0x84, 0x94, 0x81, 0x8E, 0x99, 0x9A, 0xE1]
        );
    }

    #[test]
    fn test_unmapped_characters_become_placeholder() {
        assert_eq!(transliterate_cp437("é!").as_slice(), b"?!");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "abcdefghijklmnopqrstuvwxyz01234ü";
        let label = truncate(long);
        // 31 ASCII bytes fit; the two-byte 'ü' does not.
        assert_eq!(label.len(), 31);
        assert_eq!(label.as_str(), &long[..31]);

        let umlauts = "üüüüüüüüüüüüüüüü"; // 16 chars, 32 bytes
        assert_eq!(truncate(umlauts).len(), 30);
    }
}
