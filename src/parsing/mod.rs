//! Shared parsing utilities for raw export shards.
//!
//! This module contains the pieces every platform shard has in common:
//! the Mojibake repair for Meta's broken text encoding, epoch-millisecond
//! timestamp conversion, and [`FieldValue`], the explicit model for raw
//! JSON fields that are sometimes absent, sometimes a scalar and sometimes
//! a list.

pub mod shard;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::Deserialize;
use tracing::warn;

/// Fix Meta's broken encoding (Mojibake).
///
/// Meta exports UTF-8 text encoded as if it were ISO-8859-1: each UTF-8
/// byte is stored as a separate Unicode codepoint. Example: "Привет"
/// becomes "ÐŸÑ€Ð¸Ð²ÐµÑ‚".
///
/// This function reverses that process by taking each char as its byte
/// value and reconstructing the original UTF-8 string. Text that already
/// contains codepoints above U+00FF cannot be Mojibake and passes through
/// untouched. If the reconstructed bytes are not valid UTF-8, the original
/// text is returned and a warning is emitted; a bad byte sequence never
/// aborts the run.
pub fn fix_mojibake(s: &str) -> String {
    if s.is_empty() || s.chars().any(|c| c as u32 > 0xFF) {
        return s.to_string();
    }

    let bytes: Vec<u8> = s.chars().map(|c| c as u8).collect();
    match String::from_utf8(bytes) {
        Ok(fixed) => fixed,
        Err(_) => {
            warn!(text = s, "text could not be re-decoded as UTF-8, keeping original");
            s.to_string()
        }
    }
}

/// Converts an epoch-millisecond timestamp into an absolute instant in the
/// corpus time zone.
///
/// The whole corpus is normalized to one fixed offset because the export
/// carries no per-message sender time zone. Returns `None` for timestamps
/// outside the representable range.
pub fn parse_ms_timestamp(timestamp_ms: i64, tz: FixedOffset) -> Option<DateTime<FixedOffset>> {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|ts| ts.with_timezone(&tz))
}

/// A raw JSON field that may be absent, a single value or a list.
///
/// The export's field shapes are not stable: media fields are usually a
/// list of attachment descriptors, but can be missing or (in old extracts)
/// a single object. Rather than inspecting types at runtime, the shape is
/// resolved here, once, and the normalizer only deals in counts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue<T> {
    /// The field held a JSON array.
    Many(Vec<T>),
    /// The field held a single scalar/object value.
    One(T),
    /// The field was missing or null.
    Absent,
}

impl<T> Default for FieldValue<T> {
    fn default() -> Self {
        FieldValue::Absent
    }
}

impl<T> FieldValue<T> {
    /// Number of values carried by the field; this is the only thing the
    /// canonical record keeps for media fields.
    pub fn count(&self) -> u32 {
        match self {
            FieldValue::Many(v) => v.len() as u32,
            FieldValue::One(_) => 1,
            FieldValue::Absent => 0,
        }
    }

    /// Returns `true` if the field was missing or null.
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_mojibake_ascii_passthrough() {
        assert_eq!(fix_mojibake("Hello"), "Hello");
        assert_eq!(fix_mojibake("Test 123"), "Test 123");
        assert_eq!(fix_mojibake(""), "");
    }

    #[test]
    fn test_fix_mojibake_emoji() {
        // U+2764 (heavy black heart) is E2 9D A4 in UTF-8
        assert_eq!(fix_mojibake("\u{e2}\u{9d}\u{a4}"), "\u{2764}");
    }

    #[test]
    fn test_fix_mojibake_cyrillic() {
        // "Привет" mis-decoded as latin-1
        let mangled: String = "Привет".bytes().map(char::from).collect();
        assert_eq!(fix_mojibake(&mangled), "Привет");
    }

    #[test]
    fn test_fix_mojibake_already_decoded() {
        // Codepoints above U+00FF mean the text is already proper Unicode
        assert_eq!(fix_mojibake("Привет"), "Привет");
        assert_eq!(fix_mojibake("🎉 party"), "🎉 party");
    }

    #[test]
    fn test_fix_mojibake_invalid_sequence_falls_back() {
        // 0xFF is never valid in UTF-8; the original text survives
        assert_eq!(fix_mojibake("\u{ff}\u{fe}"), "\u{ff}\u{fe}");
    }

    #[test]
    fn test_parse_ms_timestamp() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let ts = parse_ms_timestamp(1_705_315_800_000, tz).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_705_315_800_000);
    }

    #[test]
    fn test_parse_ms_timestamp_offset_preserves_instant() {
        let tz = FixedOffset::east_opt(11 * 3600).unwrap();
        let ts = parse_ms_timestamp(1_705_315_800_000, tz).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_705_315_800_000);
        assert_eq!(ts.offset().local_minus_utc(), 11 * 3600);
    }

    #[test]
    fn test_field_value_counts() {
        let many: FieldValue<u8> = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(many.count(), 3);

        let one: FieldValue<u8> = serde_json::from_str("7").unwrap();
        assert_eq!(one.count(), 1);

        let absent: FieldValue<u8> = serde_json::from_str("null").unwrap();
        assert!(absent.is_absent());
        assert_eq!(absent.count(), 0);

        assert_eq!(FieldValue::<u8>::default().count(), 0);
    }
}
