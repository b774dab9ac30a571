//! Record Normalizer: raw message → canonical record.
//!
//! Pure functions turning one loosely-shaped raw export record into a
//! [`Message`] with the fixed, pre-declared column set. Handles text
//! re-encoding, reaction flattening, media-count extraction and
//! call-outcome derivation. Field renaming is the declarative mapping from
//! the export's native field names embodied by
//! [`RawMessage`](crate::parsing::shard::RawMessage); anything outside it
//! is dropped after parsing (and logged when unexpected).

use std::collections::BTreeMap;

use chrono::FixedOffset;
use tracing::debug;

use crate::message::{Message, Platform};
use crate::parsing::shard::{RawMessage, RawReaction};
use crate::parsing::{fix_mojibake, parse_ms_timestamp};

/// Derives the deterministic reaction column name for an actor.
///
/// Lower-cased, spaces replaced by underscores, suffixed `_reactions`:
/// `"Bob Smith"` → `"bob_smith_reactions"`.
pub fn reaction_column(actor: &str) -> String {
    let mut column = actor.to_lowercase().replace(' ', "_");
    column.push_str("_reactions");
    column
}

/// Flattens a raw reaction list into per-actor columns.
///
/// At most one reaction is retained per actor; if the export ever contains
/// duplicates for one actor the last entry wins. Actor names and emoji both
/// go through Mojibake repair. An absent list normalizes to an empty map.
pub fn flatten_reactions(raw: &[RawReaction]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for entry in raw {
        let actor = fix_mojibake(&entry.actor);
        if actor.is_empty() {
            continue;
        }
        out.insert(reaction_column(&actor), fix_mojibake(&entry.reaction));
    }
    out
}

/// Normalizes one raw record into the canonical column set.
///
/// Returns `None` when the row has no usable timestamp; every kept row has
/// a sender (possibly empty, resolved later by the assembler's
/// depersonalized-sender policy) and an absolute instant in the corpus
/// time zone.
pub fn normalize_message(raw: RawMessage, platform: Platform, tz: FixedOffset) -> Option<Message> {
    let timestamp = raw.timestamp_ms.and_then(|ms| parse_ms_timestamp(ms, tz))?;

    if !raw.unknown.is_empty() {
        let fields: Vec<&str> = raw.unknown.keys().map(String::as_str).collect();
        debug!(?fields, "raw message carried undeclared fields");
    }

    let mut msg = Message::new(fix_mojibake(&raw.sender_name), timestamp, platform);

    if let Some(content) = raw.content.as_deref() {
        msg = msg.with_text(fix_mojibake(content));
    }

    msg.reactions = flatten_reactions(&raw.reactions);

    msg.photos = raw.photos.count();
    msg.videos = raw.videos.count();
    msg.audio_files = raw.audio_files.count();
    msg.files = raw.files.count();
    msg.gifs = raw.gifs.count();

    msg.share_link = raw.share.and_then(|s| s.link);
    msg.has_sticker = raw.sticker.is_some();

    if let Some(seconds) = raw.call_duration {
        msg = msg.with_call_duration(seconds);
    }

    Some(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::FieldValue;
    use crate::parsing::shard::{RawAttachment, RawShare, RawSticker};

    fn raw(sender: &str, ms: Option<i64>) -> RawMessage {
        RawMessage {
            sender_name: sender.to_string(),
            timestamp_ms: ms,
            content: None,
            reactions: Vec::new(),
            photos: FieldValue::Absent,
            videos: FieldValue::Absent,
            audio_files: FieldValue::Absent,
            files: FieldValue::Absent,
            gifs: FieldValue::Absent,
            sticker: None,
            share: None,
            call_duration: None,
            missed: None,
            msg_type: None,
            is_unsent: None,
            unknown: BTreeMap::new(),
        }
    }

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_reaction_column_shape() {
        assert_eq!(reaction_column("Bob Smith"), "bob_smith_reactions");
        assert_eq!(reaction_column("alice"), "alice_reactions");
    }

    #[test]
    fn test_flatten_reactions_decodes_emoji() {
        // U+2764 stored as mojibake bytes E2 9D A4
        let raw = vec![RawReaction {
            reaction: "\u{e2}\u{9d}\u{a4}".to_string(),
            actor: "Bob Smith".to_string(),
        }];
        let flat = flatten_reactions(&raw);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["bob_smith_reactions"], "\u{2764}");
    }

    #[test]
    fn test_flatten_reactions_last_wins_per_actor() {
        let raw = vec![
            RawReaction {
                reaction: "a".to_string(),
                actor: "Alice".to_string(),
            },
            RawReaction {
                reaction: "b".to_string(),
                actor: "Alice".to_string(),
            },
        ];
        let flat = flatten_reactions(&raw);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["alice_reactions"], "b");
    }

    #[test]
    fn test_missing_timestamp_skips_row() {
        assert!(normalize_message(raw("Alice", None), Platform::Facebook, tz()).is_none());
    }

    #[test]
    fn test_text_len_matches_char_count() {
        let mut r = raw("Alice", Some(1_600_000_000_000));
        r.content = Some("hello".to_string());
        let msg = normalize_message(r, Platform::Facebook, tz()).unwrap();
        assert_eq!(msg.text_len, 5);
        assert_eq!(msg.text.as_deref(), Some("hello"));

        let no_text = normalize_message(raw("Alice", Some(1_600_000_000_000)), Platform::Facebook, tz())
            .unwrap();
        assert_eq!(no_text.text_len, 0);
    }

    #[test]
    fn test_media_lists_collapse_to_counts() {
        let mut r = raw("Bob", Some(1_600_000_000_000));
        r.photos = FieldValue::Many(vec![
            RawAttachment { uri: Some("a.jpg".into()) },
            RawAttachment { uri: Some("b.jpg".into()) },
        ]);
        r.audio_files = FieldValue::One(RawAttachment { uri: None });
        let msg = normalize_message(r, Platform::Facebook, tz()).unwrap();
        assert_eq!(msg.photos, 2);
        assert_eq!(msg.audio_files, 1);
        assert_eq!(msg.videos, 0);
    }

    #[test]
    fn test_share_and_sticker() {
        let mut r = raw("Bob", Some(1_600_000_000_000));
        r.share = Some(RawShare {
            link: Some("https://example.com".into()),
            share_text: None,
        });
        r.sticker = Some(RawSticker { uri: Some("s.png".into()) });
        let msg = normalize_message(r, Platform::Facebook, tz()).unwrap();
        assert_eq!(msg.share_link.as_deref(), Some("https://example.com"));
        assert!(msg.has_sticker);
    }

    #[test]
    fn test_call_flags() {
        let mut r = raw("Bob", Some(1_600_000_000_000));
        r.call_duration = Some(0.0);
        let msg = normalize_message(r, Platform::Facebook, tz()).unwrap();
        assert!(msg.missed_call);
        assert!(!msg.completed_call);

        let mut r = raw("Bob", Some(1_600_000_000_000));
        r.call_duration = Some(61.0);
        let msg = normalize_message(r, Platform::Facebook, tz()).unwrap();
        assert!(msg.completed_call);
    }

    #[test]
    fn test_sender_name_is_re_decoded() {
        let mangled: String = "Zoë".bytes().map(char::from).collect();
        let r = raw(&mangled, Some(1_600_000_000_000));
        let msg = normalize_message(r, Platform::Facebook, tz()).unwrap();
        assert_eq!(msg.sender, "Zoë");
    }
}
