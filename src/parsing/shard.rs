//! Raw shard structures for deserialization.
//!
//! One shard is one `message_<n>.json` file holding a contiguous slice of a
//! conversation. Very long conversations are split across several numbered
//! shards; ordering across shards is not guaranteed by the file names.
//!
//! The structs here mirror the export's native field names. Everything the
//! canonical record does not keep is still parsed — unexpected fields land
//! in [`RawMessage::unknown`] so new export shapes can be spotted in the
//! logs without failing the run.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::FieldValue;

/// File-name pattern of a message shard inside a conversation folder.
pub const SHARD_FILE_PATTERN: &str = r"^message_\d+\.json$";

/// Top-level shape of one shard file.
///
/// The non-message fields (title, participation flag, thread type) are
/// repeated in every shard; when shards disagree the last-processed value
/// wins, an accepted approximation.
#[derive(Debug, Deserialize)]
pub struct RawShard {
    #[serde(default)]
    pub participants: Vec<RawParticipant>,
    #[serde(default)]
    pub messages: Vec<RawMessage>,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_true")]
    pub is_still_participant: bool,
    /// The platform's own thread-type flag. Parsed but not trusted for
    /// group classification; participant cardinality decides instead.
    #[serde(default)]
    pub thread_type: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct RawParticipant {
    #[serde(default)]
    pub name: String,
}

/// One raw message as it appears in the export.
#[derive(Debug, Deserialize)]
pub struct RawMessage {
    /// Empty string for depersonalized (deleted-account) senders.
    #[serde(default)]
    pub sender_name: String,
    pub timestamp_ms: Option<i64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reactions: Vec<RawReaction>,
    #[serde(default)]
    pub photos: FieldValue<RawAttachment>,
    #[serde(default)]
    pub videos: FieldValue<RawAttachment>,
    #[serde(default)]
    pub audio_files: FieldValue<RawAttachment>,
    #[serde(default)]
    pub files: FieldValue<RawAttachment>,
    #[serde(default)]
    pub gifs: FieldValue<RawAttachment>,
    #[serde(default)]
    pub sticker: Option<RawSticker>,
    #[serde(default)]
    pub share: Option<RawShare>,
    #[serde(default)]
    pub call_duration: Option<f64>,
    /// The export's own missed-call flag. The canonical record derives the
    /// missed/completed booleans from `call_duration` instead.
    #[serde(default)]
    pub missed: Option<bool>,
    #[serde(rename = "type", default)]
    pub msg_type: Option<String>,
    #[serde(default)]
    pub is_unsent: Option<bool>,
    /// Fields outside the declared shape, kept for monitoring only.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

/// One entry of a message's reaction list.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReaction {
    #[serde(default)]
    pub reaction: String,
    #[serde(default)]
    pub actor: String,
}

/// An attachment descriptor. Only its presence is counted; the URI is
/// discarded during normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAttachment {
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSticker {
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawShare {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub share_text: Option<String>,
}
