//! Canonical message record.
//!
//! This module provides [`Message`], the normalized representation every
//! downstream component consumes. The raw per-platform shard shapes are
//! reduced to this fixed column set by the normalizer: text re-encoded,
//! reactions flattened to per-actor entries, media lists collapsed to
//! counts, call outcomes derived.
//!
//! # Examples
//!
//! ```
//! use chrono::{FixedOffset, TimeZone};
//! use convoscope::message::{Message, Platform};
//!
//! let tz = FixedOffset::east_opt(0).unwrap();
//! let ts = tz.with_ymd_and_hms(2021, 4, 26, 21, 15, 0).unwrap();
//!
//! let msg = Message::new("Alice", ts, Platform::Facebook).with_text("hello there");
//! assert_eq!(msg.text_len, 11);
//! assert_eq!(msg.hour_of_day, 21);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

/// Source platform of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    Facebook,
    Instagram,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Facebook => write!(f, "Facebook"),
            Platform::Instagram => write!(f, "Instagram"),
        }
    }
}

/// A normalized message, one row of a conversation's table.
///
/// Invariants upheld by construction:
/// - `sender` and `timestamp` are always present (rows without a usable
///   timestamp are skipped during normalization)
/// - `text_len` is the character count of `text`, or 0 when absent
/// - `missed_call` ⟺ a call duration is present and exactly zero;
///   `completed_call` ⟺ present and positive
/// - reaction keys are `<actor, lower-cased, spaces→underscores>_reactions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Display name of the message author; relabeled for depersonalized
    /// senders by the assembler.
    pub sender: String,

    /// Absolute instant, normalized to the corpus-wide fixed offset.
    pub timestamp: DateTime<FixedOffset>,

    /// Message body, absent for pure media/call rows.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,

    /// Character count of `text`, 0 when the body is absent.
    pub text_len: u32,

    /// Sparse per-actor reaction marks: column name → emoji.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub reactions: BTreeMap<String, String>,

    pub photos: u32,
    pub videos: u32,
    pub audio_files: u32,
    pub files: u32,
    pub gifs: u32,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub share_link: Option<String>,
    pub has_sticker: bool,

    /// Call length in seconds; minutes-based reporting is a presentation
    /// concern and never stored here.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub call_duration: Option<f64>,
    pub missed_call: bool,
    pub completed_call: bool,

    pub platform: Platform,

    /// Hour of day (0-23) in the corpus time zone.
    pub hour_of_day: u8,
}

impl Message {
    /// Creates a message with no text, media or call payload.
    pub fn new(
        sender: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
        platform: Platform,
    ) -> Self {
        Self {
            sender: sender.into(),
            timestamp,
            text: None,
            text_len: 0,
            reactions: BTreeMap::new(),
            photos: 0,
            videos: 0,
            audio_files: 0,
            files: 0,
            gifs: 0,
            share_link: None,
            has_sticker: false,
            call_duration: None,
            missed_call: false,
            completed_call: false,
            platform,
            hour_of_day: timestamp.hour() as u8,
        }
    }

    /// Builder method to set the body; keeps `text_len` consistent.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text_len = text.chars().count() as u32;
        self.text = Some(text);
        self
    }

    /// Builder method to set the call duration; derives the call outcome
    /// booleans.
    #[must_use]
    pub fn with_call_duration(mut self, seconds: f64) -> Self {
        self.call_duration = Some(seconds);
        self.missed_call = seconds == 0.0;
        self.completed_call = seconds > 0.0;
        self
    }

    /// Builder method to add one reactor's mark.
    #[must_use]
    pub fn with_reaction(mut self, column: impl Into<String>, emoji: impl Into<String>) -> Self {
        self.reactions.insert(column.into(), emoji.into());
        self
    }

    /// Total number of media attachments on this row.
    pub fn media_count(&self) -> u32 {
        self.photos + self.videos + self.audio_files + self.files + self.gifs
    }
}
