//! Conversation and participant types.
//!
//! A [`Convo`] owns one ordered message table plus the metadata derived at
//! assembly time: participant set, group/active flags, start time and the
//! optional top-contributor subset used to scope visualizations of very
//! large group chats. Conversations are never mutated after ingestion.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::analysis::timeseries::bucket_end;
use crate::classify::GenderGuess;
use crate::message::Message;

/// Distinct-speaker count above which the top-contributor subset is
/// recorded for visualization scoping.
pub const TOP_CONTRIBUTOR_THRESHOLD: usize = 8;

/// A participant. One instance exists per distinct name corpus-wide; the
/// registry on the user store guarantees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One conversation: an ordered message table plus derived metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Convo {
    /// Canonical title; non-empty, unique across the store.
    pub title: String,
    /// Sorted distinct sender names; keys into the user store's registry.
    pub speakers: Vec<String>,
    /// Whether the corpus owner is still a member of the thread.
    pub is_active: bool,
    /// Derived from participant cardinality: more than two distinct
    /// senders, not the export's own thread-type flag.
    pub is_group: bool,
    pub start_time: DateTime<FixedOffset>,
    pub msg_count: usize,
    /// Rows in ascending timestamp order.
    pub messages: Vec<Message>,
    /// Top senders by message count, recorded only when the speaker count
    /// exceeds [`TOP_CONTRIBUTOR_THRESHOLD`].
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub top_contributors: Option<Vec<String>>,
    /// Gender guess for the counterpart of a dyadic conversation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub counterpart_gender: Option<GenderGuess>,
}

impl Convo {
    /// Builds a conversation from an already-normalized message list.
    ///
    /// Sorts rows by timestamp, derives the speaker set, the group flag and
    /// the start time. Returns `None` for an empty message list.
    pub fn new(title: impl Into<String>, is_active: bool, mut messages: Vec<Message>) -> Option<Self> {
        messages.sort_by_key(|m| m.timestamp);
        let start_time = messages.first()?.timestamp;

        let mut speakers: Vec<String> = messages.iter().map(|m| m.sender.clone()).collect();
        speakers.sort();
        speakers.dedup();

        let top_contributors = (speakers.len() > TOP_CONTRIBUTOR_THRESHOLD)
            .then(|| top_senders_by_count(&messages, &speakers, TOP_CONTRIBUTOR_THRESHOLD));

        Some(Self {
            title: title.into(),
            is_group: speakers.len() > 2,
            speakers,
            is_active,
            start_time,
            msg_count: messages.len(),
            messages,
            top_contributors,
            counterpart_gender: None,
        })
    }

    /// The non-owner side of a dyadic conversation, if there is exactly one.
    pub fn counterpart(&self, owner: &str) -> Option<&str> {
        if self.is_group {
            return None;
        }
        let mut others = self.speakers.iter().filter(|s| *s != owner);
        let first = others.next()?;
        others.next().is_none().then(|| first.as_str())
    }

    /// Total characters sent across all rows.
    pub fn char_count(&self) -> u64 {
        self.messages.iter().map(|m| u64::from(m.text_len)).sum()
    }

    /// Characters sent by one participant.
    pub fn char_count_for(&self, sender: &str) -> u64 {
        self.messages
            .iter()
            .filter(|m| m.sender == sender)
            .map(|m| u64::from(m.text_len))
            .sum()
    }

    /// Per-sender aggregate counts over the whole table.
    pub fn counts_by_sender(&self) -> Vec<SenderCounts> {
        let mut rows: Vec<SenderCounts> = self
            .speakers
            .iter()
            .map(|s| SenderCounts::new(s.clone()))
            .collect();

        for msg in &self.messages {
            let Some(row) = rows.iter_mut().find(|r| r.sender == msg.sender) else {
                continue;
            };
            row.messages += 1;
            row.characters += u64::from(msg.text_len);
            row.photos += u64::from(msg.photos);
            row.videos += u64::from(msg.videos);
            row.gifs += u64::from(msg.gifs);
            row.files += u64::from(msg.files);
            row.voice_memos += u64::from(msg.audio_files);
            row.stickers += u64::from(msg.has_sticker);
            row.links += u64::from(msg.share_link.is_some());
            row.completed_calls += u64::from(msg.completed_call);
            row.missed_calls += u64::from(msg.missed_call);
            row.reactions_received += msg.reactions.len() as u64;
        }

        rows
    }

    /// Message counts per hour of day: 24 rows, one column per sender.
    pub fn msg_counts_by_hour(&self) -> HourTable {
        let mut counts = vec![[0u64; 24]; self.speakers.len()];
        for msg in &self.messages {
            if let Some(idx) = self.speakers.iter().position(|s| *s == msg.sender) {
                counts[idx][usize::from(msg.hour_of_day.min(23))] += 1;
            }
        }
        HourTable {
            senders: self.speakers.clone(),
            counts,
        }
    }

    /// Per-sender weekly character sums, epoch-anchored 7-day buckets
    /// labeled by their right edge.
    pub fn weekly_char_counts(&self) -> Vec<SenderWeekly> {
        let week = chrono::Duration::days(7);
        self.speakers
            .iter()
            .map(|sender| {
                let mut points: Vec<(DateTime<FixedOffset>, u64)> = Vec::new();
                for msg in self.messages.iter().filter(|m| m.sender == *sender) {
                    let end = bucket_end(msg.timestamp, week);
                    match points.last_mut() {
                        Some((last, sum)) if *last == end => *sum += u64::from(msg.text_len),
                        _ => points.push((end, u64::from(msg.text_len))),
                    }
                }
                SenderWeekly {
                    sender: sender.clone(),
                    points,
                }
            })
            .collect()
    }
}

fn top_senders_by_count(messages: &[Message], speakers: &[String], n: usize) -> Vec<String> {
    let mut counts: Vec<(usize, &String)> = speakers
        .iter()
        .map(|s| (messages.iter().filter(|m| m.sender == *s).count(), s))
        .collect();
    counts.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    counts.into_iter().take(n).map(|(_, s)| s.clone()).collect()
}

/// Aggregate counts for one sender within one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderCounts {
    pub sender: String,
    pub messages: u64,
    pub characters: u64,
    pub photos: u64,
    pub videos: u64,
    pub gifs: u64,
    pub files: u64,
    pub voice_memos: u64,
    pub stickers: u64,
    pub links: u64,
    pub completed_calls: u64,
    pub missed_calls: u64,
    pub reactions_received: u64,
}

impl SenderCounts {
    fn new(sender: String) -> Self {
        Self {
            sender,
            ..Self::default()
        }
    }
}

/// Message counts for each hour of the day and sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourTable {
    pub senders: Vec<String>,
    /// One 24-slot array per sender, indexed by hour.
    pub counts: Vec<[u64; 24]>,
}

impl HourTable {
    /// One row of the 24-row view: every sender's count for `hour`.
    pub fn row(&self, hour: usize) -> Vec<u64> {
        self.counts.iter().map(|per_sender| per_sender[hour]).collect()
    }
}

/// Weekly character sums for one sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderWeekly {
    pub sender: String,
    pub points: Vec<(DateTime<FixedOffset>, u64)>,
}

impl fmt::Display for Convo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Conversation Name: {}", self.title)?;
        writeln!(f, "Participants: {}", self.speakers.join(", "))?;
        writeln!(f)?;
        for row in self.counts_by_sender() {
            writeln!(
                f,
                "{}: {} messages, {} characters, {} photos, {} videos, {} voice memos, \
                 {} successful calls, {} missed calls",
                row.sender,
                row.messages,
                row.characters,
                row.photos,
                row.videos,
                row.voice_memos,
                row.completed_calls,
                row.missed_calls,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Platform;
    use chrono::TimeZone;

    fn ts(day: u32, hour: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2021, 3, day, hour, 0, 0)
            .unwrap()
    }

    fn msg(sender: &str, day: u32, hour: u32, text: &str) -> Message {
        Message::new(sender, ts(day, hour), Platform::Facebook).with_text(text)
    }

    #[test]
    fn test_new_sorts_and_derives() {
        let convo = Convo::new(
            "Alice",
            true,
            vec![
                msg("Alice", 2, 10, "later"),
                msg("Bob", 1, 9, "first"),
                msg("Alice", 3, 23, "last"),
            ],
        )
        .unwrap();

        assert_eq!(convo.msg_count, 3);
        assert_eq!(convo.speakers, vec!["Alice", "Bob"]);
        assert!(!convo.is_group);
        assert_eq!(convo.start_time, ts(1, 9));
        assert!(convo.messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(convo.top_contributors.is_none());
    }

    #[test]
    fn test_empty_message_list_yields_none() {
        assert!(Convo::new("x", true, Vec::new()).is_none());
    }

    #[test]
    fn test_group_flag_from_cardinality() {
        let two = Convo::new(
            "t",
            true,
            vec![msg("A", 1, 1, "x"), msg("B", 1, 2, "y")],
        )
        .unwrap();
        assert!(!two.is_group);

        let three = Convo::new(
            "t",
            true,
            vec![msg("A", 1, 1, "x"), msg("B", 1, 2, "y"), msg("C", 1, 3, "z")],
        )
        .unwrap();
        assert!(three.is_group);
    }

    #[test]
    fn test_counterpart() {
        let convo = Convo::new(
            "t",
            true,
            vec![msg("Owner", 1, 1, "x"), msg("Charlie Nguyen", 1, 2, "y")],
        )
        .unwrap();
        assert_eq!(convo.counterpart("Owner"), Some("Charlie Nguyen"));
        assert_eq!(convo.counterpart("Charlie Nguyen"), Some("Owner"));
    }

    #[test]
    fn test_counts_by_sender() {
        let mut call = Message::new("Bob", ts(1, 4), Platform::Facebook).with_call_duration(0.0);
        call.photos = 2;
        let convo = Convo::new(
            "t",
            true,
            vec![msg("Alice", 1, 1, "hello"), msg("Alice", 1, 2, "you"), call],
        )
        .unwrap();

        let rows = convo.counts_by_sender();
        let alice = rows.iter().find(|r| r.sender == "Alice").unwrap();
        assert_eq!(alice.messages, 2);
        assert_eq!(alice.characters, 8);
        let bob = rows.iter().find(|r| r.sender == "Bob").unwrap();
        assert_eq!(bob.missed_calls, 1);
        assert_eq!(bob.photos, 2);
    }

    #[test]
    fn test_hour_table_shape() {
        let convo = Convo::new(
            "t",
            true,
            vec![msg("A", 1, 9, "x"), msg("A", 2, 9, "y"), msg("B", 1, 23, "z")],
        )
        .unwrap();
        let table = convo.msg_counts_by_hour();
        assert_eq!(table.senders, vec!["A", "B"]);
        assert_eq!(table.counts[0][9], 2);
        assert_eq!(table.counts[1][23], 1);
        assert_eq!(table.row(9), vec![2, 0]);
        assert_eq!(table.row(0), vec![0, 0]);
    }

    #[test]
    fn test_weekly_char_counts_accumulate() {
        let convo = Convo::new(
            "t",
            true,
            vec![
                msg("A", 1, 1, "aa"),
                msg("A", 2, 1, "bbb"),
                msg("A", 20, 1, "cccc"),
                msg("B", 1, 1, "d"),
            ],
        )
        .unwrap();
        let weekly = convo.weekly_char_counts();
        let a = weekly.iter().find(|w| w.sender == "A").unwrap();
        // 1st and 2nd of March 2021 share an epoch-anchored week
        assert_eq!(a.points[0].1, 5);
        assert_eq!(a.points.last().unwrap().1, 4);
    }

    #[test]
    fn test_top_contributors_recorded_for_large_groups() {
        let mut messages = Vec::new();
        for (i, name) in ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"]
            .iter()
            .enumerate()
        {
            // sender i sends i+1 messages so the ordering is deterministic
            for j in 0..=i {
                messages.push(msg(name, 1 + j as u32, i as u32, "m"));
            }
        }
        let convo = Convo::new("big", true, messages).unwrap();
        assert!(convo.is_group);
        let top = convo.top_contributors.unwrap();
        assert_eq!(top.len(), TOP_CONTRIBUTOR_THRESHOLD);
        assert_eq!(top[0], "J");
        assert!(!top.contains(&"A".to_string()));
    }
}
