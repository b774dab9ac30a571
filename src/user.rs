//! The user-level store built by one ingestion run.
//!
//! [`User`] owns every conversation keyed by canonical title, the
//! corpus-wide [`PersonRegistry`], the ingest counters and the two
//! memoized derived views (rolling activity series, sentiment table).
//! Once returned by the reader it is immutable to callers except for the
//! memoized views, which are rebuilt on an explicit force-refresh.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset};
use serde::{Deserialize, Serialize};

use crate::analysis::sentiment::{self, SentimentScorer, SentimentTable};
use crate::analysis::timeseries::{build_activity_series, WideSeries};
use crate::config::{ActivityConfig, SentimentConfig};
use crate::convo::{Convo, Person};
use crate::error::{ConvoscopeError, Result};
use crate::linker::NameLink;

/// Best-effort counters surfaced after every run. No single bad
/// conversation aborts the batch; it lands here instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestCounters {
    /// Shard files that could not be opened or parsed.
    pub failed_shards: u32,
    /// Conversations rejected with an error (unusable title, duplicate
    /// title).
    pub failed_convos: u32,
    /// Conversations dropped as degenerate (zero readable shards or fewer
    /// than two senders).
    pub empty_convos: u32,
    /// Rows whose sender decoded to an empty string (deleted accounts).
    pub depersonalized_msgs: u32,
    /// Conversations whose title had to be synthesized from participants.
    pub blank_titles: u32,
}

/// Corpus-wide name→Person registry.
///
/// Guarantees at most one [`Person`] per distinct name so identity
/// comparisons are by key, never by re-parsing. The single
/// look-up-or-create operation is the only way in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonRegistry(BTreeMap<String, Person>);

impl PersonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a person by name, creating the entry on first sight.
    pub fn get_or_create(&mut self, name: &str) -> &Person {
        self.0
            .entry(name.to_string())
            .or_insert_with(|| Person::new(name))
    }

    /// Interns every name in the list.
    pub fn get_or_create_all(&mut self, names: &[String]) {
        for name in names {
            self.get_or_create(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.0.values()
    }
}

/// The corpus owner and everything ingested for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Configured display name of the corpus owner.
    pub name: String,
    /// Primary export root the corpus was read from.
    pub root_path: PathBuf,
    /// Corpus-wide UTC offset every timestamp was normalized to.
    pub utc_offset_secs: i32,
    /// Conversations keyed by canonical title.
    pub convos: BTreeMap<String, Convo>,
    /// Corpus-wide participant registry.
    pub persons: PersonRegistry,
    pub counters: IngestCounters,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    name_links: Option<Vec<NameLink>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    activity_cache: Option<WideSeries>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    sentiment_cache: Option<SentimentTable>,
}

impl User {
    pub fn new(name: impl Into<String>, root_path: impl AsRef<Path>, utc_offset_secs: i32) -> Self {
        Self {
            name: name.into(),
            root_path: root_path.as_ref().to_path_buf(),
            utc_offset_secs,
            convos: BTreeMap::new(),
            persons: PersonRegistry::new(),
            counters: IngestCounters::default(),
            name_links: None,
            activity_cache: None,
            sentiment_cache: None,
        }
    }

    /// The corpus time zone.
    pub fn tz(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| chrono::Utc.fix())
    }

    /// Exact-title lookup.
    pub fn get(&self, title: &str) -> Option<&Convo> {
        self.convos.get(title)
    }

    /// Adds a conversation under its canonical title.
    ///
    /// Titles are unique store keys: a collision from a second folder is
    /// rejected, never silently overwriting the first.
    pub(crate) fn insert_convo(&mut self, convo: Convo) -> Result<()> {
        if self.convos.contains_key(&convo.title) {
            return Err(ConvoscopeError::duplicate_title(convo.title));
        }
        self.convos.insert(convo.title.clone(), convo);
        Ok(())
    }

    pub(crate) fn set_name_links(&mut self, links: Vec<NameLink>) {
        self.name_links = Some(links);
    }

    /// The memoized cross-platform folder mapping, when a linked run
    /// produced one.
    pub fn name_links(&self) -> Option<&[NameLink]> {
        self.name_links.as_deref()
    }

    /// Conversations sorted descending by message count.
    ///
    /// `n` caps the result; `n == 0` returns all. Group chats can be
    /// excluded.
    pub fn ranked_by_msg_count(&self, n: usize, no_groupchats: bool) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .convos
            .values()
            .filter(|c| !(no_groupchats && c.is_group))
            .map(|c| (c.title.clone(), c.msg_count))
            .collect();

        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if n > 0 {
            counts.truncate(n);
        }
        counts
    }

    /// Conversations ranked by character-dominance ratio.
    ///
    /// `ratio = others' chars / (owner's chars × other-speaker count)`.
    /// A ratio of 1 is balanced; above 1 the others dominate, below 1 the
    /// owner does. Conversations where the owner is absent, where
    /// `msg_count ≤ min_msgs × speaker count`, or where the owner sent no
    /// characters at all are excluded entirely so tiny samples cannot
    /// produce noisy outliers. Sorted ascending unless `desc`; `n == 0`
    /// returns all.
    pub fn ranked_by_char_ratio(
        &self,
        desc: bool,
        n: usize,
        no_groupchats: bool,
        min_msgs: usize,
    ) -> Vec<(String, f64)> {
        let mut ratios: Vec<(String, f64)> = Vec::new();

        for convo in self.convos.values() {
            if !convo.speakers.iter().any(|s| *s == self.name) {
                continue;
            }
            if no_groupchats && convo.is_group {
                continue;
            }
            if convo.msg_count <= min_msgs * convo.speakers.len() {
                continue;
            }

            let owner_chars = convo.char_count_for(&self.name);
            if owner_chars == 0 {
                continue;
            }
            let others_chars = convo.char_count() - owner_chars;
            let others_count = (convo.speakers.len() - 1) as f64;
            let ratio = others_chars as f64 / (owner_chars as f64 * others_count);
            ratios.push((convo.title.clone(), ratio));
        }

        ratios.sort_by(|a, b| {
            let ord = a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0));
            if desc { ord.reverse() } else { ord }
        });
        if n > 0 {
            ratios.truncate(n);
        }
        ratios
    }

    /// The memoized rolling activity series, built on first access.
    ///
    /// The cache does not track the config it was built with; pass
    /// `force = true` after changing `cfg`.
    pub fn activity_series(&mut self, cfg: &ActivityConfig, force: bool) -> &WideSeries {
        if force || self.activity_cache.is_none() {
            self.activity_cache = Some(build_activity_series(&self.convos, cfg));
        }
        // The branch above guarantees the cache is populated
        self.activity_cache.get_or_insert_with(WideSeries::default)
    }

    /// The memoized sentiment aggregation, built on first access.
    ///
    /// The cache does not track the config it was built with; pass
    /// `force = true` after changing `cfg` or the scorer.
    pub fn sentiment_table(
        &mut self,
        scorer: &dyn SentimentScorer,
        cfg: &SentimentConfig,
        force: bool,
    ) -> &SentimentTable {
        if force || self.sentiment_cache.is_none() {
            self.sentiment_cache = Some(sentiment::build_sentiment_table(
                &self.name,
                &self.convos,
                scorer,
                cfg,
            ));
        }
        self.sentiment_cache.get_or_insert_with(|| SentimentTable {
            filter: cfg.filter,
            rows: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, Platform};
    use chrono::{DateTime, TimeZone};

    fn at(secs: i64) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .timestamp_opt(secs, 0)
            .unwrap()
    }

    fn convo_of(title: &str, rows: &[(&str, usize)]) -> Convo {
        let messages: Vec<Message> = rows
            .iter()
            .enumerate()
            .map(|(i, (sender, chars))| {
                Message::new(*sender, at(i as i64 * 60), Platform::Facebook)
                    .with_text("c".repeat(*chars))
            })
            .collect();
        Convo::new(title, true, messages).unwrap()
    }

    fn user_with(convos: Vec<Convo>) -> User {
        let mut user = User::new("Owner", "/export", 0);
        for convo in convos {
            user.persons.get_or_create_all(&convo.speakers);
            user.insert_convo(convo).unwrap();
        }
        user
    }

    #[test]
    fn test_registry_deduplicates() {
        let mut registry = PersonRegistry::new();
        registry.get_or_create("Alice");
        registry.get_or_create("Alice");
        registry.get_or_create("Bob");
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("Alice"));
    }

    #[test]
    fn test_insert_convo_rejects_duplicate_title() {
        let mut user = User::new("Owner", "/export", 0);
        user.insert_convo(convo_of("Alice", &[("Owner", 1), ("Alice", 1)]))
            .unwrap();
        let err = user
            .insert_convo(convo_of("Alice", &[("Owner", 1), ("Alice", 1)]))
            .unwrap_err();
        assert!(matches!(err, ConvoscopeError::DuplicateTitle { .. }));
    }

    #[test]
    fn test_ranked_by_msg_count() {
        let user = user_with(vec![
            convo_of("Small", &[("Owner", 1), ("A", 1)]),
            convo_of("Big", &[("Owner", 1), ("B", 1), ("Owner", 1), ("B", 1)]),
            convo_of(
                "Group",
                &[("Owner", 1), ("C", 1), ("D", 1), ("C", 1), ("D", 1), ("C", 1)],
            ),
        ]);

        let all = user.ranked_by_msg_count(0, false);
        assert_eq!(
            all,
            vec![
                ("Group".to_string(), 6),
                ("Big".to_string(), 4),
                ("Small".to_string(), 2)
            ]
        );

        let top1 = user.ranked_by_msg_count(1, false);
        assert_eq!(top1.len(), 1);

        let no_groups = user.ranked_by_msg_count(0, true);
        assert!(no_groups.iter().all(|(t, _)| t != "Group"));
    }

    #[test]
    fn test_char_ratio_arithmetic() {
        // Owner sends 1000 chars, the other side 250: ratio 0.25
        let mut rows: Vec<(&str, usize)> = Vec::new();
        for _ in 0..10 {
            rows.push(("Owner", 100));
        }
        for _ in 0..10 {
            rows.push(("Friend", 25));
        }
        let user = user_with(vec![convo_of("Friend", &rows)]);

        let ranked = user.ranked_by_char_ratio(false, 0, false, 5);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].1 - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_char_ratio_message_floor_excludes() {
        // 20 messages, 2 speakers: needs msg_count > min_msgs * 2
        let rows: Vec<(&str, usize)> = (0..20)
            .map(|i| if i % 2 == 0 { ("Owner", 10) } else { ("A", 10) })
            .collect();
        let user = user_with(vec![convo_of("A", &rows)]);

        assert!(user.ranked_by_char_ratio(false, 0, false, 10).is_empty());
        assert_eq!(user.ranked_by_char_ratio(false, 0, false, 9).len(), 1);
    }

    #[test]
    fn test_char_ratio_requires_owner() {
        let user = user_with(vec![convo_of("Others", &[("A", 50), ("B", 50)])]);
        assert!(user.ranked_by_char_ratio(false, 0, false, 0).is_empty());
    }

    #[test]
    fn test_char_ratio_sort_direction() {
        let owner_heavy: Vec<(&str, usize)> = (0..10)
            .map(|i| if i < 9 { ("Owner", 100) } else { ("A", 10) })
            .collect();
        let other_heavy: Vec<(&str, usize)> = (0..10)
            .map(|i| if i < 9 { ("B", 100) } else { ("Owner", 10) })
            .collect();
        let user = user_with(vec![
            convo_of("A", &owner_heavy),
            convo_of("B", &other_heavy),
        ]);

        let asc = user.ranked_by_char_ratio(false, 0, false, 1);
        assert_eq!(asc[0].0, "A");
        let desc = user.ranked_by_char_ratio(true, 0, false, 1);
        assert_eq!(desc[0].0, "B");
    }

    #[test]
    fn test_activity_cache_memoizes_and_force_rebuilds() {
        // 80 day-spaced messages spanning several 14-day periods
        let messages: Vec<Message> = (0..80)
            .map(|d| {
                Message::new("A", at(i64::from(d) * 86_400), Platform::Facebook).with_text("xx")
            })
            .chain(std::iter::once(
                Message::new("Owner", at(0), Platform::Facebook).with_text("x"),
            ))
            .collect();
        let mut user = user_with(vec![Convo::new("A", true, messages).unwrap()]);

        let cfg = ActivityConfig::default();
        let first = user.activity_series(&cfg, false).clone();
        assert!(first.is_empty()); // under the 100-message floor

        // Cached: a config change without force is ignored
        let looser = ActivityConfig::default().with_min_msgs(1);
        let cached = user.activity_series(&looser, false).clone();
        assert_eq!(first, cached);

        let rebuilt = user.activity_series(&looser, true).clone();
        assert!(!rebuilt.is_empty());
    }
}
