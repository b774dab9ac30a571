//! Per-period sentiment aggregation.
//!
//! The sentiment model is an external collaborator consumed through the
//! [`SentimentScorer`] trait: text in, four scores out. This module owns
//! everything around it — concatenating message text into per-sender
//! period buckets, the character floor, the owner-regularity gate that
//! marks conversations as excluded from cross-conversation ranking, and
//! the population-vs-sample comparison built on
//! [`ks_2samp`](super::stats::ks_2samp).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use super::stats::ks_2samp;
use super::timeseries::bucket_end;
use crate::config::SentimentConfig;
use crate::convo::Convo;

/// The four sentiment dimensions every scorer reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    Positive,
    Negative,
    Neutral,
    Compound,
}

/// All dimensions, in reporting order.
pub const DIMENSIONS: [Dimension; 4] = [
    Dimension::Positive,
    Dimension::Negative,
    Dimension::Neutral,
    Dimension::Compound,
];

/// One scoring result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub pos: f64,
    pub neg: f64,
    pub neu: f64,
    pub compound: f64,
}

impl SentimentScores {
    pub fn dimension(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Positive => self.pos,
            Dimension::Negative => self.neg,
            Dimension::Neutral => self.neu,
            Dimension::Compound => self.compound,
        }
    }
}

/// Black-box sentiment model: text → four scores.
pub trait SentimentScorer {
    fn score(&self, text: &str) -> SentimentScores;
}

/// Whose text feeds the aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenderFilter {
    /// Only the corpus owner's sent text.
    OwnerOnly,
    /// Everyone's text except the owner's.
    OthersOnly,
}

/// One scored period bucket for one sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentBucket {
    pub period_end: DateTime<FixedOffset>,
    pub sender: String,
    /// Characters of concatenated text that were scored.
    pub chars: u64,
    pub scores: SentimentScores,
}

/// One conversation's sentiment series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvoSentiment {
    pub title: String,
    pub buckets: Vec<SentimentBucket>,
    /// Periods in which the owner cleared the character floor.
    pub owner_periods: usize,
    /// Below the minimum-periods gate: kept out of cross-conversation
    /// ranking while still contributing to the population baseline.
    pub excluded: bool,
}

/// The memoized corpus-wide sentiment aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentTable {
    pub filter: SenderFilter,
    pub rows: Vec<ConvoSentiment>,
}

/// How a conversation's weighted mean sits against the population's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Above,
    Below,
    Even,
}

/// One dimension's comparison outcome for one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonCell {
    /// Character-weighted mean of the conversation's bucket scores.
    pub weighted_mean: f64,
    /// Character-weighted mean over every other conversation's buckets.
    pub population_mean: f64,
    pub statistic: f64,
    pub p_value: f64,
    pub significant: bool,
    pub direction: Direction,
}

/// Per-conversation comparison against the rest of the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub title: String,
    pub cells: BTreeMap<Dimension, ComparisonCell>,
}

/// Builds the sentiment table over every qualifying conversation.
///
/// Conversations qualify when the owner participates, the message count
/// clears the floor and (optionally) the conversation is not a group
/// chat. Within each one, non-empty message text is concatenated per
/// sender into epoch-anchored period buckets; buckets under the character
/// floor are discarded before scoring.
pub fn build_sentiment_table(
    owner: &str,
    convos: &BTreeMap<String, Convo>,
    scorer: &dyn SentimentScorer,
    cfg: &SentimentConfig,
) -> SentimentTable {
    let period = Duration::days(cfg.period_days);
    let mut rows = Vec::new();

    for (title, convo) in convos {
        if !convo.speakers.iter().any(|s| s.as_str() == owner) {
            continue;
        }
        if convo.msg_count < cfg.min_msgs {
            continue;
        }
        if cfg.no_groupchats && convo.is_group {
            continue;
        }

        // Concatenate non-empty text per (sender, period)
        let mut concat: BTreeMap<(String, DateTime<FixedOffset>), String> = BTreeMap::new();
        for msg in &convo.messages {
            let Some(text) = msg.text.as_deref() else {
                continue;
            };
            if text.is_empty() {
                continue;
            }
            let key = (msg.sender.clone(), bucket_end(msg.timestamp, period));
            let entry = concat.entry(key).or_default();
            if !entry.is_empty() {
                entry.push(' ');
            }
            entry.push_str(text);
        }

        // The owner must have texted regularly enough for this
        // conversation to be rankable, whichever filter is active
        let owner_periods = concat
            .iter()
            .filter(|((sender, _), text)| {
                sender.as_str() == owner && text.chars().count() >= cfg.min_chars
            })
            .count();

        let buckets: Vec<SentimentBucket> = concat
            .into_iter()
            .filter(|((sender, _), _)| match cfg.filter {
                SenderFilter::OwnerOnly => sender.as_str() == owner,
                SenderFilter::OthersOnly => sender.as_str() != owner,
            })
            .filter_map(|((sender, period_end), text)| {
                let chars = text.chars().count() as u64;
                (chars >= cfg.min_chars as u64).then(|| SentimentBucket {
                    period_end,
                    sender,
                    chars,
                    scores: scorer.score(&text),
                })
            })
            .collect();

        rows.push(ConvoSentiment {
            title: title.clone(),
            buckets,
            owner_periods,
            excluded: owner_periods < cfg.min_periods,
        });
    }

    SentimentTable {
        filter: cfg.filter,
        rows,
    }
}

impl SentimentTable {
    /// Compares every rankable conversation against the rest of the corpus.
    ///
    /// Excluded conversations get no row of their own but still feed every
    /// other conversation's population sample. `alpha` is the significance
    /// level for the two-sided test.
    pub fn population_comparison(&self, alpha: f64) -> Vec<ComparisonRow> {
        let mut out = Vec::new();

        for row in self.rows.iter().filter(|r| !r.excluded) {
            let mut cells = BTreeMap::new();

            for dim in DIMENSIONS {
                let sample: Vec<f64> =
                    row.buckets.iter().map(|b| b.scores.dimension(dim)).collect();
                let population: Vec<f64> = self
                    .rows
                    .iter()
                    .filter(|r| r.title != row.title)
                    .flat_map(|r| r.buckets.iter())
                    .map(|b| b.scores.dimension(dim))
                    .collect();

                let Some(ks) = ks_2samp(&sample, &population) else {
                    continue;
                };

                let sample_mean = weighted_mean(row.buckets.iter(), dim);
                let population_mean = weighted_mean(
                    self.rows
                        .iter()
                        .filter(|r| r.title != row.title)
                        .flat_map(|r| r.buckets.iter()),
                    dim,
                );
                let direction = if sample_mean > population_mean {
                    Direction::Above
                } else if sample_mean < population_mean {
                    Direction::Below
                } else {
                    Direction::Even
                };

                cells.insert(
                    dim,
                    ComparisonCell {
                        weighted_mean: sample_mean,
                        population_mean,
                        statistic: ks.statistic,
                        p_value: ks.p_value,
                        significant: ks.p_value < alpha,
                        direction,
                    },
                );
            }

            if !cells.is_empty() {
                out.push(ComparisonRow {
                    title: row.title.clone(),
                    cells,
                });
            }
        }

        out
    }
}

fn weighted_mean<'a, I>(buckets: I, dim: Dimension) -> f64
where
    I: Iterator<Item = &'a SentimentBucket>,
{
    let mut score_sum = 0.0;
    let mut weight_sum = 0.0;
    for bucket in buckets {
        score_sum += bucket.scores.dimension(dim) * bucket.chars as f64;
        weight_sum += bucket.chars as f64;
    }
    if weight_sum == 0.0 {
        0.0
    } else {
        score_sum / weight_sum
    }
}
