//! Rolling activity time series.
//!
//! Resamples each conversation's character counts into fixed-length
//! periods anchored at the Unix epoch (so bucket boundaries are
//! reproducible run to run), applies a trailing moving average, and joins
//! all conversations into one wide, zero-filled table indexed by period
//! end. Conversations under the message floor are skipped entirely.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::config::ActivityConfig;
use crate::convo::Convo;

/// Returns the right edge of the fixed-length period containing `ts`.
///
/// Periods are anchored at the Unix epoch so that bucket boundaries are
/// reproducible across runs regardless of when a conversation starts.
pub fn bucket_end(ts: DateTime<FixedOffset>, period: Duration) -> DateTime<FixedOffset> {
    let secs = period.num_seconds().max(1);
    let idx = ts.timestamp().div_euclid(secs);
    ts + Duration::seconds((idx + 1) * secs - ts.timestamp())
}

/// One conversation's column of the wide activity table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesColumn {
    pub name: String,
    /// One value per index entry; 0.0 where the conversation had no
    /// activity in that period.
    pub values: Vec<f64>,
}

/// Wide table of smoothed per-period character counts, one column per
/// conversation, outer-joined on period end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WideSeries {
    /// Ascending period-end labels.
    pub index: Vec<DateTime<FixedOffset>>,
    pub columns: Vec<SeriesColumn>,
}

impl WideSeries {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Looks up one conversation's column by (possibly truncated) name.
    pub fn column(&self, name: &str) -> Option<&SeriesColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Builds the wide activity table over every qualifying conversation.
pub fn build_activity_series<'a, I>(convos: I, cfg: &ActivityConfig) -> WideSeries
where
    I: IntoIterator<Item = (&'a String, &'a Convo)>,
{
    let period = Duration::days(cfg.period_days);
    // Expand the fetch window backward so the moving average is fully
    // warmed up before the visible start.
    let fetch_start = cfg.start.map(|s| s - period * (cfg.window as i32) * 2);

    let mut columns: Vec<(String, BTreeMap<DateTime<FixedOffset>, f64>)> = Vec::new();

    for (title, convo) in convos {
        let in_window = |ts: DateTime<FixedOffset>| {
            fetch_start.map_or(true, |fs| ts >= fs) && cfg.end.map_or(true, |e| ts <= e)
        };
        let msgs: Vec<_> = convo
            .messages
            .iter()
            .filter(|m| in_window(m.timestamp))
            .collect();
        if msgs.len() < cfg.min_msgs {
            continue;
        }

        // Period sums on a continuous index
        let mut sums: BTreeMap<DateTime<FixedOffset>, f64> = BTreeMap::new();
        for m in &msgs {
            *sums.entry(bucket_end(m.timestamp, period)).or_insert(0.0) +=
                f64::from(m.text_len);
        }
        let Some((&first, _)) = sums.iter().next() else {
            continue;
        };
        let Some((&last, _)) = sums.iter().next_back() else {
            continue;
        };
        let mut index = Vec::new();
        let mut cursor = first;
        while cursor <= last {
            index.push(cursor);
            cursor += period;
        }
        let raw: Vec<f64> = index.iter().map(|t| sums.get(t).copied().unwrap_or(0.0)).collect();

        // Trailing moving average; the first window-1 periods have no value
        let smoothed: Vec<Option<f64>> = if cfg.window > 1 {
            (0..raw.len())
                .map(|i| {
                    (i + 1 >= cfg.window).then(|| {
                        raw[i + 1 - cfg.window..=i].iter().sum::<f64>() / cfg.window as f64
                    })
                })
                .collect()
        } else {
            raw.iter().copied().map(Some).collect()
        };

        // Trim the warm-up region
        let cutoff = match cfg.start {
            Some(start) => start,
            None => first + period * (cfg.window as i32),
        };
        let mut column: BTreeMap<DateTime<FixedOffset>, f64> = BTreeMap::new();
        for (t, v) in index.iter().zip(&smoothed) {
            if *t >= cutoff {
                column.insert(*t, v.unwrap_or(0.0));
            }
        }
        if !column.is_empty() {
            columns.push((truncate_label(title, cfg.name_limit), column));
        }
    }

    // Outer join on the union of period ends, zero-filling gaps
    let joined_index: BTreeSet<DateTime<FixedOffset>> =
        columns.iter().flat_map(|(_, c)| c.keys().copied()).collect();
    let index: Vec<DateTime<FixedOffset>> = joined_index.into_iter().collect();

    let columns = columns
        .into_iter()
        .map(|(name, col)| SeriesColumn {
            name,
            values: index.iter().map(|t| col.get(t).copied().unwrap_or(0.0)).collect(),
        })
        .collect();

    WideSeries { index, columns }
}

/// Caps conversation names so downstream axis labels stay readable.
fn truncate_label(name: &str, limit: usize) -> String {
    if name.chars().count() < limit {
        name.to_string()
    } else {
        let mut label: String = name.chars().take(limit).collect();
        label.push_str(" ...");
        label
    }
}
