//! Configuration types for ingestion and the derived views.
//!
//! Plain data structs with `Default` + builder methods. The reader's
//! collaborators (progress callback, sentiment scorer, name classifier)
//! are not configuration and are attached to the
//! [`ConvoReader`](crate::reader::ConvoReader) directly.
//!
//! # Example
//!
//! ```rust
//! use convoscope::config::ReaderConfig;
//!
//! let config = ReaderConfig::new("Alice Smith", "raw_data/extract-2021-04-26")
//!     .with_utc_offset_secs(0);
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local, Offset};
use serde::{Deserialize, Serialize};

use crate::analysis::sentiment::SenderFilter;

/// Configuration for one ingestion run.
///
/// A run covers one primary export root and optionally a secondary
/// platform's root, cross-linked via folder-name matching plus an optional
/// manual override table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Display name of the corpus owner.
    pub user_name: String,

    /// Primary (Facebook-style) export root.
    pub root: PathBuf,

    /// Secondary (Instagram-style) export root, if any.
    pub secondary_root: Option<PathBuf>,

    /// CSV of manual folder-name pairs overriding the automatic
    /// cross-platform match.
    pub overrides_path: Option<PathBuf>,

    /// Corpus-wide UTC offset in seconds. Every timestamp is normalized to
    /// this one offset; defaults to the machine's local offset at
    /// construction time. A documented approximation, since the export has
    /// no per-message time zone.
    pub utc_offset_secs: i32,
}

impl ReaderConfig {
    /// Creates a configuration for a single-platform run.
    pub fn new(user_name: impl Into<String>, root: impl AsRef<Path>) -> Self {
        Self {
            user_name: user_name.into(),
            root: root.as_ref().to_path_buf(),
            secondary_root: None,
            overrides_path: None,
            utc_offset_secs: Local::now().offset().fix().local_minus_utc(),
        }
    }

    /// Adds a secondary platform root to cross-link against.
    #[must_use]
    pub fn with_secondary_root(mut self, root: impl AsRef<Path>) -> Self {
        self.secondary_root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Sets the manual override table for cross-platform matching.
    #[must_use]
    pub fn with_overrides(mut self, path: impl AsRef<Path>) -> Self {
        self.overrides_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Pins the corpus time zone; useful for deterministic tests.
    #[must_use]
    pub fn with_utc_offset_secs(mut self, secs: i32) -> Self {
        self.utc_offset_secs = secs;
        self
    }

    /// The corpus time zone as a chrono offset.
    pub fn tz(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| chrono::Utc.fix())
    }
}

/// Configuration for the rolling activity series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Length of one resampling period in days (default: 14).
    pub period_days: i64,

    /// Trailing moving-average window in periods (default: 3). A window of
    /// 1 disables smoothing.
    pub window: usize,

    /// Clip the visible series to start here; the fetch window expands
    /// backward by `window × period × 2` so the average is warmed up.
    pub start: Option<DateTime<FixedOffset>>,

    /// Clip the series to end here.
    pub end: Option<DateTime<FixedOffset>>,

    /// Conversations with fewer messages in the fetch window are skipped
    /// (default: 100).
    pub min_msgs: usize,

    /// Conversation names longer than this are truncated for axis labels
    /// (default: 32).
    pub name_limit: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            period_days: 14,
            window: 3,
            start: None,
            end: None,
            min_msgs: 100,
            name_limit: 32,
        }
    }
}

impl ActivityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resampling period length.
    #[must_use]
    pub fn with_period_days(mut self, days: i64) -> Self {
        self.period_days = days;
        self
    }

    /// Sets the moving-average window.
    #[must_use]
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    /// Clips the visible range to start here.
    #[must_use]
    pub fn with_start(mut self, start: DateTime<FixedOffset>) -> Self {
        self.start = Some(start);
        self
    }

    /// Clips the visible range to end here.
    #[must_use]
    pub fn with_end(mut self, end: DateTime<FixedOffset>) -> Self {
        self.end = Some(end);
        self
    }

    /// Sets the per-conversation message floor.
    #[must_use]
    pub fn with_min_msgs(mut self, min_msgs: usize) -> Self {
        self.min_msgs = min_msgs;
        self
    }
}

/// Configuration for the sentiment aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// Length of one period bucket in days (default: 14).
    pub period_days: i64,

    /// Conversations with fewer total messages are skipped (default: 100).
    pub min_msgs: usize,

    /// Period buckets with fewer concatenated characters are discarded
    /// before scoring (default: 200).
    pub min_chars: usize,

    /// Conversations where the owner clears the character floor in fewer
    /// periods than this are flagged excluded from ranking (default: 10).
    pub min_periods: usize,

    /// Whose text feeds the table (default: the owner's own).
    pub filter: SenderFilter,

    /// Skip group chats (default: true).
    pub no_groupchats: bool,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            period_days: 14,
            min_msgs: 100,
            min_chars: 200,
            min_periods: 10,
            filter: SenderFilter::OwnerOnly,
            no_groupchats: true,
        }
    }
}

impl SentimentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the period bucket length.
    #[must_use]
    pub fn with_period_days(mut self, days: i64) -> Self {
        self.period_days = days;
        self
    }

    /// Sets the per-bucket character floor.
    #[must_use]
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Sets the owner-periods gate.
    #[must_use]
    pub fn with_min_periods(mut self, min_periods: usize) -> Self {
        self.min_periods = min_periods;
        self
    }

    /// Selects whose text feeds the table.
    #[must_use]
    pub fn with_filter(mut self, filter: SenderFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Includes or excludes group chats.
    #[must_use]
    pub fn with_groupchats(mut self, include: bool) -> Self {
        self.no_groupchats = !include;
        self
    }
}
