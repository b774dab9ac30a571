//! # Convoscope
//!
//! A Rust library for turning a personal Messenger/Instagram data export
//! into a normalized, queryable message corpus.
//!
//! ## Overview
//!
//! A platform export is a tree of per-conversation folders, each holding
//! one or more numbered JSON shards full of messy, inconsistently shaped
//! records: mis-encoded text, reaction lists, media lists that may be
//! absent or scalar, call rows. Convoscope ingests that tree into a
//! [`User`] store of well-typed conversations and derives the views a
//! report layer needs:
//!
//! - rankings by message count and by character-dominance ratio
//! - rolling activity time series across conversations
//! - per-period sentiment aggregation with a population comparison
//! - per-conversation hour-of-day and weekly tables
//!
//! Two platform exports can be ingested in one run; folders describing
//! the same real-world relationship are matched by name and merged.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use convoscope::config::ReaderConfig;
//! use convoscope::reader::ConvoReader;
//!
//! fn main() -> convoscope::Result<()> {
//!     let config = ReaderConfig::new("Alice Smith", "raw_data/extract-2021-04-26")
//!         .with_secondary_root("raw_data/instagram-2021-04-26");
//!     let user = ConvoReader::new(config).read_corpus()?;
//!
//!     for (title, count) in user.ranked_by_msg_count(10, true) {
//!         println!("{title}: {count}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Snapshots
//!
//! A successful run can be persisted and reloaded so the export tree is
//! only walked once:
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use convoscope::config::ReaderConfig;
//! use convoscope::reader::ConvoReader;
//! use convoscope::snapshot;
//!
//! # fn main() -> convoscope::Result<()> {
//! let config = ReaderConfig::new("Alice Smith", "raw_data/extract-2021-04-26");
//! let user = snapshot::load_or_rebuild(Path::new("cache"), || {
//!     ConvoReader::new(config).read_corpus()
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - [`reader`] — corpus orchestrator ([`ConvoReader`](reader::ConvoReader))
//! - [`assemble`] — per-conversation shard merging and cleaning
//! - [`normalize`] — raw record → canonical record
//! - [`parsing`] — raw shard shapes, Mojibake repair
//! - [`linker`] — cross-platform folder matching
//! - [`convo`] / [`user`] — the ingested object model
//! - [`analysis`] — rankings' backing views: activity series, sentiment,
//!   the two-sample test
//! - [`snapshot`] — persist/reload the store
//! - [`config`] — builder-style configuration
//! - [`classify`] / [`analysis::sentiment::SentimentScorer`] — collaborator
//!   seams
//! - [`error`] — unified error type ([`ConvoscopeError`], [`Result`])

pub mod analysis;
pub mod assemble;
pub mod classify;
pub mod config;
pub mod convo;
pub mod error;
pub mod linker;
pub mod message;
pub mod normalize;
pub mod parsing;
pub mod progress;
pub mod reader;
pub mod snapshot;
pub mod user;

// Re-export the main types at the crate root for convenience
pub use error::{ConvoscopeError, Result};
pub use message::Message;
pub use user::User;

/// Convenient re-exports for common usage.
///
/// Import everything you need with a single line:
///
/// ```rust
/// use convoscope::prelude::*;
/// ```
pub mod prelude {
    pub use crate::analysis::sentiment::{
        SenderFilter, SentimentScorer, SentimentScores, SentimentTable,
    };
    pub use crate::analysis::timeseries::WideSeries;
    pub use crate::assemble::Assembled;
    pub use crate::classify::{Gender, GenderGuess, NameClassifier};
    pub use crate::config::{ActivityConfig, ReaderConfig, SentimentConfig};
    pub use crate::convo::{Convo, Person};
    pub use crate::error::{ConvoscopeError, Result};
    pub use crate::message::{Message, Platform};
    pub use crate::reader::ConvoReader;
    pub use crate::user::{IngestCounters, User};
}
