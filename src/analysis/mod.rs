//! Derived, read-only views over a completed corpus.
//!
//! - [`timeseries`] — rolling activity series across conversations
//! - [`sentiment`] — per-period sentiment aggregation and the
//!   population-vs-sample comparison
//! - [`stats`] — the two-sample distribution test backing the comparison

pub mod sentiment;
pub mod stats;
pub mod timeseries;
