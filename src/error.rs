//! Unified error types for convoscope.
//!
//! This module provides a single [`ConvoscopeError`] enum that covers all
//! error cases in the library.
//!
//! # Error Handling Philosophy
//!
//! - **Library users** get typed errors they can match on
//! - **Application users** get clear, actionable error messages identifying
//!   the offending conversation folder or file
//! - Per-shard and per-conversation failures are counted and skipped by the
//!   reader; only corpus-level problems (missing inbox, ambiguous
//!   cross-platform matches) abort a run

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized [`Result`] type for convoscope operations.
pub type Result<T> = std::result::Result<T, ConvoscopeError>;

/// The error type for all convoscope operations.
///
/// Each variant contains context about what went wrong and, where
/// applicable, the underlying source error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConvoscopeError {
    /// An I/O error occurred.
    ///
    /// This typically happens when:
    /// - The export root doesn't exist
    /// - Permission denied
    /// - Disk is full (when writing the snapshot)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing/serialization error outside of shard reading.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error while reading the manual override table.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A single shard file could not be parsed.
    ///
    /// The reader records this as a skipped shard; it is never fatal for the
    /// whole conversation while other shards remain readable.
    #[error("Failed to parse shard {}: {source}", path.display())]
    Shard {
        /// The shard file path
        path: PathBuf,
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// Both the raw and the synthesized conversation title are empty.
    ///
    /// Titles are used as unique store keys, so an empty title can never be
    /// silently defaulted.
    #[error("Conversation folder {} has no usable title", folder.display())]
    InvalidTitle {
        /// The conversation folder that failed
        folder: PathBuf,
    },

    /// A second conversation resolved to a canonical title that is already
    /// present in the store.
    #[error("Conversation title '{title}' is already taken by another folder")]
    DuplicateTitle {
        /// The colliding canonical title
        title: String,
    },

    /// More than one folder on one platform normalizes to the same base
    /// name, so the cross-platform match cannot be decided automatically.
    ///
    /// A silent pick would risk misattributing messages to the wrong
    /// relationship; supply a manual override pair instead.
    #[error("Ambiguous cross-platform match for '{base}': candidates {folders:?}")]
    AmbiguousMatch {
        /// The normalized base name both folders share
        base: String,
        /// The colliding folder names
        folders: Vec<String>,
    },

    /// The requested conversation name matched no folder.
    #[error("Specified conversation '{name}' does not exist")]
    ConvoNotFound {
        /// The name that was looked up
        name: String,
    },

    /// The export root has no `messages/inbox` subtree.
    #[error("Export root {} has no messages/inbox subtree", root.display())]
    MissingInbox {
        /// The export root that was scanned
        root: PathBuf,
    },

    /// The persisted snapshot exists but could not be deserialized.
    ///
    /// [`snapshot::load_or_rebuild`](crate::snapshot::load_or_rebuild)
    /// treats this as recoverable: the cache directory is removed and the
    /// corpus is re-ingested.
    #[error("Snapshot {} could not be read: {reason}", path.display())]
    Snapshot {
        /// The snapshot file path
        path: PathBuf,
        /// Description of what went wrong
        reason: String,
    },
}

impl ConvoscopeError {
    /// Creates a shard parse error.
    pub fn shard(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ConvoscopeError::Shard {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid title error for the given conversation folder.
    pub fn invalid_title(folder: impl Into<PathBuf>) -> Self {
        ConvoscopeError::InvalidTitle {
            folder: folder.into(),
        }
    }

    /// Creates a duplicate title error.
    pub fn duplicate_title(title: impl Into<String>) -> Self {
        ConvoscopeError::DuplicateTitle {
            title: title.into(),
        }
    }

    /// Creates an ambiguous cross-platform match error.
    pub fn ambiguous_match(base: impl Into<String>, folders: Vec<String>) -> Self {
        ConvoscopeError::AmbiguousMatch {
            base: base.into(),
            folders,
        }
    }

    /// Creates a conversation lookup failure.
    pub fn convo_not_found(name: impl Into<String>) -> Self {
        ConvoscopeError::ConvoNotFound { name: name.into() }
    }

    /// Creates a snapshot read error.
    pub fn snapshot(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ConvoscopeError::Snapshot {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, ConvoscopeError::Io(_))
    }

    /// Returns `true` if this error is scoped to a single conversation and
    /// should be counted rather than propagated by the reader.
    pub fn is_convo_scoped(&self) -> bool {
        matches!(
            self,
            ConvoscopeError::Shard { .. }
                | ConvoscopeError::InvalidTitle { .. }
                | ConvoscopeError::DuplicateTitle { .. }
        )
    }

    /// Returns `true` if this is a snapshot read error.
    pub fn is_snapshot(&self) -> bool {
        matches!(self, ConvoscopeError::Snapshot { .. })
    }
}
