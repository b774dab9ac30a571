//! Progress reporting for long-running ingestion.
//!
//! A callback-based mechanism for library users who want push-based
//! progress updates while the reader walks the export, instead of waiting
//! for the final counters.
//!
//! # Example
//!
//! ```rust
//! use convoscope::progress::{Progress, ProgressCallback};
//! use std::sync::Arc;
//!
//! let callback: ProgressCallback = Arc::new(|progress| {
//!     if let Some(pct) = progress.percentage() {
//!         println!("Progress: {:.1}%", pct);
//!     }
//! });
//!
//! callback(Progress::new(25, Some(100)));
//! ```

use std::sync::Arc;

/// Progress of an ingestion run, in conversation folders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    /// Folders processed so far.
    pub items_processed: usize,
    /// Total folders to process, if known.
    pub total_items: Option<usize>,
}

impl Progress {
    pub fn new(items_processed: usize, total_items: Option<usize>) -> Self {
        Self {
            items_processed,
            total_items,
        }
    }

    /// Returns the progress as a percentage (0.0 - 100.0), or `None` when
    /// the total is unknown.
    pub fn percentage(&self) -> Option<f64> {
        self.total_items.map(|total| {
            if total == 0 {
                100.0
            } else {
                (self.items_processed as f64 / total as f64) * 100.0
            }
        })
    }

    /// Returns whether the run has processed every folder.
    pub fn is_complete(&self) -> bool {
        self.total_items
            .map(|total| self.items_processed >= total)
            .unwrap_or(false)
    }
}

/// Callback type for receiving progress updates.
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Creates a no-op progress callback.
pub fn no_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

/// Creates a progress callback that prints to stderr.
pub fn stderr_progress() -> ProgressCallback {
    Arc::new(|progress| {
        if let Some(pct) = progress.percentage() {
            eprintln!("Progress: {:.1}%", pct);
        }
    })
}
