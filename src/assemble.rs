//! Conversation Assembler.
//!
//! Turns the JSON shards of one conversation folder (or a cross-platform
//! pair of folders) into one [`Convo`]. Per-shard read failures are
//! counted and skipped; a conversation only drops when nothing readable
//! remains or fewer than two senders survive cleaning. The tri-state
//! outcome forces callers to handle all three cases explicitly.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::FixedOffset;
use regex::Regex;
use tracing::{debug, warn};

use crate::classify::NameClassifier;
use crate::convo::Convo;
use crate::error::{ConvoscopeError, Result};
use crate::linker::unify_counterpart_labels;
use crate::message::{Message, Platform};
use crate::normalize::normalize_message;
use crate::parsing::fix_mojibake;
use crate::parsing::shard::{RawShard, SHARD_FILE_PATTERN};
use crate::user::{IngestCounters, PersonRegistry};

/// Attributable rows a conversation must exceed for anonymous senders to
/// be relabeled instead of dropped.
const ANON_RELABEL_MIN_MSGS: usize = 2;

/// Outcome of assembling one conversation.
///
/// `Empty` is a statistic, not an error: the folder held no real exchange.
#[derive(Debug)]
pub enum Assembled {
    Convo(Convo),
    Empty,
}

/// The messages and shard-level metadata read from one platform folder,
/// before cross-platform merging.
#[derive(Debug)]
pub struct FolderRaw {
    pub folder: PathBuf,
    pub messages: Vec<Message>,
    /// Re-decoded title from the last-processed shard; may be empty.
    pub title: String,
    /// Participation flag from the last-processed shard.
    pub is_active: bool,
}

fn shard_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(SHARD_FILE_PATTERN).expect("shard pattern is a valid regex"))
}

/// Assembles conversations against the shared corpus state.
///
/// The registry, the counters and the corpus-wide anonymous-sender counter
/// are passed in explicitly; the assembler never reaches for ambient
/// state.
pub struct Assembler<'a> {
    user_name: &'a str,
    tz: FixedOffset,
    counters: &'a mut IngestCounters,
    anon_counter: &'a mut u32,
    registry: &'a mut PersonRegistry,
    classifier: Option<&'a dyn NameClassifier>,
}

impl<'a> Assembler<'a> {
    pub fn new(
        user_name: &'a str,
        tz: FixedOffset,
        counters: &'a mut IngestCounters,
        anon_counter: &'a mut u32,
        registry: &'a mut PersonRegistry,
    ) -> Self {
        Self {
            user_name,
            tz,
            counters,
            anon_counter,
            registry,
            classifier: None,
        }
    }

    /// Attaches the optional name classifier for the counterpart gender
    /// signal.
    #[must_use]
    pub fn with_classifier(mut self, classifier: &'a dyn NameClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Reads every shard of one platform folder and normalizes its
    /// messages.
    ///
    /// Unreadable shards are counted and skipped. Returns `None` when not
    /// a single shard could be read; the caller treats that side of the
    /// conversation as absent.
    pub fn collect(&mut self, folder: &Path, platform: Platform) -> Option<FolderRaw> {
        let mut shard_files: Vec<PathBuf> = match fs::read_dir(folder) {
            Ok(entries) => entries
                .filter_map(std::result::Result::ok)
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| shard_pattern().is_match(n))
                })
                .collect(),
            Err(err) => {
                self.counters.failed_shards += 1;
                warn!(folder = %folder.display(), %err, "conversation folder unreadable");
                return None;
            }
        };
        // Shard numbering does not imply message order, but a stable read
        // order keeps the failure counters deterministic
        shard_files.sort();

        let mut messages = Vec::new();
        let mut title = String::new();
        let mut is_active = true;
        let mut any_shard = false;

        for path in shard_files {
            let shard: RawShard = match fs::read_to_string(&path) {
                Ok(text) => match serde_json::from_str(&text) {
                    Ok(shard) => shard,
                    Err(err) => {
                        self.counters.failed_shards += 1;
                        warn!(%err, shard = %path.display(), "shard skipped");
                        continue;
                    }
                },
                Err(err) => {
                    self.counters.failed_shards += 1;
                    warn!(%err, shard = %path.display(), "shard skipped");
                    continue;
                }
            };

            any_shard = true;
            title = fix_mojibake(&shard.title);
            is_active = shard.is_still_participant;
            messages.extend(
                shard
                    .messages
                    .into_iter()
                    .filter_map(|raw| normalize_message(raw, platform, self.tz)),
            );
        }

        if !any_shard {
            debug!(folder = %folder.display(), "no readable shards");
            return None;
        }

        Some(FolderRaw {
            folder: folder.to_path_buf(),
            messages,
            title,
            is_active,
        })
    }

    /// Merges the collected platform folders into one conversation.
    ///
    /// Order across shards and platforms is corrected by a timestamp sort
    /// here, after normalization. The first part is the primary platform;
    /// its title and participation flag win, and a merged dyadic pair gets
    /// its counterpart labels unified to the primary's.
    pub fn finalize(&mut self, mut parts: Vec<FolderRaw>) -> Result<Assembled> {
        if parts.is_empty() {
            self.counters.empty_convos += 1;
            return Ok(Assembled::Empty);
        }

        if parts.len() == 2 {
            let (first, second) = parts.split_at_mut(1);
            unify_counterpart_labels(
                self.user_name,
                &first[0].messages,
                &mut second[0].messages,
            );
        }

        let folder = parts[0].folder.clone();
        let raw_title = parts
            .iter()
            .map(|p| p.title.clone())
            .find(|t| !t.is_empty())
            .unwrap_or_default();
        let is_active = parts[0].is_active;

        let mut messages: Vec<Message> = parts.into_iter().flat_map(|p| p.messages).collect();
        messages.sort_by_key(|m| m.timestamp);

        self.resolve_anonymous_senders(&mut messages);

        let senders: BTreeSet<&str> = messages.iter().map(|m| m.sender.as_str()).collect();
        // One sender means a one-sided artifact, not a real exchange
        if senders.len() < 2 {
            self.counters.empty_convos += 1;
            return Ok(Assembled::Empty);
        }

        let title = if raw_title.is_empty() {
            let synthesized: Vec<&str> = senders
                .iter()
                .copied()
                .filter(|s| *s != self.user_name)
                .collect();
            let synthesized = synthesized.join(", ");
            if synthesized.is_empty() {
                return Err(ConvoscopeError::invalid_title(folder));
            }
            self.counters.blank_titles += 1;
            synthesized
        } else {
            raw_title
        };

        let Some(mut convo) = Convo::new(title, is_active, messages) else {
            self.counters.empty_convos += 1;
            return Ok(Assembled::Empty);
        };

        self.registry.get_or_create_all(&convo.speakers);

        if let Some(classifier) = self.classifier {
            let guess = convo
                .counterpart(self.user_name)
                .map(|c| c.split_whitespace().next().unwrap_or(c).to_string())
                .and_then(|first_name| classifier.classify(&first_name));
            convo.counterpart_gender = guess;
        }

        Ok(Assembled::Convo(convo))
    }

    /// Applies the depersonalized-sender policy.
    ///
    /// Senders that decoded to an empty string are deleted accounts. With
    /// enough attributable rows around them they are relabeled
    /// `Unknown Person #N` (one `N` per conversation, drawn from the
    /// corpus-wide counter; distinct anonymous senders within one
    /// conversation are not distinguished). Below the threshold the rows
    /// are dropped outright.
    fn resolve_anonymous_senders(&mut self, messages: &mut Vec<Message>) {
        let anon = messages.iter().filter(|m| m.sender.is_empty()).count();
        if anon == 0 {
            return;
        }
        self.counters.depersonalized_msgs += anon as u32;

        let attributable = messages.len() - anon;
        if attributable > ANON_RELABEL_MIN_MSGS {
            *self.anon_counter += 1;
            let label = format!("Unknown Person #{}", self.anon_counter);
            for msg in messages.iter_mut().filter(|m| m.sender.is_empty()) {
                msg.sender = label.clone();
            }
        } else {
            messages.retain(|m| !m.sender.is_empty());
        }
    }
}
