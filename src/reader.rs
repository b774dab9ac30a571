//! Corpus reader and orchestrator.
//!
//! Walks the export's `messages/inbox` tree, assembles every conversation
//! folder exactly once (cross-linked counterpart folders are merged, not
//! re-processed), accumulates results into the [`User`] store, and
//! triggers the memoized derived views eagerly so later queries are
//! recomputation-free. Individual conversation failures never abort the
//! run; they are tallied and reported as counters.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{info, warn};

use crate::analysis::sentiment::SentimentScorer;
use crate::assemble::{Assembled, Assembler};
use crate::classify::NameClassifier;
use crate::config::{ActivityConfig, ReaderConfig, SentimentConfig};
use crate::error::{ConvoscopeError, Result};
use crate::linker::{link_folders, load_overrides, NameLink};
use crate::message::Platform;
use crate::progress::{Progress, ProgressCallback};
use crate::user::User;

/// How often to log a progress line, in conversation folders.
const PROGRESS_LOG_EVERY: usize = 50;

/// Reads a whole export (or a single conversation) into memory.
///
/// Collaborators — progress callback, sentiment scorer, name classifier —
/// are optional and attached builder-style.
///
/// # Example
///
/// ```rust,no_run
/// use convoscope::config::ReaderConfig;
/// use convoscope::reader::ConvoReader;
///
/// # fn main() -> convoscope::error::Result<()> {
/// let config = ReaderConfig::new("Alice Smith", "raw_data/extract-2021-04-26");
/// let user = ConvoReader::new(config).read_corpus()?;
/// println!("{} conversations", user.convos.len());
/// # Ok(())
/// # }
/// ```
pub struct ConvoReader<'a> {
    config: ReaderConfig,
    progress: Option<ProgressCallback>,
    scorer: Option<&'a dyn SentimentScorer>,
    classifier: Option<&'a dyn NameClassifier>,
}

impl<'a> ConvoReader<'a> {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            progress: None,
            scorer: None,
            classifier: None,
        }
    }

    /// Attaches a progress callback invoked once per conversation folder.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Attaches the sentiment scorer; with one present, the sentiment
    /// table is built eagerly at the end of the run.
    #[must_use]
    pub fn with_scorer(mut self, scorer: &'a dyn SentimentScorer) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Attaches the name classifier for counterpart gender guesses.
    #[must_use]
    pub fn with_classifier(mut self, classifier: &'a dyn NameClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Reads every conversation of the configured export(s) into a
    /// [`User`] store.
    pub fn read_corpus(&self) -> Result<User> {
        let cfg = &self.config;
        let mut user = User::new(&cfg.user_name, &cfg.root, cfg.utc_offset_secs);

        let primary = list_convo_folders(&cfg.root)?;
        let links: Vec<NameLink> = match &cfg.secondary_root {
            Some(secondary_root) => {
                let secondary = list_convo_folders(secondary_root)?;
                let overrides = match &cfg.overrides_path {
                    Some(path) => load_overrides(path)?,
                    None => Vec::new(),
                };
                link_folders(&primary, &secondary, &overrides)?
            }
            None => primary.iter().map(|f| NameLink::primary_only(f)).collect(),
        };

        let total = links.len();
        let mut anon_counter = 0u32;

        for (ii, link) in links.iter().enumerate() {
            if ii % PROGRESS_LOG_EVERY == 0 {
                info!("\t\t{ii} / {total}");
            }
            if let Some(callback) = &self.progress {
                callback(Progress::new(ii, Some(total)));
            }

            match self.ingest_link(&mut user, &mut anon_counter, link) {
                Ok(()) => {}
                Err(err) if err.is_convo_scoped() => {
                    user.counters.failed_convos += 1;
                    warn!(%err, base = link.base, "conversation skipped");
                }
                Err(err) => return Err(err),
            }
        }

        if let Some(callback) = &self.progress {
            callback(Progress::new(total, Some(total)));
        }
        log_summary(&user);

        if cfg.secondary_root.is_some() {
            user.set_name_links(links);
        }

        // Warm the memoized views so repeated queries never recompute
        let _ = user.activity_series(&ActivityConfig::default(), true);
        if let Some(scorer) = self.scorer {
            let _ = user.sentiment_table(scorer, &SentimentConfig::default(), true);
        }

        Ok(user)
    }

    /// Reads one conversation by name, matching folder prefixes.
    ///
    /// Useful when running in isolation and the folder name (with its junk
    /// suffix) is unknown. Only the primary platform is searched.
    pub fn read_single(&self, name: &str) -> Result<Assembled> {
        let cfg = &self.config;
        let folders = list_convo_folders(&cfg.root)?;
        let folder = find_folder(name, &folders)?;

        let mut user = User::new(&cfg.user_name, &cfg.root, cfg.utc_offset_secs);
        let mut anon_counter = 0u32;
        let mut assembler = Assembler::new(
            &cfg.user_name,
            cfg.tz(),
            &mut user.counters,
            &mut anon_counter,
            &mut user.persons,
        );
        if let Some(classifier) = self.classifier {
            assembler = assembler.with_classifier(classifier);
        }

        let path = inbox_path(&cfg.root).join(folder);
        let parts = assembler.collect(&path, Platform::Facebook).into_iter().collect();
        assembler.finalize(parts)
    }

    fn ingest_link(&self, user: &mut User, anon_counter: &mut u32, link: &NameLink) -> Result<()> {
        let cfg = &self.config;

        let assembled = {
            let mut assembler = Assembler::new(
                &cfg.user_name,
                cfg.tz(),
                &mut user.counters,
                anon_counter,
                &mut user.persons,
            );
            if let Some(classifier) = self.classifier {
                assembler = assembler.with_classifier(classifier);
            }

            let mut parts = Vec::new();
            if let Some(folder) = &link.primary {
                let path = inbox_path(&cfg.root).join(folder);
                if let Some(raw) = assembler.collect(&path, Platform::Facebook) {
                    parts.push(raw);
                }
            }
            if let (Some(folder), Some(secondary_root)) = (&link.secondary, &cfg.secondary_root) {
                let path = inbox_path(secondary_root).join(folder);
                if let Some(raw) = assembler.collect(&path, Platform::Instagram) {
                    parts.push(raw);
                }
            }

            assembler.finalize(parts)?
        };

        match assembled {
            Assembled::Convo(convo) => user.insert_convo(convo),
            Assembled::Empty => Ok(()),
        }
    }
}

/// The export's conversation subtree.
pub(crate) fn inbox_path(root: &Path) -> PathBuf {
    root.join("messages").join("inbox")
}

/// Lists conversation folder names under an export root, sorted for
/// deterministic processing order.
pub(crate) fn list_convo_folders(root: &Path) -> Result<Vec<String>> {
    let inbox = inbox_path(root);
    if !inbox.is_dir() {
        return Err(ConvoscopeError::MissingInbox {
            root: root.to_path_buf(),
        });
    }

    let mut folders: Vec<String> = fs::read_dir(&inbox)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    folders.sort();
    Ok(folders)
}

/// Finds the folder for a conversation name.
///
/// The export appends alphanumeric junk to folder names, so this matches
/// by prefix and prefers the shortest hit: a dyadic conversation over
/// group chats whose name lists happen to start the same way.
pub fn find_folder<'f>(name: &str, folders: &'f [String]) -> Result<&'f String> {
    let cleaned = name.to_lowercase().replace(' ', "");
    let pattern = Regex::new(&format!("^{}_.+", regex::escape(&cleaned)))
        .map_err(|_| ConvoscopeError::convo_not_found(name))?;

    folders
        .iter()
        .filter(|folder| pattern.is_match(&folder.to_lowercase()))
        .min_by_key(|folder| folder.len())
        .ok_or_else(|| ConvoscopeError::convo_not_found(name))
}

fn log_summary(user: &User) {
    let counters = &user.counters;
    if counters.empty_convos > 0 {
        info!("{} conversations were empty", counters.empty_convos);
    }
    if counters.failed_shards > 0 {
        info!("{} shard file(s) could not be opened", counters.failed_shards);
    }
    if counters.failed_convos > 0 {
        info!("{} conversation(s) failed", counters.failed_convos);
    }
    info!(
        "{} conversations, {} persons ingested",
        user.convos.len(),
        user.persons.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_find_folder_prefers_shortest_match() {
        let folders = strings(&[
            "charlienguyen_abc123",
            "charlienguyenandfriends_zzz999",
            "bob_qqq",
        ]);
        let found = find_folder("Charlie Nguyen", &folders).unwrap();
        assert_eq!(found, "charlienguyen_abc123");
    }

    #[test]
    fn test_find_folder_missing_is_error() {
        let folders = strings(&["bob_qqq"]);
        let err = find_folder("Nobody Here", &folders).unwrap_err();
        assert!(matches!(err, ConvoscopeError::ConvoNotFound { .. }));
    }

    #[test]
    fn test_find_folder_requires_suffix_separator() {
        // A bare name without the junk suffix is not a folder
        let folders = strings(&["charlienguyen"]);
        assert!(find_folder("Charlie Nguyen", &folders).is_err());
    }

    #[test]
    fn test_missing_inbox_is_error() {
        let err = list_convo_folders(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, ConvoscopeError::MissingInbox { .. }));
    }
}
