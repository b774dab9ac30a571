//! Cross-platform identity resolver.
//!
//! Both platforms name a conversation folder after the participants plus a
//! junk suffix (`sam_jones_9x7z2`). Stripping the suffix and the
//! word separators yields a base name that usually matches across
//! platforms; equal bases are linked so one real-world relationship is
//! merged instead of counted twice. A manual override table corrects the
//! known false matches and misses, and an ambiguous automatic match is
//! fatal: a silent pick would misattribute messages.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConvoscopeError, Result};
use crate::message::Message;

/// One resolved correspondence between platform folders.
///
/// An outer join: unmatched entries keep one side `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameLink {
    /// Normalized base name both sides share.
    pub base: String,
    /// Folder name on the primary platform.
    pub primary: Option<String>,
    /// Folder name on the secondary platform.
    pub secondary: Option<String>,
}

impl NameLink {
    /// A primary-platform folder with no counterpart.
    pub fn primary_only(folder: &str) -> Self {
        Self {
            base: normalize_base(folder),
            primary: Some(folder.to_string()),
            secondary: None,
        }
    }

    /// Returns `true` when both platforms contributed a folder.
    pub fn is_merged(&self) -> bool {
        self.primary.is_some() && self.secondary.is_some()
    }
}

/// One manual override pair: explicit platform folder names that belong to
/// the same relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverridePair {
    pub primary: String,
    pub secondary: String,
}

/// Strips a folder name down to its match key.
///
/// Lower-cases, drops the trailing junk segment, and removes the remaining
/// separators: `"sam_jones_9x7z2"` and `"samjones_4k1a"` both become
/// `"samjones"`.
pub fn normalize_base(folder: &str) -> String {
    let lower = folder.to_lowercase();
    let mut parts: Vec<&str> = lower.split('_').collect();
    if parts.len() > 1 {
        parts.pop();
    }
    parts.concat()
}

/// Reads the manual override table.
///
/// CSV with a header row and two columns pairing primary- and
/// secondary-platform folder names.
pub fn load_overrides(path: &Path) -> Result<Vec<OverridePair>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut pairs = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (Some(primary), Some(secondary)) = (record.get(0), record.get(1)) else {
            continue;
        };
        if primary.is_empty() || secondary.is_empty() {
            continue;
        }
        pairs.push(OverridePair {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
        });
    }
    Ok(pairs)
}

/// Outer-joins the two platforms' folder listings on normalized base name.
///
/// Overrides take precedence over the automatic match and remove both
/// folders from it. The output preserves primary-folder order, followed by
/// unmatched secondary folders.
pub fn link_folders(
    primary: &[String],
    secondary: &[String],
    overrides: &[OverridePair],
) -> Result<Vec<NameLink>> {
    let override_by_primary: BTreeMap<&str, &str> = overrides
        .iter()
        .map(|p| (p.primary.as_str(), p.secondary.as_str()))
        .collect();
    let overridden_secondary: BTreeSet<&str> =
        overrides.iter().map(|p| p.secondary.as_str()).collect();

    let mut secondary_by_base: BTreeMap<String, Vec<&String>> = BTreeMap::new();
    for folder in secondary {
        if !overridden_secondary.contains(folder.as_str()) {
            secondary_by_base
                .entry(normalize_base(folder))
                .or_default()
                .push(folder);
        }
    }
    let mut primary_by_base: BTreeMap<String, Vec<&String>> = BTreeMap::new();
    for folder in primary {
        if !override_by_primary.contains_key(folder.as_str()) {
            primary_by_base
                .entry(normalize_base(folder))
                .or_default()
                .push(folder);
        }
    }

    let mut links = Vec::new();
    let mut used_secondary: BTreeSet<&String> = BTreeSet::new();

    for folder in primary {
        if let Some(sec) = override_by_primary.get(folder.as_str()) {
            if let Some(sec_folder) = secondary.iter().find(|f| f.as_str() == *sec) {
                used_secondary.insert(sec_folder);
            }
            links.push(NameLink {
                base: normalize_base(folder),
                primary: Some(folder.clone()),
                secondary: Some((*sec).to_string()),
            });
            continue;
        }

        let base = normalize_base(folder);
        let candidates: &[&String] =
            secondary_by_base.get(&base).map_or(&[], |v| v.as_slice());

        match candidates {
            [] => links.push(NameLink {
                base,
                primary: Some(folder.clone()),
                secondary: None,
            }),
            [counterpart] => {
                // A match exists; a second primary folder with the same
                // base would make it undecidable
                let siblings: &[&String] =
                    primary_by_base.get(&base).map_or(&[], |v| v.as_slice());
                if siblings.len() > 1 {
                    return Err(ConvoscopeError::ambiguous_match(
                        base,
                        siblings.iter().map(|f| (*f).clone()).collect(),
                    ));
                }
                used_secondary.insert(counterpart);
                links.push(NameLink {
                    base,
                    primary: Some(folder.clone()),
                    secondary: Some((*counterpart).clone()),
                });
            }
            many => {
                return Err(ConvoscopeError::ambiguous_match(
                    base,
                    many.iter().map(|f| (*f).clone()).collect(),
                ));
            }
        }
    }

    for folder in secondary {
        if !used_secondary.contains(folder) && !overridden_secondary.contains(folder.as_str()) {
            links.push(NameLink {
                base: normalize_base(folder),
                primary: None,
                secondary: Some(folder.clone()),
            });
        }
    }

    Ok(links)
}

/// Unifies counterpart display names across a merged dyadic pair.
///
/// When both platforms show a two-party conversation with the owner and
/// the counterpart's display name differs (exactly one differing name on
/// each side), the secondary platform's label is renamed to the primary's.
/// Group chats never get this renaming and may retain duplicate
/// identities; that narrow applicability is deliberate.
pub fn unify_counterpart_labels(owner: &str, primary: &[Message], secondary: &mut [Message]) {
    let senders = |msgs: &[Message]| -> BTreeSet<String> {
        msgs.iter().map(|m| m.sender.clone()).collect()
    };

    let first = senders(primary);
    let second = senders(secondary);

    if !first.contains(owner) || !second.contains(owner) {
        return;
    }
    if first.len() > 2 || second.len() > 2 {
        return;
    }

    let only_first: Vec<&String> = first.difference(&second).collect();
    let only_second: Vec<&String> = second.difference(&first).collect();
    if only_first.len() != 1 || only_second.len() != 1 {
        return;
    }

    let keep = only_first[0].clone();
    let rename = only_second[0].clone();
    for msg in secondary.iter_mut() {
        if msg.sender == rename {
            msg.sender = keep.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Platform;
    use chrono::{FixedOffset, TimeZone};

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_normalize_base_strips_suffix_and_separators() {
        assert_eq!(normalize_base("sam_jones_9x7z2"), "samjones");
        assert_eq!(normalize_base("samjones_4k1a"), "samjones");
        assert_eq!(normalize_base("AliceSmith"), "alicesmith");
    }

    #[test]
    fn test_link_folders_outer_join() {
        let primary = strings(&["sam_jones_9x7z2", "alice_smith_abc1"]);
        let secondary = strings(&["samjones_4k1a", "charlienguyen_zz9"]);

        let links = link_folders(&primary, &secondary, &[]).unwrap();
        assert_eq!(links.len(), 3);

        let merged = links.iter().find(|l| l.base == "samjones").unwrap();
        assert!(merged.is_merged());
        assert_eq!(merged.primary.as_deref(), Some("sam_jones_9x7z2"));
        assert_eq!(merged.secondary.as_deref(), Some("samjones_4k1a"));

        let alice = links.iter().find(|l| l.base == "alicesmith").unwrap();
        assert!(alice.secondary.is_none());
        let charlie = links.iter().find(|l| l.base == "charlienguyen").unwrap();
        assert!(charlie.primary.is_none());
    }

    #[test]
    fn test_ambiguous_secondary_match_is_fatal() {
        let primary = strings(&["sam_jones_9x7z2"]);
        let secondary = strings(&["samjones_4k1a", "sam_jones_8b8b"]);
        let err = link_folders(&primary, &secondary, &[]).unwrap_err();
        assert!(matches!(err, ConvoscopeError::AmbiguousMatch { .. }));
    }

    #[test]
    fn test_ambiguous_primary_match_is_fatal() {
        let primary = strings(&["sam_jones_9x7z2", "sam_jones_0000"]);
        let secondary = strings(&["samjones_4k1a"]);
        let err = link_folders(&primary, &secondary, &[]).unwrap_err();
        assert!(matches!(err, ConvoscopeError::AmbiguousMatch { .. }));
    }

    #[test]
    fn test_colliding_bases_without_counterpart_are_allowed() {
        // Two primary folders with one base but nothing to match against:
        // they stay singletons instead of aborting the run
        let primary = strings(&["sam_jones_9x7z2", "sam_jones_0000"]);
        let links = link_folders(&primary, &[], &[]).unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| !l.is_merged()));
    }

    #[test]
    fn test_override_beats_automatic_match() {
        let primary = strings(&["sam_jones_9x7z2"]);
        let secondary = strings(&["samjones_4k1a", "sammy_1111"]);
        let overrides = vec![OverridePair {
            primary: "sam_jones_9x7z2".to_string(),
            secondary: "sammy_1111".to_string(),
        }];

        let links = link_folders(&primary, &secondary, &overrides).unwrap();
        let merged = links.iter().find(|l| l.is_merged()).unwrap();
        assert_eq!(merged.secondary.as_deref(), Some("sammy_1111"));
        // The automatic candidate is left as a singleton
        assert!(links
            .iter()
            .any(|l| l.secondary.as_deref() == Some("samjones_4k1a") && l.primary.is_none()));
    }

    fn msg(sender: &str, secs: i64) -> Message {
        let tz = FixedOffset::east_opt(0).unwrap();
        Message::new(sender, tz.timestamp_opt(secs, 0).unwrap(), Platform::Facebook)
    }

    #[test]
    fn test_unify_counterpart_labels_renames_dyadic_diff() {
        let primary = vec![msg("Owner", 0), msg("Sam Jones", 60)];
        let mut secondary = vec![msg("Owner", 120), msg("sam.jones", 180)];
        unify_counterpart_labels("Owner", &primary, &mut secondary);
        assert!(secondary.iter().all(|m| m.sender != "sam.jones"));
        assert_eq!(secondary[1].sender, "Sam Jones");
    }

    #[test]
    fn test_unify_skips_groups() {
        let primary = vec![msg("Owner", 0), msg("A", 1), msg("B", 2)];
        let mut secondary = vec![msg("Owner", 3), msg("C", 4)];
        unify_counterpart_labels("Owner", &primary, &mut secondary);
        assert_eq!(secondary[1].sender, "C");
    }

    #[test]
    fn test_unify_skips_when_owner_missing() {
        let primary = vec![msg("Owner", 0), msg("A", 1)];
        let mut secondary = vec![msg("Someone", 3), msg("C", 4)];
        unify_counterpart_labels("Owner", &primary, &mut secondary);
        assert_eq!(secondary[0].sender, "Someone");
    }

    #[test]
    fn test_unify_noop_when_labels_agree() {
        let primary = vec![msg("Owner", 0), msg("Sam", 1)];
        let mut secondary = vec![msg("Owner", 3), msg("Sam", 4)];
        unify_counterpart_labels("Owner", &primary, &mut secondary);
        assert_eq!(secondary[1].sender, "Sam");
    }
}
