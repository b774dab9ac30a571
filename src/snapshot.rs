//! Persisted snapshot of a completed ingestion run.
//!
//! The fully built [`User`] store is serialized to one opaque blob in a
//! designated cache directory after a successful run, and reloaded on
//! later runs so the export tree never has to be re-walked. A corrupted
//! or unreadable snapshot removes the cache directory and forces a full
//! rebuild; nothing is ever persisted mid-run.

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{ConvoscopeError, Result};
use crate::user::User;

/// File name of the snapshot blob inside the cache directory.
pub const SNAPSHOT_FILE: &str = "user_snapshot.json";

/// Persists a fully built store. Creates the cache directory as needed and
/// returns the snapshot path.
pub fn save(user: &User, cache_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(cache_dir)?;
    let path = cache_dir.join(SNAPSHOT_FILE);
    let file = fs::File::create(&path)?;
    serde_json::to_writer(BufWriter::new(file), user)?;
    Ok(path)
}

/// Loads a previously persisted store.
///
/// Distinguishes "no snapshot yet" (an [`Io`](ConvoscopeError::Io) error)
/// from "snapshot present but unreadable"
/// ([`Snapshot`](ConvoscopeError::Snapshot)), which callers treat as
/// corruption.
pub fn load(cache_dir: &Path) -> Result<User> {
    let path = cache_dir.join(SNAPSHOT_FILE);
    let file = fs::File::open(&path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|err| ConvoscopeError::snapshot(path, err.to_string()))
}

/// Loads the snapshot if present and readable, otherwise rebuilds.
///
/// A missing snapshot simply triggers a build. A corrupted one removes the
/// whole cache directory first, then rebuilds. Either way the fresh store
/// is persisted before being returned, and only after the build succeeded.
pub fn load_or_rebuild<F>(cache_dir: &Path, rebuild: F) -> Result<User>
where
    F: FnOnce() -> Result<User>,
{
    match load(cache_dir) {
        Ok(user) => {
            info!("snapshot loaded from {}", cache_dir.display());
            return Ok(user);
        }
        Err(err) if err.is_snapshot() => {
            warn!(%err, "snapshot corrupted, forcing a rebuild");
            if let Err(remove_err) = fs::remove_dir_all(cache_dir) {
                warn!(%remove_err, "could not clear cache directory");
            }
        }
        Err(_) => {} // no snapshot yet
    }

    let user = rebuild()?;
    save(&user, cache_dir)?;
    Ok(user)
}
