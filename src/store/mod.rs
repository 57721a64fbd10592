//! Atomic JSON snapshot persistence.
//!
//! Every durable store in the crate (result cache, reliability records,
//! cached feature flags) serializes its full state to a JSON file. Writes go
//! through a temp file in the target directory and are renamed into place,
//! so a crash mid-write never leaves a truncated snapshot. Persistence is
//! best-effort everywhere: in-memory state stays authoritative and write
//! failures are logged, not surfaced.

pub mod error;


pub use error::{StoreError, StoreResult};

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Loads a snapshot, returning `Ok(None)` when the file does not exist.
pub fn load_snapshot<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::Io(e)),
    };

    let value = serde_json::from_slice(&bytes)?;
    Ok(Some(value))
}

/// Serializes `value` and atomically replaces the snapshot at `path`.
pub fn save_snapshot<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let json = serde_json::to_vec_pretty(value)?;

    // The temp file must live in the target directory for the rename to be
    // atomic (same filesystem).
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.persist(path)
        .map_err(|e| StoreError::Io(e.error))?;

    Ok(())
}

/// [`save_snapshot`], logging and swallowing any failure.
pub fn save_snapshot_best_effort<T: Serialize>(path: &Path, value: &T) {
    if let Err(e) = save_snapshot(path, value) {
        warn!(path = %path.display(), error = %e, "snapshot write failed; keeping in-memory state");
    }
}

/// [`load_snapshot`], logging and swallowing any failure (a corrupt snapshot
/// is treated as absent).
pub fn load_snapshot_best_effort<T: DeserializeOwned>(path: &Path) -> Option<T> {
    match load_snapshot(path) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "snapshot load failed; starting empty");
            None
        }
    }
}
