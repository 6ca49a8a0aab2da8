//! Durable, crash-consistent file layout of an experiment root.
//!
//! ```text
//! <root>/experiment.json                 latest state
//! <root>/<master-name>                   master ledger
//! <root>/.shelfplan.lock                 held while a command mutates the root
//! <root>/<YYYY-MM-DD>/shelves.csv        placement table of that cycle
//! <root>/<YYYY-MM-DD>/experiment.json    state after placing that cycle
//! <root>/<YYYY-MM-DD>/experiment_<ts>.json
//! <root>/<YYYY-MM-DD>/master-file_<ts>.csv
//! <root>/<YYYY-MM-DD>/next_conditions.json
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use shelfplan_core::errors::{ErrorInfo, ShelfError};
use shelfplan_core::{CycleDate, ExperimentState};
use shelfplan_ledger::TABLE_FILE;
use shelfplan_place::WeekTable;
use tracing::debug;

/// Canonical state file name, both per cycle and at the root.
pub const STATE_FILE: &str = "experiment.json";
/// Exclusive lock file name at the root.
pub const LOCK_FILE: &str = ".shelfplan.lock";
/// Next-picks report file name inside the next cycle directory.
pub const NEXT_PICKS_FILE: &str = "next_conditions.json";

/// Timestamp used in backup and snapshot file names.
pub fn timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Name of a timestamped state backup.
pub fn backup_name(timestamp: &str) -> String {
    format!("experiment_{timestamp}.json")
}

/// Path helpers over one experiment root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentLayout {
    root: PathBuf,
}

impl ExperimentLayout {
    /// Layout rooted at `root`; nothing is created.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Experiment root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<YYYY-MM-DD>`.
    pub fn cycle_dir(&self, cycle: CycleDate) -> PathBuf {
        self.root.join(cycle.folder_name())
    }

    /// Placement table of `cycle`.
    pub fn table_path(&self, cycle: CycleDate) -> PathBuf {
        self.cycle_dir(cycle).join(TABLE_FILE)
    }

    /// State written after placing `cycle`.
    pub fn state_path(&self, cycle: CycleDate) -> PathBuf {
        self.cycle_dir(cycle).join(STATE_FILE)
    }

    /// Latest state at the root.
    pub fn root_state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }
}

/// Writes `bytes` to `path` through a temp file in the same directory,
/// fsyncs it and renames it into place. Missing parent directories are
/// created.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), ShelfError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|err| ShelfError::io("store-mkdir", parent, err))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|err| ShelfError::io("store-temp", parent, err))?;
    tmp.write_all(bytes)
        .map_err(|err| ShelfError::io("store-write", path, err))?;
    tmp.as_file()
        .sync_all()
        .map_err(|err| ShelfError::io("store-sync", path, err))?;
    tmp.persist(path)
        .map_err(|err| ShelfError::io("store-rename", path, err.error))?;
    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }
    debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
    Ok(())
}

/// Loads and validates a state file.
pub fn load_state(path: &Path) -> Result<ExperimentState, ShelfError> {
    let bytes = fs::read(path).map_err(|err| ShelfError::io("state-read", path, err))?;
    ExperimentState::from_json_slice(&bytes).map_err(|err| match err {
        ShelfError::Validation(info) => ShelfError::Validation(info.with_path(path)),
        ShelfError::Io(info) => ShelfError::Io(info.with_path(path)),
        other => other,
    })
}

/// Atomically writes `state` in its canonical JSON form.
pub fn save_state(path: &Path, state: &ExperimentState) -> Result<(), ShelfError> {
    atomic_write(path, &state.to_json_pretty()?)
}

/// Atomically writes a placement table.
pub fn write_table(path: &Path, table: &WeekTable) -> Result<(), ShelfError> {
    atomic_write(path, &table.to_csv_bytes()?)
}

/// Exclusive hold on an experiment root, released when dropped.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
}

impl StateLock {
    /// Creates the lock file, failing if another command already holds it.
    pub fn acquire(root: &Path) -> Result<Self, ShelfError> {
        fs::create_dir_all(root).map_err(|err| ShelfError::io("store-mkdir", root, err))?;
        let path = root.join(LOCK_FILE);
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let payload = format!(
                    "{{\"pid\":{},\"acquired_at\":\"{}\"}}\n",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                let written = file
                    .write_all(payload.as_bytes())
                    .and_then(|()| file.sync_all());
                drop(file);
                if let Err(err) = written {
                    return Err(abandon_lock(&path, err));
                }
                debug!(path = %path.display(), "acquired experiment lock");
                Ok(Self { path })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Err(ShelfError::Io(
                ErrorInfo::new("lock-held", "another command is operating on this experiment")
                    .with_path(&path)
                    .with_hint("remove the lock file if no other command is running"),
            )),
            Err(err) => Err(ShelfError::io("lock-create", &path, err)),
        }
    }

    /// Location of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Removes a lock file whose payload could not be written.
fn abandon_lock(path: &Path, err: std::io::Error) -> ShelfError {
    let _ = fs::remove_file(path);
    ShelfError::io("lock-write", path, err)
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_lock_payload_removes_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE);
        fs::write(&path, b"").unwrap();
        let err = abandon_lock(&path, std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(err.info().code, "lock-write");
        assert!(!path.exists());
        assert!(StateLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let lock = StateLock::acquire(dir.path()).unwrap();
        assert!(StateLock::acquire(dir.path()).is_err());
        drop(lock);
        assert!(StateLock::acquire(dir.path()).is_ok());
    }
}
