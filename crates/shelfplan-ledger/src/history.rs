//! Discovery and loading of the per-cycle placement tables under an
//! experiment root.

use std::path::{Path, PathBuf};

use shelfplan_core::errors::ShelfError;
use shelfplan_core::CycleDate;
use shelfplan_place::WeekTable;
use tracing::{debug, warn};

/// File name of the placement table inside a cycle directory.
pub const TABLE_FILE: &str = "shelves.csv";

/// Cycle directories directly under `root`, sorted by date.
///
/// Entries whose name is not a `YYYY-MM-DD` Monday are ignored.
pub fn cycle_dirs(root: &Path) -> Result<Vec<(CycleDate, PathBuf)>, ShelfError> {
    let entries = std::fs::read_dir(root).map_err(|err| ShelfError::io("history-list", root, err))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| ShelfError::io("history-list", root, err))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if let Some(cycle) = name.to_str().and_then(CycleDate::from_folder_name) {
            dirs.push((cycle, path));
        }
    }
    dirs.sort_by_key(|(cycle, _)| *cycle);
    Ok(dirs)
}

/// Loads every cycle table under `root` up to and including `up_to`.
///
/// Later cycles are excluded. A directory without a table is skipped; a
/// table that fails to parse aborts the load.
pub fn load_history(root: &Path, up_to: CycleDate) -> Result<Vec<WeekTable>, ShelfError> {
    let mut tables = Vec::new();
    for (cycle, dir) in cycle_dirs(root)? {
        if cycle > up_to {
            debug!(cycle = %cycle, "ignoring cycle after the current one");
            continue;
        }
        let path = dir.join(TABLE_FILE);
        if !path.is_file() {
            warn!(cycle = %cycle, path = %path.display(), "cycle directory has no placement table");
            continue;
        }
        let table = WeekTable::read_csv(&path, cycle)?;
        debug!(cycle = %cycle, rows = table.rows.len(), "loaded placement table");
        tables.push(table);
    }
    Ok(tables)
}
