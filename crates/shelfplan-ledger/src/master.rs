//! The master ledger: every historical row in one CSV with its cycle and
//! outcome flags.

use csv::WriterBuilder;
use shelfplan_core::errors::{ErrorInfo, ShelfError};
use shelfplan_place::{Outcome, PlacementRow, WeekTable};

/// Default file name of the master ledger at the experiment root.
pub const DEFAULT_MASTER_NAME: &str = "master-file.csv";

/// Name of the timestamped snapshot written into the current cycle directory.
pub fn snapshot_name(timestamp: &str) -> String {
    format!("master-file_{timestamp}.csv")
}

fn master_record(row: &PlacementRow, week: &str) -> Vec<String> {
    let trial = row.is_trial();
    let failed = trial && row.outcome() == Outcome::Failed;
    vec![
        row.experimenter.clone(),
        row.collector.clone(),
        row.incubator.clone(),
        row.shelf.clone(),
        row.rack.clone(),
        row.position.map(|p| p.to_string()).unwrap_or_default(),
        row.plugcamera.clone(),
        row.condition.clone(),
        row.location.clone(),
        row.staging_date.clone(),
        row.amendments.clone(),
        row.comments.clone(),
        row.staging_times.clone(),
        week.to_string(),
        failed.to_string(),
        (trial && !failed).to_string(),
    ]
}

/// Every historical row, oldest cycle first, with the cycle and the derived
/// outcome flags appended. Control rows are kept but flag neither outcome.
pub fn master_csv_bytes(tables: &[WeekTable]) -> Result<Vec<u8>, ShelfError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    let mut header: Vec<&str> = shelfplan_place::TABLE_COLUMNS.to_vec();
    header.extend(["week", "is_failure", "is_success"]);
    writer
        .write_record(&header)
        .map_err(|err| wrap_csv("master-write-header", err))?;
    for table in tables {
        let week = table.cycle.folder_name();
        for row in &table.rows {
            writer
                .write_record(master_record(row, &week))
                .map_err(|err| wrap_csv("master-write-row", err))?;
        }
    }
    writer
        .into_inner()
        .map_err(|err| ShelfError::Io(ErrorInfo::new("master-flush", err.to_string())))
}

fn wrap_csv(code: &str, err: csv::Error) -> ShelfError {
    ShelfError::Io(ErrorInfo::new(code, "master file CSV failure").with_hint(err.to_string()))
}
