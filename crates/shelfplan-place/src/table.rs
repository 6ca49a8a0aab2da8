//! Placement rows and the per-cycle table codec.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use shelfplan_core::errors::{ErrorInfo, ShelfError};
use shelfplan_core::{is_control, CycleDate};

/// Column order of a written table.
pub const TABLE_COLUMNS: [&str; 13] = [
    "experimenter",
    "collector",
    "incubator",
    "shelf",
    "rack",
    "position",
    "plugcamera",
    "condition",
    "location",
    "staging_date",
    "amendments",
    "comments",
    "staging_times",
];

/// Columns a historical table must carry to be counted.
pub const REQUIRED_COLUMNS: [&str; 2] = ["condition", "amendments"];

/// Outcome marker value recorded for a failed trial.
pub const FAILURE_MARKER: &str = "-1";

/// Classification of a row's `amendments` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing recorded yet.
    Pending,
    /// Marked `-1`.
    Failed,
    /// Any other non-empty marker.
    Recorded,
}

/// One physical assignment of a condition or control to a shelf position.
///
/// Every column except `condition` and `amendments` defaults to empty when
/// absent, so tables written before positions were tracked still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRow {
    #[serde(default)]
    pub experimenter: String,
    #[serde(default)]
    pub collector: String,
    #[serde(default)]
    pub incubator: String,
    #[serde(default)]
    pub shelf: String,
    #[serde(default)]
    pub rack: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub position: Option<u32>,
    #[serde(default)]
    pub plugcamera: String,
    pub condition: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub staging_date: String,
    pub amendments: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub staging_times: String,
}

impl PlacementRow {
    /// Parses the outcome marker. `-1` written as a float (`-1.0`) also counts
    /// as a failure.
    pub fn outcome(&self) -> Outcome {
        let marker = self.amendments.trim();
        if marker.is_empty() {
            return Outcome::Pending;
        }
        if marker == FAILURE_MARKER || marker.parse::<f64>().map(|v| v == -1.0).unwrap_or(false) {
            Outcome::Failed
        } else {
            Outcome::Recorded
        }
    }

    /// True for `control` slots.
    pub fn is_control(&self) -> bool {
        is_control(&self.condition)
    }

    /// True for rows that count towards a condition's ledger.
    pub fn is_trial(&self) -> bool {
        !self.condition.trim().is_empty() && !self.is_control()
    }
}

/// All placements produced for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekTable {
    /// Cycle the table belongs to.
    pub cycle: CycleDate,
    /// Rows in file order.
    pub rows: Vec<PlacementRow>,
}

impl WeekTable {
    /// Wraps already built rows.
    pub fn new(cycle: CycleDate, rows: Vec<PlacementRow>) -> Self {
        Self { cycle, rows }
    }

    /// Reads a table file, failing when a required column is missing.
    pub fn read_csv(path: &Path, cycle: CycleDate) -> Result<Self, ShelfError> {
        let file =
            std::fs::File::open(path).map_err(|err| ShelfError::io("table-open", path, err))?;
        Self::from_reader(file, cycle).map_err(|err| match err {
            ShelfError::Validation(info) => ShelfError::Validation(info.with_path(path)),
            ShelfError::Io(info) => ShelfError::Io(info.with_path(path)),
            other => other,
        })
    }

    /// Parses a table from any CSV source.
    pub fn from_reader<R: Read>(source: R, cycle: CycleDate) -> Result<Self, ShelfError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(source);
        let headers = reader
            .headers()
            .map_err(|err| ShelfError::Io(ErrorInfo::new("table-headers", err.to_string())))?
            .clone();
        for required in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h.trim() == required) {
                return Err(ShelfError::Validation(
                    ErrorInfo::new(
                        "table-missing-column",
                        format!("placement table lacks the '{required}' column"),
                    )
                    .with_context("cycle", cycle.folder_name()),
                ));
            }
        }
        let mut rows = Vec::new();
        for (idx, record) in reader.deserialize::<PlacementRow>().enumerate() {
            let mut row = record.map_err(|err| {
                ShelfError::Validation(
                    ErrorInfo::new("table-row", err.to_string())
                        .with_context("cycle", cycle.folder_name())
                        .with_context("row", (idx + 1).to_string()),
                )
            })?;
            row.condition = row.condition.trim().to_string();
            rows.push(row);
        }
        Ok(Self { cycle, rows })
    }

    /// Renders the table with the canonical column order.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, ShelfError> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        writer
            .write_record(TABLE_COLUMNS)
            .map_err(|err| wrap_csv("table-write-header", err))?;
        for row in &self.rows {
            writer
                .serialize(row)
                .map_err(|err| wrap_csv("table-write-row", err))?;
        }
        writer
            .into_inner()
            .map_err(|err| ShelfError::Io(ErrorInfo::new("table-flush", err.to_string())))
    }

    /// Rows placed in `incubator` on `staging_date`.
    pub fn rows_for<'a>(
        &'a self,
        incubator: &'a str,
        staging_date: &'a str,
    ) -> impl Iterator<Item = &'a PlacementRow> + 'a {
        self.rows
            .iter()
            .filter(move |row| row.incubator == incubator && row.staging_date == staging_date)
    }

    /// Number of rows that count towards the ledger.
    pub fn trial_rows(&self) -> usize {
        self.rows.iter().filter(|row| row.is_trial()).count()
    }
}

fn wrap_csv(code: &str, err: csv::Error) -> ShelfError {
    ShelfError::Io(ErrorInfo::new(code, "placement table CSV failure").with_hint(err.to_string()))
}
