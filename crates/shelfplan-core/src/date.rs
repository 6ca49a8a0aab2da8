//! Cycle identifiers and collection-day labels.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, ShelfError};

/// Weekday on which every cycle starts.
pub const CYCLE_WEEKDAY: Weekday = Weekday::Mon;

/// Folder format, e.g. `2025-10-13`.
pub const FOLDER_FORMAT: &str = "%Y-%m-%d";
/// Human-facing format, e.g. `13-10-2025`.
pub const DISPLAY_FORMAT: &str = "%d-%m-%Y";

/// Start date of a weekly cycle. Always falls on [`CYCLE_WEEKDAY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CycleDate(NaiveDate);

impl CycleDate {
    /// Validates that `date` is a cycle start.
    pub fn new(date: NaiveDate) -> Result<Self, ShelfError> {
        if date.weekday() != CYCLE_WEEKDAY {
            return Err(ShelfError::Validation(
                ErrorInfo::new("cycle-weekday", "cycle date is not a cycle start day")
                    .with_context("date", date.format(FOLDER_FORMAT).to_string())
                    .with_context("weekday", date.weekday().to_string())
                    .with_hint(format!("cycles start on {CYCLE_WEEKDAY}")),
            ));
        }
        Ok(Self(date))
    }

    /// Parses either `YYYY-MM-DD` or `DD-MM-YYYY`.
    pub fn parse(text: &str) -> Result<Self, ShelfError> {
        let text = text.trim();
        let date = NaiveDate::parse_from_str(text, FOLDER_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(text, DISPLAY_FORMAT))
            .map_err(|err| {
                ShelfError::Validation(
                    ErrorInfo::new("cycle-date-format", "unrecognised cycle date")
                        .with_context("input", text)
                        .with_hint(format!("use YYYY-MM-DD or DD-MM-YYYY ({err})")),
                )
            })?;
        Self::new(date)
    }

    /// Parses a directory name, accepting only the folder format.
    pub fn from_folder_name(name: &str) -> Option<Self> {
        NaiveDate::parse_from_str(name, FOLDER_FORMAT)
            .ok()
            .and_then(|date| Self::new(date).ok())
    }

    /// Calendar date of the cycle start.
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Directory name for this cycle.
    pub fn folder_name(&self) -> String {
        self.0.format(FOLDER_FORMAT).to_string()
    }

    /// `DD-MM-YYYY` rendering used in reports.
    pub fn display(&self) -> String {
        self.0.format(DISPLAY_FORMAT).to_string()
    }

    /// The following cycle start.
    pub fn next(&self) -> Self {
        Self(self.0 + Duration::days(7))
    }

    /// Labels for the six collections of the cycle: Tue–Wed night, Wed,
    /// Wed–Thu night, Thu, Thu–Fri night, Fri.
    pub fn staging_dates(&self) -> Vec<String> {
        let day = |offset: i64| self.0 + Duration::days(offset);
        let (tue, wed, thu, fri) = (day(1), day(2), day(3), day(4));
        vec![
            night_range(tue, wed),
            single_day(wed),
            night_range(wed, thu),
            single_day(thu),
            night_range(thu, fri),
            single_day(fri),
        ]
    }
}

fn single_day(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn night_range(a: NaiveDate, b: NaiveDate) -> String {
    let (a, b) = if b < a { (b, a) } else { (a, b) };
    if a.month() == b.month() && a.year() == b.year() {
        format!("{}-{:02}/{:02}/{}", a.day(), b.day(), a.month(), a.year())
    } else {
        format!("{}-{}", single_day(a), single_day(b))
    }
}

impl fmt::Display for CycleDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.folder_name())
    }
}

impl FromStr for CycleDate {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CycleDate {
    type Error = ShelfError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CycleDate> for String {
    fn from(value: CycleDate) -> Self {
        value.folder_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn night_range_across_months() {
        let a = NaiveDate::from_ymd_opt(2025, 9, 30).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        assert_eq!(night_range(a, b), "30/09/2025-01/10/2025");
        assert_eq!(night_range(b, a), "30/09/2025-01/10/2025");
    }

    #[test]
    fn night_range_same_month() {
        let a = NaiveDate::from_ymd_opt(2025, 10, 7).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 10, 8).unwrap();
        assert_eq!(night_range(a, b), "7-08/10/2025");
    }
}
