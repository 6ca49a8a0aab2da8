//! Per-condition outcome counts rebuilt from the full table history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shelfplan_place::{Outcome, WeekTable};

/// Cumulative per-condition counts derived from every historical table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCounts {
    /// Rows not marked `-1`, per condition.
    pub successes: BTreeMap<String, u32>,
    /// Rows marked `-1`, per condition.
    pub failures: BTreeMap<String, u32>,
}

impl LedgerCounts {
    /// Successful rows recorded for `condition`.
    pub fn successes_of(&self, condition: &str) -> u32 {
        self.successes.get(condition).copied().unwrap_or(0)
    }

    /// Failed rows recorded for `condition`.
    pub fn failures_of(&self, condition: &str) -> u32 {
        self.failures.get(condition).copied().unwrap_or(0)
    }

    /// Successes for each of `conditions`, zero-filled, ignoring conditions
    /// that are not listed.
    pub fn completed_counts(&self, conditions: &[String]) -> BTreeMap<String, u32> {
        conditions
            .iter()
            .map(|c| (c.clone(), self.successes_of(c)))
            .collect()
    }
}

/// Recomputes the ledger from scratch over `tables`.
///
/// Control rows and rows with an empty condition are ignored. Nothing is
/// accumulated between calls, so rebuilding the same history always yields
/// the same counts.
pub fn rebuild<'a, I>(tables: I) -> LedgerCounts
where
    I: IntoIterator<Item = &'a WeekTable>,
{
    let mut counts = LedgerCounts::default();
    for table in tables {
        for row in table.rows.iter().filter(|row| row.is_trial()) {
            let bucket = match row.outcome() {
                Outcome::Failed => &mut counts.failures,
                Outcome::Pending | Outcome::Recorded => &mut counts.successes,
            };
            *bucket.entry(row.condition.clone()).or_insert(0) += 1;
        }
    }
    counts
}
