//! Durable cross-cycle experiment state.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::error::Category;

use crate::catalog::ConditionCatalog;
use crate::errors::{ErrorInfo, ShelfError};
use crate::hash::{stable_hash_string, to_json_pretty};
use crate::queue::TrialQueue;

/// State carried from one weekly cycle to the next.
///
/// Every field is required on load; a partially shaped file is rejected rather
/// than defaulted. Maps are ordered so a load/save cycle reproduces the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentState {
    /// Condition identifiers in catalog order.
    pub conditions: Vec<String>,
    /// Pending trial units in scheduling order.
    pub remaining: TrialQueue,
    /// Cumulative successful rows per condition, rebuilt every cycle.
    pub completed_counts: BTreeMap<String, u32>,
    /// Failure rows already converted into requeued units, per condition.
    pub failure_counts: BTreeMap<String, u32>,
    /// Control slots appended to every container layout.
    pub controls_per_collection: u32,
    /// Successful rows each condition needs before the experiment is complete.
    pub target_replicates_total: u32,
    /// Condition to stock location map.
    pub condition_locations: BTreeMap<String, String>,
}

impl ExperimentState {
    /// Fresh state for a new experiment: all counts zero, target taken from
    /// the catalog.
    pub fn new(
        catalog: &ConditionCatalog,
        remaining: TrialQueue,
        controls_per_collection: u32,
    ) -> Self {
        let conditions = catalog.ids();
        let completed_counts = conditions.iter().map(|c| (c.clone(), 0)).collect();
        Self {
            conditions,
            remaining,
            completed_counts,
            failure_counts: BTreeMap::new(),
            controls_per_collection,
            target_replicates_total: catalog.target_replicates_total(),
            condition_locations: catalog.locations(),
        }
    }

    /// Checks cross-field consistency of a loaded state.
    pub fn validate(&self) -> Result<(), ShelfError> {
        if self.conditions.is_empty() {
            return Err(invalid("state-no-conditions", "state lists no conditions"));
        }
        let mut known = BTreeSet::new();
        for condition in &self.conditions {
            if !known.insert(condition.as_str()) {
                return Err(ShelfError::Validation(
                    ErrorInfo::new("state-duplicate-condition", "condition listed twice")
                        .with_context("condition", condition.clone()),
                ));
            }
        }
        if let Some(unit) = self.remaining.iter().find(|u| !known.contains(u.as_str())) {
            return Err(ShelfError::Validation(
                ErrorInfo::new(
                    "state-unknown-unit",
                    "remaining queue references an unknown condition",
                )
                .with_context("condition", unit.clone()),
            ));
        }
        if self.target_replicates_total == 0 {
            return Err(invalid(
                "state-target-zero",
                "target_replicates_total must be positive",
            ));
        }
        Ok(())
    }

    /// Completed count for `condition`, zero when absent.
    pub fn completed(&self, condition: &str) -> u32 {
        self.completed_counts.get(condition).copied().unwrap_or(0)
    }

    /// Failures already reconciled for `condition`, zero when absent.
    pub fn reconciled_failures(&self, condition: &str) -> u32 {
        self.failure_counts.get(condition).copied().unwrap_or(0)
    }

    /// True once every condition reached the replicate target.
    pub fn is_complete(&self) -> bool {
        self.conditions
            .iter()
            .all(|c| self.completed(c) >= self.target_replicates_total)
    }

    /// Stable digest of the state content.
    pub fn digest(&self) -> Result<String, ShelfError> {
        stable_hash_string(self)
    }

    /// Parses and validates a state document.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ShelfError> {
        let state: Self = serde_json::from_slice(bytes).map_err(|err| match err.classify() {
            Category::Data => ShelfError::Validation(
                ErrorInfo::new("state-schema", err.to_string())
                    .with_hint("experiment state requires every documented field"),
            ),
            _ => ShelfError::Io(ErrorInfo::new("state-corrupt", err.to_string())),
        })?;
        state.validate()?;
        Ok(state)
    }

    /// Renders the state with four-space indentation.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>, ShelfError> {
        to_json_pretty(self)
    }
}

fn invalid(code: &str, message: &str) -> ShelfError {
    ShelfError::Validation(ErrorInfo::new(code, message))
}
