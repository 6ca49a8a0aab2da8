//! `next_conditions.json`, the operator-facing summary of a roll-forward.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shelfplan_core::errors::ShelfError;
use shelfplan_core::{CycleDate, ExperimentState};
use shelfplan_place::Placement;

/// Summary of the batch drawn for the next cycle, written as
/// `next_conditions.json` on request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextPicks {
    /// Next cycle start, `DD-MM-YYYY`.
    pub week_commencing: String,
    /// Units each container was allowed to draw.
    pub per_container_target: u32,
    /// Units drawn per container label, in queue order.
    pub draws: BTreeMap<String, Vec<String>>,
    /// Units drawn across all containers.
    pub picked_total: usize,
    /// Failure units requeued by this roll-forward, per condition.
    pub new_failures_appended_this_run: BTreeMap<String, u32>,
    /// Master ledger at the experiment root.
    pub master_root_path: String,
    /// Timestamped master snapshot in the closed cycle's directory.
    pub master_snapshot_path: String,
    /// SHA-256 of the canonical JSON of the persisted state.
    pub state_digest: String,
}

impl NextPicks {
    /// Collects the report from a finished placement and the state about to
    /// be persisted. `master_paths` is `(root, snapshot)`.
    pub fn build(
        next: CycleDate,
        per_container_target: u32,
        placement: &Placement,
        appended: &BTreeMap<String, u32>,
        master_paths: (&str, &str),
        state: &ExperimentState,
    ) -> Result<Self, ShelfError> {
        let draws = placement
            .draws
            .iter()
            .map(|draw| (draw.label.clone(), draw.units.clone()))
            .collect();
        Ok(Self {
            week_commencing: next.display(),
            per_container_target,
            draws,
            picked_total: placement.placed_units(),
            new_failures_appended_this_run: appended.clone(),
            master_root_path: master_paths.0.to_string(),
            master_snapshot_path: master_paths.1.to_string(),
            state_digest: state.digest()?,
        })
    }
}
