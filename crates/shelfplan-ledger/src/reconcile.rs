//! Turns newly recorded failures into requeued trial units.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shelfplan_core::TrialQueue;
use tracing::{debug, warn};

/// What one reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Units appended to the queue tail this pass, per condition.
    pub appended: BTreeMap<String, u32>,
    /// Failures now covered by requeued units, per condition.
    pub failure_counts: BTreeMap<String, u32>,
}

impl Reconciliation {
    /// Units appended across all conditions.
    pub fn appended_total(&self) -> u32 {
        self.appended.values().sum()
    }
}

/// Requeues only the failures not yet converted into queue units.
///
/// For every condition the delta `total − already_reconciled` is appended to
/// the tail of `queue` when positive. The returned `failure_counts` is
/// `already_reconciled` overlaid with `totals`, ready to persist.
pub fn reconcile(
    queue: &mut TrialQueue,
    totals: &BTreeMap<String, u32>,
    already_reconciled: &BTreeMap<String, u32>,
) -> Reconciliation {
    let mut appended = BTreeMap::new();
    for (condition, &total) in totals {
        let previous = already_reconciled.get(condition).copied().unwrap_or(0);
        if total > previous {
            let delta = total - previous;
            queue.requeue(condition, delta);
            appended.insert(condition.clone(), delta);
            debug!(condition = %condition, delta, "requeued failures");
        } else if total < previous {
            warn!(
                condition = %condition,
                total,
                previous,
                "fewer failures recorded than already reconciled"
            );
        }
    }
    let mut failure_counts = already_reconciled.clone();
    failure_counts.extend(totals.iter().map(|(k, v)| (k.clone(), *v)));
    Reconciliation {
        appended,
        failure_counts,
    }
}
