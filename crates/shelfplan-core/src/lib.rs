#![deny(missing_docs)]
#![doc = "Core types for the shelfplan scheduling engine: errors, seeding, the condition catalog, the trial queue, cycle dates and the durable experiment state."]

pub mod catalog;
pub mod date;
pub mod errors;
mod hash;
pub mod queue;
pub mod rng;
pub mod state;

pub use catalog::{Condition, ConditionCatalog};
pub use date::{CycleDate, CYCLE_WEEKDAY};
pub use errors::{ErrorInfo, ShelfError};
pub use hash::{stable_hash_string, to_canonical_json_bytes, to_json_pretty};
pub use queue::{replicate_factor, TrialQueue};
pub use rng::{derive_substream_seed, RngHandle};
pub use state::ExperimentState;

/// Literal condition value of a control slot.
pub const CONTROL_MARKER: &str = "control";

/// True when `condition` names a control slot (case-insensitive).
pub fn is_control(condition: &str) -> bool {
    condition.trim().eq_ignore_ascii_case(CONTROL_MARKER)
}
