//! Weekly cycle controller for shelfplan experiments: YAML configuration,
//! the durable on-disk store, initialization and roll-forward, the next-picks
//! report and completion polling.

pub mod config;
pub mod controller;
pub mod picks;
pub mod poll;
pub mod store;

pub use config::{ScheduleConfig, DEFAULT_COLLECTIONS_PER_CYCLE};
pub use controller::{
    initialize, is_complete, placement_rng, roll_forward, status, AdvanceOptions, CyclePhase,
    CycleReport, InitOptions, StatusReport,
};
pub use picks::NextPicks;
pub use poll::{wait_for_completion, CompletionProbe, PollPolicy};
pub use store::{atomic_write, load_state, save_state, ExperimentLayout, StateLock};
