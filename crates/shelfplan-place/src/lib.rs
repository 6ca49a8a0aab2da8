//! Weekly placement of trial units onto containers, racks, shelves and
//! positions, plus the CSV codec for the resulting tables.

mod config;
mod engine;
mod table;

pub use config::{
    PlacementConfig, DEFAULT_CONTAINERS, DEFAULT_SHELVES_PER_RACK, DEFAULT_SLOTS_PER_CONTAINER,
};
pub use engine::{container_label, place_batch, ContainerDraw, Placement};
pub use table::{
    Outcome, PlacementRow, WeekTable, FAILURE_MARKER, REQUIRED_COLUMNS, TABLE_COLUMNS,
};
