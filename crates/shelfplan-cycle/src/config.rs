//! YAML schedule configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use shelfplan_core::errors::{ErrorInfo, ShelfError};
use shelfplan_ledger::DEFAULT_MASTER_NAME;
use shelfplan_place::{
    PlacementConfig, DEFAULT_CONTAINERS, DEFAULT_SHELVES_PER_RACK, DEFAULT_SLOTS_PER_CONTAINER,
};

/// Collections staged per weekly cycle (Tuesday night to Friday).
pub const DEFAULT_COLLECTIONS_PER_CYCLE: u32 = 6;

/// YAML-configurable facility topology and file naming.
///
/// Every field is optional in the file; absent fields take the historical
/// values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Incubators filled per cycle.
    #[serde(default = "default_containers")]
    pub containers: u32,
    /// Slots per incubator shelf, controls included.
    #[serde(default = "default_slots")]
    pub slots_per_container: u32,
    /// Shelves shared by consecutive collection dates.
    #[serde(default = "default_shelves_per_rack")]
    pub shelves_per_rack: u32,
    /// Collections per cycle; sample sizes must divide evenly by it.
    #[serde(default = "default_collections")]
    pub collections_per_cycle: u32,
    /// File name of the master ledger at the experiment root.
    #[serde(default = "default_master_name")]
    pub master_name: String,
}

fn default_containers() -> u32 {
    DEFAULT_CONTAINERS
}

fn default_slots() -> u32 {
    DEFAULT_SLOTS_PER_CONTAINER
}

fn default_shelves_per_rack() -> u32 {
    DEFAULT_SHELVES_PER_RACK
}

fn default_collections() -> u32 {
    DEFAULT_COLLECTIONS_PER_CYCLE
}

fn default_master_name() -> String {
    DEFAULT_MASTER_NAME.to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            containers: default_containers(),
            slots_per_container: default_slots(),
            shelves_per_rack: default_shelves_per_rack(),
            collections_per_cycle: default_collections(),
            master_name: default_master_name(),
        }
    }
}

impl ScheduleConfig {
    /// Parses a YAML document.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ShelfError> {
        let config: Self = serde_yaml::from_str(contents).map_err(|err| {
            ShelfError::Config(
                ErrorInfo::new("config-parse", "invalid schedule configuration")
                    .with_hint(err.to_string()),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, ShelfError> {
        let contents =
            std::fs::read_to_string(path).map_err(|err| ShelfError::io("config-read", path, err))?;
        Self::from_yaml_str(&contents).map_err(|err| match err {
            ShelfError::Config(info) => ShelfError::Config(info.with_path(path)),
            other => other,
        })
    }

    /// Checks fields the placement topology does not cover.
    pub fn validate(&self) -> Result<(), ShelfError> {
        if self.master_name.trim().is_empty() {
            return Err(ShelfError::Config(ErrorInfo::new(
                "config-master-name",
                "master file name must not be empty",
            )));
        }
        if self.collections_per_cycle == 0 {
            return Err(ShelfError::Config(ErrorInfo::new(
                "collections-zero",
                "collections per cycle must be positive",
            )));
        }
        Ok(())
    }

    /// Placement topology for one run with the experiment's control count and
    /// an optional per-container override. Validated before returning.
    pub fn placement(
        &self,
        controls_per_collection: u32,
        conditions_per_container: Option<u32>,
    ) -> Result<PlacementConfig, ShelfError> {
        let placement = PlacementConfig {
            containers: self.containers,
            per_slot_capacity: self.slots_per_container,
            controls_per_collection,
            shelves_per_rack: self.shelves_per_rack,
            conditions_per_container,
        };
        placement.draw_per_container()?;
        Ok(placement)
    }
}
