use serde::{Deserialize, Serialize};
use shelfplan_core::errors::{ErrorInfo, ShelfError};

/// Slots per container in the incubators the historical tables were built for.
pub const DEFAULT_SLOTS_PER_CONTAINER: u32 = 24;
/// Incubators used per cycle.
pub const DEFAULT_CONTAINERS: u32 = 2;
/// Shelves shared by the consecutive dates of one rack.
pub const DEFAULT_SHELVES_PER_RACK: u32 = 2;

/// Physical topology and control policy for one placement run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Number of containers (incubators) filled per cycle.
    pub containers: u32,
    /// Slots available to one container on one date, controls included.
    pub per_slot_capacity: u32,
    /// Control slots appended to every non-empty container layout.
    pub controls_per_collection: u32,
    /// Distinct shelves each rack offers to its consecutive dates.
    pub shelves_per_rack: u32,
    /// Overrides the number of condition units drawn per container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions_per_container: Option<u32>,
}

impl PlacementConfig {
    /// Historical defaults with the given control count.
    pub fn with_controls(controls_per_collection: u32) -> Self {
        Self {
            containers: DEFAULT_CONTAINERS,
            per_slot_capacity: DEFAULT_SLOTS_PER_CONTAINER,
            controls_per_collection,
            shelves_per_rack: DEFAULT_SHELVES_PER_RACK,
            conditions_per_container: None,
        }
    }

    /// Condition units to draw for each container.
    ///
    /// Fails when the controls alone, or the override plus the controls, do
    /// not fit in one container, and when no slot is left for a condition.
    pub fn draw_per_container(&self) -> Result<u32, ShelfError> {
        if self.containers == 0 || self.shelves_per_rack == 0 {
            return Err(ShelfError::Config(
                ErrorInfo::new("topology-empty", "containers and shelves per rack must be positive")
                    .with_context("containers", self.containers.to_string())
                    .with_context("shelves_per_rack", self.shelves_per_rack.to_string()),
            ));
        }
        let available = self
            .per_slot_capacity
            .checked_sub(self.controls_per_collection)
            .ok_or_else(|| {
                ShelfError::Config(
                    ErrorInfo::new("controls-exceed-capacity", "more controls than slots")
                        .with_context("per_slot_capacity", self.per_slot_capacity.to_string())
                        .with_context(
                            "controls_per_collection",
                            self.controls_per_collection.to_string(),
                        ),
                )
            })?;
        let draw = match self.conditions_per_container {
            Some(requested) if requested > available => {
                return Err(ShelfError::Config(
                    ErrorInfo::new(
                        "conditions-exceed-capacity",
                        "requested conditions plus controls exceed container capacity",
                    )
                    .with_context("requested", requested.to_string())
                    .with_context("available", available.to_string()),
                ))
            }
            Some(requested) => requested,
            None => available,
        };
        if draw == 0 {
            return Err(ShelfError::Config(
                ErrorInfo::new("no-condition-slots", "no container slot is left for a condition")
                    .with_context("per_slot_capacity", self.per_slot_capacity.to_string())
                    .with_context(
                        "controls_per_collection",
                        self.controls_per_collection.to_string(),
                    )
                    .with_hint("lower the control count or the per-container override"),
            ));
        }
        Ok(draw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_draw_leaves_room_for_controls() {
        assert_eq!(PlacementConfig::with_controls(1).draw_per_container().unwrap(), 23);
    }

    #[test]
    fn oversized_override_is_rejected() {
        let config = PlacementConfig {
            conditions_per_container: Some(24),
            ..PlacementConfig::with_controls(1)
        };
        assert_eq!(
            config.draw_per_container().unwrap_err().info().code,
            "conditions-exceed-capacity"
        );
    }

    #[test]
    fn zero_condition_slots_are_rejected() {
        let full_of_controls = PlacementConfig::with_controls(DEFAULT_SLOTS_PER_CONTAINER);
        assert_eq!(
            full_of_controls.draw_per_container().unwrap_err().info().code,
            "no-condition-slots"
        );
        let zero_override = PlacementConfig {
            conditions_per_container: Some(0),
            ..PlacementConfig::with_controls(1)
        };
        assert_eq!(
            zero_override.draw_per_container().unwrap_err().info().code,
            "no-condition-slots"
        );
    }
}
