//! Draws a cycle's batch from the trial queue and lays it out on racks,
//! shelves and positions for every staging date.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use shelfplan_core::errors::ShelfError;
use shelfplan_core::{CycleDate, RngHandle, TrialQueue, CONTROL_MARKER};
use tracing::debug;

use crate::config::PlacementConfig;
use crate::table::{PlacementRow, WeekTable};

/// Units drawn for one container, in queue order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDraw {
    /// 1-based container index.
    pub container: u32,
    /// Value written in the `incubator` column.
    pub label: String,
    /// Condition units drawn, controls excluded.
    pub units: Vec<String>,
}

/// Result of placing one cycle's batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Rows for every (date, container) pair that drew units.
    pub table: WeekTable,
    /// One entry per container, in container order.
    pub draws: Vec<ContainerDraw>,
}

impl Placement {
    /// Total condition units consumed from the queue.
    pub fn placed_units(&self) -> usize {
        self.draws.iter().map(|draw| draw.units.len()).sum()
    }
}

/// Label written in the `incubator` column for container `n` (1-based).
pub fn container_label(container: u32) -> String {
    format!("incubator-{container}")
}

/// Assigns the next batch of trial units to the cycle's shelves.
///
/// Each container draws its units from the queue front in container order and
/// keeps that membership (plus the control slots) for the whole cycle. The
/// physical order is reshuffled for every date. Consecutive dates share a
/// rack, and each container gets a fixed per-rack shelf permutation so two
/// dates of one rack never land on the same shelf. Containers that draw
/// nothing emit no rows.
pub fn place_batch(
    mut remaining: TrialQueue,
    cycle: CycleDate,
    dates: &[String],
    config: &PlacementConfig,
    locations: &BTreeMap<String, String>,
    rng: &mut RngHandle,
) -> Result<(Placement, TrialQueue), ShelfError> {
    let per_container = config.draw_per_container()? as usize;

    let mut draws = Vec::with_capacity(config.containers as usize);
    for container in 1..=config.containers {
        let units = remaining.take(per_container);
        debug!(
            container,
            drawn = units.len(),
            target = per_container,
            "drew condition units"
        );
        draws.push(ContainerDraw {
            container,
            label: container_label(container),
            units,
        });
    }

    let layouts: Vec<Vec<String>> = draws
        .iter()
        .map(|draw| {
            let mut layout = draw.units.clone();
            if !layout.is_empty() {
                layout.extend(
                    std::iter::repeat(CONTROL_MARKER.to_string())
                        .take(config.controls_per_collection as usize),
                );
            }
            layout
        })
        .collect();

    let spr = config.shelves_per_rack as usize;
    let racks = dates.len().div_ceil(spr);
    let shelf_maps: Vec<Vec<Vec<u32>>> = draws
        .iter()
        .map(|_| {
            (0..racks)
                .map(|_| {
                    let mut shelves: Vec<u32> = (1..=config.shelves_per_rack).collect();
                    shelves.shuffle(rng);
                    shelves
                })
                .collect()
        })
        .collect();

    let mut rows = Vec::new();
    for (idx, date) in dates.iter().enumerate() {
        let rack_idx = idx / spr;
        let slot_in_rack = idx % spr;
        for (draw, (layout, shelf_map)) in draws.iter().zip(layouts.iter().zip(&shelf_maps)) {
            if layout.is_empty() {
                continue;
            }
            let shelf = shelf_map[rack_idx][slot_in_rack];
            let mut arrangement = layout.clone();
            arrangement.shuffle(rng);
            for (position, condition) in arrangement.into_iter().enumerate() {
                let location = locations.get(&condition).cloned().unwrap_or_default();
                rows.push(PlacementRow {
                    incubator: draw.label.clone(),
                    shelf: format!("shelf-{shelf}"),
                    rack: format!("rack-{}", rack_idx + 1),
                    position: Some(position as u32 + 1),
                    condition,
                    location,
                    staging_date: date.clone(),
                    ..PlacementRow::default()
                });
            }
        }
    }

    let placement = Placement {
        table: WeekTable::new(cycle, rows),
        draws,
    };
    debug!(
        cycle = %cycle,
        rows = placement.table.rows.len(),
        placed = placement.placed_units(),
        remaining = remaining.len(),
        "placed batch"
    );
    Ok((placement, remaining))
}
