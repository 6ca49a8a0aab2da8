//! Weekly cycle orchestration: experiment start, roll-forward and status.
//!
//! Every mutating entry point validates its inputs before touching the
//! filesystem, then holds the experiment lock while it writes. Each cycle
//! moves through [`CyclePhase`] in order and the returned [`CycleReport`]
//! records the last phase reached.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use shelfplan_core::errors::{ErrorInfo, ShelfError};
use shelfplan_core::rng::{PLACEMENT_SUBSTREAM, QUEUE_SUBSTREAM};
use shelfplan_core::{
    derive_substream_seed, replicate_factor, to_json_pretty, ConditionCatalog, CycleDate,
    ExperimentState, RngHandle, TrialQueue,
};
use shelfplan_ledger::{
    cycle_dirs, load_history, master_csv_bytes, rebuild, reconcile, snapshot_name, LedgerCounts,
};
use shelfplan_place::{place_batch, Placement, PlacementConfig, WeekTable};
use tracing::{debug, info};

use crate::config::ScheduleConfig;
use crate::picks::NextPicks;
use crate::store::{
    atomic_write, backup_name, load_state, save_state, timestamp, write_table, ExperimentLayout,
    StateLock, NEXT_PICKS_FILE,
};

/// Progress of one cycle through the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// No state exists yet.
    New,
    /// A table was placed and outcomes are being recorded.
    AwaitingOutcomes,
    /// The next batch is drawn but nothing is written.
    Placed,
    /// Table and state for the cycle are on disk.
    Persisted,
    /// Ledger, master file and reports are written.
    RolledForward,
}

/// Inputs to [`initialize`].
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// First cycle start.
    pub date: CycleDate,
    /// Successful rows required per condition; must equal every catalog target.
    pub sample_size: u32,
    pub controls_per_collection: u32,
    /// Master seed for the queue shuffle and every placement.
    pub seed: u64,
    /// Overrides the free capacity per container.
    pub conditions_per_container: Option<u32>,
    pub config: ScheduleConfig,
}

/// Inputs to [`roll_forward`].
#[derive(Debug, Clone)]
pub struct AdvanceOptions {
    /// Defaults to the current cycle plus seven days.
    pub next_date: Option<CycleDate>,
    pub conditions_per_container: Option<u32>,
    /// Also write `next_conditions.json` into the closed cycle's directory.
    pub emit_next_picks: bool,
    pub seed: u64,
    pub config: ScheduleConfig,
}

/// Outcome of a controller operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub phase: CyclePhase,
    /// Cycle whose table was written by this operation.
    pub cycle: CycleDate,
    pub placed_units: usize,
    pub rows: usize,
    /// Units left in the queue after the draw.
    pub remaining: usize,
    /// Failure units requeued by this operation, per condition.
    pub appended: BTreeMap<String, u32>,
    pub completed_counts: BTreeMap<String, u32>,
    /// Every condition has reached its target.
    pub complete: bool,
    /// Files written, in write order.
    pub written: Vec<PathBuf>,
}

/// Read-only view of an experiment at one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub cycle: CycleDate,
    pub phase: CyclePhase,
    pub ledger: LedgerCounts,
    /// Successes per catalog condition, zero-filled.
    pub completed_counts: BTreeMap<String, u32>,
    /// Recorded failures not yet requeued, per condition.
    pub unreconciled_failures: BTreeMap<String, u32>,
    pub remaining: usize,
    pub target_replicates_total: u32,
    pub complete: bool,
}

/// Placement stream for `cycle`, derived from the master seed.
pub fn placement_rng(seed: u64, cycle: CycleDate) -> RngHandle {
    let stage = derive_substream_seed(seed, PLACEMENT_SUBSTREAM);
    RngHandle::substream(stage, cycle.date().num_days_from_ce() as u64)
}

/// Starts an experiment: builds the queue, places the first cycle and writes
/// its table and state plus the root state.
pub fn initialize(
    root: &Path,
    catalog: &ConditionCatalog,
    options: &InitOptions,
) -> Result<CycleReport, ShelfError> {
    options.config.validate()?;
    let factor = replicate_factor(options.sample_size, options.config.collections_per_cycle)?;
    if let Some(condition) = catalog.off_target(options.sample_size).next() {
        return Err(ShelfError::Config(
            ErrorInfo::new(
                "catalog-target-mismatch",
                "condition target differs from the sample size",
            )
            .with_context("condition", condition.id.clone())
            .with_context("target_replicates", condition.target_replicates.to_string())
            .with_context("sample_size", options.sample_size.to_string()),
        ));
    }
    let placement_config = options
        .config
        .placement(options.controls_per_collection, options.conditions_per_container)?;
    let layout = ExperimentLayout::new(root);
    if layout.state_path(options.date).exists() {
        return Err(ShelfError::Validation(
            ErrorInfo::new("cycle-exists", "cycle already has a state file")
                .with_path(&layout.state_path(options.date)),
        ));
    }

    let _lock = StateLock::acquire(root)?;
    info!(
        cycle = %options.date,
        conditions = catalog.len(),
        replicate_factor = factor,
        seed = options.seed,
        "initializing experiment"
    );

    let mut queue_rng = RngHandle::substream(options.seed, QUEUE_SUBSTREAM);
    let queue = TrialQueue::initialize(&catalog.ids(), factor, &mut queue_rng);
    let mut state = ExperimentState::new(catalog, queue, options.controls_per_collection);

    let (placement, rest) = draw(&mut state, options.date, &placement_config, options.seed)?;
    state.remaining = rest;

    let mut written = Vec::new();
    persist_cycle(&layout, options.date, &placement, &state, &mut written)?;
    let root_state = layout.root_state_path();
    save_state(&root_state, &state)?;
    written.push(root_state);

    info!(
        cycle = %options.date,
        placed = placement.placed_units(),
        remaining = state.remaining.len(),
        "experiment initialized"
    );
    Ok(CycleReport {
        phase: CyclePhase::Persisted,
        cycle: options.date,
        placed_units: placement.placed_units(),
        rows: placement.table.rows.len(),
        remaining: state.remaining.len(),
        appended: BTreeMap::new(),
        completed_counts: state.completed_counts.clone(),
        complete: state.is_complete(),
        written,
    })
}

/// Closes `current` and places the next cycle.
///
/// Rebuilds the ledger from every table up to `current`, requeues failures
/// not yet reconciled, draws the next batch and writes the next cycle's
/// table and state, the backups, the root state and the master files.
pub fn roll_forward(
    root: &Path,
    current: CycleDate,
    options: &AdvanceOptions,
) -> Result<CycleReport, ShelfError> {
    options.config.validate()?;
    let next = resolve_next(current, options.next_date)?;
    let layout = ExperimentLayout::new(root);

    let _lock = StateLock::acquire(root)?;
    let mut state = load_state(&layout.state_path(current))?;
    let current_table = layout.table_path(current);
    if !current_table.is_file() {
        return Err(ShelfError::Io(
            ErrorInfo::new("table-missing", "current cycle has no placement table")
                .with_path(&current_table),
        ));
    }
    let placement_config = options
        .config
        .placement(state.controls_per_collection, options.conditions_per_container)?;

    let tables = load_history(root, current)?;
    ensure_known_conditions(&layout, &tables, &state)?;
    let ledger = rebuild(&tables);
    let reconciliation = reconcile(&mut state.remaining, &ledger.failures, &state.failure_counts);
    state.failure_counts = reconciliation.failure_counts.clone();
    state.completed_counts = ledger.completed_counts(&state.conditions);
    info!(
        cycle = %current,
        tables = tables.len(),
        requeued = reconciliation.appended_total(),
        "ledger rebuilt"
    );

    let (placement, rest) = draw(&mut state, next, &placement_config, options.seed)?;
    state.remaining = rest;

    let stamp = timestamp();
    let mut written = Vec::new();
    persist_cycle(&layout, next, &placement, &state, &mut written)?;
    for dir in [layout.cycle_dir(next), layout.cycle_dir(current)] {
        let backup = dir.join(backup_name(&stamp));
        save_state(&backup, &state)?;
        written.push(backup);
    }
    let root_state = layout.root_state_path();
    save_state(&root_state, &state)?;
    written.push(root_state);

    let master_bytes = master_csv_bytes(&tables)?;
    let master_root = root.join(&options.config.master_name);
    let master_snapshot = layout.cycle_dir(current).join(snapshot_name(&stamp));
    atomic_write(&master_root, &master_bytes)?;
    atomic_write(&master_snapshot, &master_bytes)?;
    written.push(master_root.clone());
    written.push(master_snapshot.clone());

    if options.emit_next_picks {
        let picks = NextPicks::build(
            next,
            placement_config.draw_per_container()?,
            &placement,
            &reconciliation.appended,
            (
                &master_root.display().to_string(),
                &master_snapshot.display().to_string(),
            ),
            &state,
        )?;
        let path = layout.cycle_dir(next).join(NEXT_PICKS_FILE);
        atomic_write(&path, &to_json_pretty(&picks)?)?;
        written.push(path);
    }

    let complete = state.is_complete();
    info!(
        current = %current,
        next = %next,
        placed = placement.placed_units(),
        remaining = state.remaining.len(),
        complete,
        "rolled forward"
    );
    Ok(CycleReport {
        phase: CyclePhase::RolledForward,
        cycle: next,
        placed_units: placement.placed_units(),
        rows: placement.table.rows.len(),
        remaining: state.remaining.len(),
        appended: reconciliation.appended,
        completed_counts: state.completed_counts,
        complete,
        written,
    })
}

/// Reports ledger and completion for `current` without writing anything.
pub fn status(root: &Path, current: CycleDate) -> Result<StatusReport, ShelfError> {
    let layout = ExperimentLayout::new(root);
    let state_path = layout.state_path(current);
    if !state_path.is_file() {
        return Ok(StatusReport {
            cycle: current,
            phase: CyclePhase::New,
            ledger: LedgerCounts::default(),
            completed_counts: BTreeMap::new(),
            unreconciled_failures: BTreeMap::new(),
            remaining: 0,
            target_replicates_total: 0,
            complete: false,
        });
    }
    let state = load_state(&state_path)?;
    let tables = load_history(root, current)?;
    let ledger = rebuild(&tables);
    let completed_counts = ledger.completed_counts(&state.conditions);
    let unreconciled_failures = ledger
        .failures
        .iter()
        .filter_map(|(condition, &total)| {
            let pending = total.saturating_sub(state.reconciled_failures(condition));
            (pending > 0).then(|| (condition.clone(), pending))
        })
        .collect();
    let mut rebuilt = state.clone();
    rebuilt.completed_counts = completed_counts.clone();
    let rolled_forward = cycle_dirs(root)?
        .into_iter()
        .any(|(cycle, _)| cycle > current && layout.state_path(cycle).is_file());
    let phase = if rolled_forward {
        CyclePhase::RolledForward
    } else {
        CyclePhase::AwaitingOutcomes
    };
    Ok(StatusReport {
        cycle: current,
        phase,
        ledger,
        completed_counts,
        unreconciled_failures,
        remaining: state.remaining.len(),
        target_replicates_total: state.target_replicates_total,
        complete: rebuilt.is_complete(),
    })
}

/// Completion predicate over a persisted state.
pub fn is_complete(state: &ExperimentState) -> bool {
    state.is_complete()
}

fn resolve_next(current: CycleDate, requested: Option<CycleDate>) -> Result<CycleDate, ShelfError> {
    match requested {
        Some(next) if next <= current => Err(ShelfError::Validation(
            ErrorInfo::new("next-date-order", "next cycle must start after the current one")
                .with_context("current", current.folder_name())
                .with_context("next", next.folder_name()),
        )),
        Some(next) => Ok(next),
        None => Ok(current.next()),
    }
}

/// Rejects history rows naming a condition outside the catalog, which would
/// otherwise be requeued into a state that no longer loads.
fn ensure_known_conditions(
    layout: &ExperimentLayout,
    tables: &[WeekTable],
    state: &ExperimentState,
) -> Result<(), ShelfError> {
    let known: BTreeSet<&str> = state.conditions.iter().map(String::as_str).collect();
    for table in tables {
        let unknown = table
            .rows
            .iter()
            .find(|row| row.is_trial() && !known.contains(row.condition.as_str()));
        if let Some(row) = unknown {
            return Err(ShelfError::Validation(
                ErrorInfo::new(
                    "table-unknown-condition",
                    "placement table names a condition outside the catalog",
                )
                .with_context("condition", row.condition.clone())
                .with_context("cycle", table.cycle.folder_name())
                .with_path(&layout.table_path(table.cycle))
                .with_hint("correct the condition in the table and rerun"),
            ));
        }
    }
    Ok(())
}

fn draw(
    state: &mut ExperimentState,
    cycle: CycleDate,
    config: &PlacementConfig,
    seed: u64,
) -> Result<(Placement, TrialQueue), ShelfError> {
    let mut rng = placement_rng(seed, cycle);
    let queue = std::mem::take(&mut state.remaining);
    let drawn = place_batch(
        queue,
        cycle,
        &cycle.staging_dates(),
        config,
        &state.condition_locations,
        &mut rng,
    )?;
    debug!(cycle = %cycle, phase = ?CyclePhase::Placed, "batch drawn");
    Ok(drawn)
}

fn persist_cycle(
    layout: &ExperimentLayout,
    cycle: CycleDate,
    placement: &Placement,
    state: &ExperimentState,
    written: &mut Vec<PathBuf>,
) -> Result<(), ShelfError> {
    let table = layout.table_path(cycle);
    write_table(&table, &placement.table)?;
    written.push(table);
    let state_path = layout.state_path(cycle);
    save_state(&state_path, state)?;
    written.push(state_path);
    debug!(cycle = %cycle, phase = ?CyclePhase::Persisted, "cycle written");
    Ok(())
}
