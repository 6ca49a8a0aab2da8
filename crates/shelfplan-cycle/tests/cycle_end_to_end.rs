use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use shelfplan_core::{ConditionCatalog, CycleDate, ShelfError};
use shelfplan_cycle::store::{NEXT_PICKS_FILE, STATE_FILE};
use shelfplan_cycle::{
    initialize, load_state, roll_forward, status, AdvanceOptions, CyclePhase, InitOptions,
    NextPicks, ScheduleConfig, StateLock,
};
use shelfplan_place::WeekTable;

const SEED: u64 = 20251013;

fn monday() -> CycleDate {
    CycleDate::parse("2025-10-13").expect("monday")
}

fn catalog() -> ConditionCatalog {
    let locations = BTreeMap::from([("A".to_string(), "T1-A01".to_string())]);
    ConditionCatalog::from_ids(["A", "B", "C", "D"], 6, &locations).expect("catalog")
}

fn init_options() -> InitOptions {
    InitOptions {
        date: monday(),
        sample_size: 6,
        controls_per_collection: 1,
        seed: SEED,
        conditions_per_container: None,
        config: ScheduleConfig::default(),
    }
}

fn advance_options() -> AdvanceOptions {
    AdvanceOptions {
        next_date: None,
        conditions_per_container: None,
        emit_next_picks: true,
        seed: SEED,
        config: ScheduleConfig::default(),
    }
}

fn mark_one_failure(root: &Path, cycle: CycleDate, condition: &str) {
    let path = root.join(cycle.folder_name()).join("shelves.csv");
    let mut table = WeekTable::read_csv(&path, cycle).expect("table");
    let row = table
        .rows
        .iter_mut()
        .find(|row| row.condition == condition)
        .expect("condition row");
    row.amendments = "-1".into();
    fs::write(&path, table.to_csv_bytes().expect("csv")).expect("rewrite");
}

#[test]
fn initialize_places_the_whole_small_batch() {
    let root = tempfile::tempdir().expect("tempdir");
    let report = initialize(root.path(), &catalog(), &init_options()).expect("init");

    assert_eq!(report.phase, CyclePhase::Persisted);
    assert_eq!(report.placed_units, 4);
    assert_eq!(report.remaining, 0);
    assert_eq!(report.rows, 6 * 5);

    let table = WeekTable::read_csv(&root.path().join("2025-10-13/shelves.csv"), monday())
        .expect("table");
    assert!(table.rows.iter().all(|row| row.incubator == "incubator-1"));
    assert!(table
        .rows
        .iter()
        .filter(|row| row.condition == "A")
        .all(|row| row.location == "T1-A01"));

    let state = load_state(&root.path().join(STATE_FILE)).expect("root state");
    assert_eq!(state.target_replicates_total, 6);
    assert!(state.remaining.is_empty());
    assert!(!root.path().join(".shelfplan.lock").exists());
}

#[test]
fn initialize_is_deterministic_under_a_seed() {
    let first = tempfile::tempdir().expect("tempdir");
    let second = tempfile::tempdir().expect("tempdir");
    initialize(first.path(), &catalog(), &init_options()).expect("init");
    initialize(second.path(), &catalog(), &init_options()).expect("init");
    let read = |root: &Path| fs::read(root.join("2025-10-13/shelves.csv")).expect("read");
    assert_eq!(read(first.path()), read(second.path()));
}

#[test]
fn indivisible_sample_size_writes_nothing() {
    let root = tempfile::tempdir().expect("tempdir");
    let options = InitOptions {
        sample_size: 7,
        ..init_options()
    };
    let err = initialize(root.path(), &catalog(), &options).unwrap_err();
    assert!(matches!(err, ShelfError::Config(_)));
    assert_eq!(fs::read_dir(root.path()).expect("list").count(), 0);
}

#[test]
fn failure_is_requeued_exactly_once() {
    let root = tempfile::tempdir().expect("tempdir");
    initialize(root.path(), &catalog(), &init_options()).expect("init");
    mark_one_failure(root.path(), monday(), "A");

    let first = roll_forward(root.path(), monday(), &advance_options()).expect("advance");
    assert_eq!(first.phase, CyclePhase::RolledForward);
    assert_eq!(first.cycle.folder_name(), "2025-10-20");
    assert_eq!(first.appended, BTreeMap::from([("A".to_string(), 1)]));
    assert_eq!(first.placed_units, 1);
    assert_eq!(first.completed_counts.get("A"), Some(&5));
    assert!(!first.complete);

    let next = monday().next();
    let state = load_state(&root.path().join("2025-10-20").join(STATE_FILE)).expect("state");
    assert_eq!(state.failure_counts.get("A"), Some(&1));

    let picks: NextPicks = serde_json::from_slice(
        &fs::read(root.path().join("2025-10-20").join(NEXT_PICKS_FILE)).expect("picks"),
    )
    .expect("picks json");
    assert_eq!(picks.week_commencing, "20-10-2025");
    assert_eq!(picks.picked_total, 1);
    assert_eq!(picks.per_container_target, 23);
    assert_eq!(picks.state_digest, state.digest().expect("digest"));
    assert!(root.path().join("master-file.csv").is_file());

    let second = roll_forward(root.path(), next, &advance_options()).expect("advance");
    assert!(second.appended.is_empty());
    let state = load_state(&root.path().join("2025-10-27").join(STATE_FILE)).expect("state");
    assert_eq!(state.failure_counts.get("A"), Some(&1));
    assert!(second.complete);
}

#[test]
fn rerunning_a_roll_forward_matches_the_first_run() {
    let root = tempfile::tempdir().expect("tempdir");
    initialize(root.path(), &catalog(), &init_options()).expect("init");
    mark_one_failure(root.path(), monday(), "B");

    let options = AdvanceOptions {
        emit_next_picks: false,
        ..advance_options()
    };
    let first = roll_forward(root.path(), monday(), &options).expect("advance");
    let table = fs::read(root.path().join("2025-10-20/shelves.csv")).expect("table");
    let second = roll_forward(root.path(), monday(), &options).expect("advance again");
    assert_eq!(first.appended, second.appended);
    assert_eq!(
        table,
        fs::read(root.path().join("2025-10-20/shelves.csv")).expect("table")
    );
}

#[test]
fn next_date_must_follow_current() {
    let root = tempfile::tempdir().expect("tempdir");
    initialize(root.path(), &catalog(), &init_options()).expect("init");
    let options = AdvanceOptions {
        next_date: Some(monday()),
        ..advance_options()
    };
    let err = roll_forward(root.path(), monday(), &options).unwrap_err();
    assert_eq!(err.info().code, "next-date-order");
    assert!(!root.path().join("2025-10-20").exists());
}

#[test]
fn wrong_weekday_never_reaches_the_controller() {
    let err = CycleDate::parse("2025-10-14").unwrap_err();
    assert!(matches!(err, ShelfError::Validation(_)));
}

#[test]
fn held_lock_rejects_roll_forward() {
    let root = tempfile::tempdir().expect("tempdir");
    initialize(root.path(), &catalog(), &init_options()).expect("init");
    let lock = StateLock::acquire(root.path()).expect("lock");

    let err = roll_forward(root.path(), monday(), &advance_options()).unwrap_err();
    assert!(matches!(err, ShelfError::Io(_)));
    assert_eq!(err.info().code, "lock-held");
    assert!(err.info().context["path"].ends_with(".shelfplan.lock"));
    assert!(!root.path().join("2025-10-20").exists());
    drop(lock);
}

#[test]
fn missing_current_table_is_an_io_error() {
    let root = tempfile::tempdir().expect("tempdir");
    initialize(root.path(), &catalog(), &init_options()).expect("init");
    fs::remove_file(root.path().join("2025-10-13/shelves.csv")).expect("remove");
    let err = roll_forward(root.path(), monday(), &advance_options()).unwrap_err();
    assert_eq!(err.info().code, "table-missing");
}

#[test]
fn status_reports_without_writing() {
    let root = tempfile::tempdir().expect("tempdir");
    initialize(root.path(), &catalog(), &init_options()).expect("init");
    mark_one_failure(root.path(), monday(), "C");
    let entries = |root: &Path| fs::read_dir(root.join("2025-10-13")).expect("list").count();
    let before = entries(root.path());

    let report = status(root.path(), monday()).expect("status");
    assert_eq!(report.phase, CyclePhase::AwaitingOutcomes);
    assert_eq!(report.unreconciled_failures.get("C"), Some(&1));
    assert_eq!(report.completed_counts.get("C"), Some(&5));
    assert!(!report.complete);

    assert_eq!(before, entries(root.path()));
    assert!(!root.path().join("master-file.csv").exists());
}

#[test]
fn unknown_condition_in_history_is_rejected_before_writing() {
    let root = tempfile::tempdir().expect("tempdir");
    initialize(root.path(), &catalog(), &init_options()).expect("init");
    let path = root.path().join("2025-10-13/shelves.csv");
    let mut table = WeekTable::read_csv(&path, monday()).expect("table");
    let mut typo = table.rows[0].clone();
    typo.condition = "a".into();
    typo.amendments = "-1".into();
    table.rows.push(typo);
    fs::write(&path, table.to_csv_bytes().expect("csv")).expect("rewrite");

    let err = roll_forward(root.path(), monday(), &advance_options()).unwrap_err();
    assert!(matches!(err, ShelfError::Validation(_)));
    assert_eq!(err.info().code, "table-unknown-condition");
    assert_eq!(err.info().context["condition"], "a");
    assert_eq!(err.info().context["cycle"], "2025-10-13");
    assert!(err.info().context["path"].ends_with("shelves.csv"));
    assert!(!root.path().join("2025-10-20").exists());
    assert!(!root.path().join(".shelfplan.lock").exists());
}

#[test]
fn catalog_target_must_match_sample_size() {
    let root = tempfile::tempdir().expect("tempdir");
    let catalog = ConditionCatalog::from_ids(["A", "B"], 12, &BTreeMap::new()).expect("catalog");
    let err = initialize(root.path(), &catalog, &init_options()).unwrap_err();
    assert_eq!(err.info().code, "catalog-target-mismatch");
    assert_eq!(fs::read_dir(root.path()).expect("list").count(), 0);
}

#[test]
fn full_control_layout_is_rejected_before_writing() {
    let root = tempfile::tempdir().expect("tempdir");
    let options = InitOptions {
        controls_per_collection: 24,
        ..init_options()
    };
    let err = initialize(root.path(), &catalog(), &options).unwrap_err();
    assert!(matches!(err, ShelfError::Config(_)));
    assert_eq!(err.info().code, "no-condition-slots");
    assert_eq!(fs::read_dir(root.path()).expect("list").count(), 0);
}

#[test]
fn status_marks_cycles_already_rolled_forward() {
    let root = tempfile::tempdir().expect("tempdir");
    initialize(root.path(), &catalog(), &init_options()).expect("init");
    roll_forward(root.path(), monday(), &advance_options()).expect("advance");

    let closed = status(root.path(), monday()).expect("status");
    assert_eq!(closed.phase, CyclePhase::RolledForward);
    assert!(closed.complete);

    let open = status(root.path(), monday().next()).expect("status");
    assert_eq!(open.phase, CyclePhase::AwaitingOutcomes);

    let future = status(root.path(), monday().next().next()).expect("status");
    assert_eq!(future.phase, CyclePhase::New);
}
