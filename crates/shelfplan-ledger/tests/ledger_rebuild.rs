use std::collections::BTreeMap;

use proptest::prelude::*;
use shelfplan_core::{CycleDate, TrialQueue};
use shelfplan_ledger::{master_csv_bytes, rebuild, reconcile};
use shelfplan_place::{PlacementRow, WeekTable};

fn cycle(text: &str) -> CycleDate {
    CycleDate::parse(text).expect("monday")
}

fn row(condition: &str, amendments: &str) -> PlacementRow {
    PlacementRow {
        condition: condition.into(),
        amendments: amendments.into(),
        ..PlacementRow::default()
    }
}

fn history() -> Vec<WeekTable> {
    vec![
        WeekTable::new(
            cycle("2025-10-13"),
            vec![row("A", "-1"), row("A", ""), row("B", "ok"), row("control", "-1")],
        ),
        WeekTable::new(cycle("2025-10-20"), vec![row("B", "-1.0"), row("C", "")]),
    ]
}

#[test]
fn rebuild_counts_trials_and_skips_controls() {
    let counts = rebuild(&history());
    assert_eq!(counts.failures_of("A"), 1);
    assert_eq!(counts.successes_of("A"), 1);
    assert_eq!(counts.failures_of("B"), 1);
    assert_eq!(counts.successes_of("B"), 1);
    assert_eq!(counts.successes_of("C"), 1);
    assert!(!counts.failures.contains_key("control"));
    assert!(!counts.successes.contains_key("control"));
}

#[test]
fn rebuild_is_idempotent() {
    let tables = history();
    assert_eq!(rebuild(&tables), rebuild(&tables));
}

#[test]
fn completed_counts_are_zero_filled() {
    let counts = rebuild(&history());
    let conditions = vec!["A".to_string(), "D".to_string()];
    let completed = counts.completed_counts(&conditions);
    assert_eq!(completed.get("A"), Some(&1));
    assert_eq!(completed.get("D"), Some(&0));
    assert_eq!(completed.len(), 2);
}

#[test]
fn reconcile_appends_only_the_delta() {
    let mut queue = TrialQueue::from_units(vec!["C".into()]);
    let totals = BTreeMap::from([("A".to_string(), 1u32)]);

    let first = reconcile(&mut queue, &totals, &BTreeMap::new());
    assert_eq!(first.appended_total(), 1);
    assert_eq!(queue.as_slice(), ["C".to_string(), "A".to_string()]);
    assert_eq!(first.failure_counts.get("A"), Some(&1));

    let second = reconcile(&mut queue, &totals, &first.failure_counts);
    assert_eq!(second.appended_total(), 0);
    assert_eq!(queue.len(), 2);
    assert_eq!(second.failure_counts, first.failure_counts);
}

#[test]
fn reconcile_keeps_conditions_missing_from_totals() {
    let mut queue = TrialQueue::default();
    let already = BTreeMap::from([("Z".to_string(), 3u32)]);
    let totals = BTreeMap::from([("A".to_string(), 2u32)]);
    let result = reconcile(&mut queue, &totals, &already);
    assert_eq!(result.failure_counts.get("Z"), Some(&3));
    assert_eq!(result.failure_counts.get("A"), Some(&2));
    assert_eq!(queue.count_of("A"), 2);
}

#[test]
fn shrinking_failures_append_nothing() {
    let mut queue = TrialQueue::default();
    let already = BTreeMap::from([("A".to_string(), 2u32)]);
    let totals = BTreeMap::from([("A".to_string(), 1u32)]);
    let result = reconcile(&mut queue, &totals, &already);
    assert!(queue.is_empty());
    assert!(result.appended.is_empty());
    assert_eq!(result.failure_counts.get("A"), Some(&1));
}

#[test]
fn master_file_flags_outcomes() {
    let bytes = master_csv_bytes(&history()).expect("master");
    let text = String::from_utf8(bytes).expect("utf8");
    let mut lines = text.lines();
    let header = lines.next().expect("header");
    assert!(header.ends_with("week,is_failure,is_success"));
    let first = lines.next().expect("row");
    assert!(first.contains(",A,"));
    assert!(first.ends_with("2025-10-13,true,false"));
    assert!(text.lines().any(|l| l.contains(",control,") && l.ends_with("false,false")));
    assert_eq!(text.lines().count(), 7);
}

proptest! {
    #[test]
    fn repeated_reconcile_never_requeues_twice(
        failures in proptest::collection::btree_map("[A-E]", 0u32..5, 0..5),
    ) {
        let mut queue = TrialQueue::default();
        let first = reconcile(&mut queue, &failures, &BTreeMap::new());
        let after_first = queue.len();
        prop_assert_eq!(after_first as u32, failures.values().sum::<u32>());
        let second = reconcile(&mut queue, &failures, &first.failure_counts);
        prop_assert_eq!(second.appended_total(), 0);
        prop_assert_eq!(queue.len(), after_first);
    }
}
