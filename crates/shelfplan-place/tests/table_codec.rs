use std::collections::BTreeMap;
use std::fs;

use shelfplan_core::{CycleDate, RngHandle, ShelfError, TrialQueue};
use shelfplan_place::{place_batch, Outcome, PlacementConfig, WeekTable, TABLE_COLUMNS};
use tempfile::tempdir;

fn cycle() -> CycleDate {
    CycleDate::parse("2025-10-13").expect("monday")
}

#[test]
fn written_table_reads_back() {
    let queue = TrialQueue::from_units(vec!["A".into(), "B".into(), "C".into()]);
    let mut rng = RngHandle::from_seed(11);
    let (placement, _) = place_batch(
        queue,
        cycle(),
        &cycle().staging_dates(),
        &PlacementConfig::with_controls(1),
        &BTreeMap::new(),
        &mut rng,
    )
    .unwrap();
    let bytes = placement.table.to_csv_bytes().expect("csv");
    let header = String::from_utf8(bytes.clone()).unwrap();
    assert!(header.starts_with(&TABLE_COLUMNS.join(",")));

    let dir = tempdir().expect("tmp dir");
    let path = dir.path().join("shelves.csv");
    fs::write(&path, &bytes).expect("write");
    let restored = WeekTable::read_csv(&path, cycle()).expect("read");
    assert_eq!(restored, placement.table);
}

#[test]
fn legacy_table_without_positions_loads() {
    let csv = "experimenter,collector,incubator,shelf,rack,plugcamera,condition,location,staging_date,amendments,comments,staging_times\n\
               ,,incubator-1,shelf-2,rack-1,,A,T1-1,14-15/10/2025,-1.0,,\n\
               ,,incubator-1,shelf-2,rack-1,,control,,14-15/10/2025,,,\n";
    let table = WeekTable::from_reader(csv.as_bytes(), cycle()).expect("legacy");
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0].position, None);
    assert_eq!(table.rows[0].outcome(), Outcome::Failed);
    assert_eq!(table.trial_rows(), 1);
}

#[test]
fn table_without_amendments_is_malformed() {
    let csv = "incubator,condition\nincubator-1,A\n";
    let err = WeekTable::from_reader(csv.as_bytes(), cycle()).unwrap_err();
    match err {
        ShelfError::Validation(info) => {
            assert_eq!(info.code, "table-missing-column");
            assert_eq!(info.context["cycle"], "2025-10-13");
        }
        other => panic!("unexpected error {other:?}"),
    }
}
