//! Outcome ledger: loads historical cycle tables, rebuilds per-condition
//! success and failure counts from scratch, and requeues only the failures
//! not yet reconciled.

mod history;
mod ledger;
mod master;
mod reconcile;

pub use history::{cycle_dirs, load_history, TABLE_FILE};
pub use ledger::{rebuild, LedgerCounts};
pub use master::{master_csv_bytes, snapshot_name, DEFAULT_MASTER_NAME};
pub use reconcile::{reconcile, Reconciliation};
