use std::error::Error;
use std::path::PathBuf;

use shelfplan_core::CycleDate;
use shelfplan_cycle::{roll_forward, AdvanceOptions};

use super::{load_config, resolve_seed};

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Experiment root directory.
    #[arg(long)]
    pub root: PathBuf,
    /// Cycle being closed (a Monday).
    #[arg(long)]
    pub date: CycleDate,
    /// Start of the next cycle; defaults to a week after `--date`.
    #[arg(long)]
    pub next_date: Option<CycleDate>,
    /// Master ledger file name at the root.
    #[arg(long)]
    pub master_name: Option<String>,
    /// Also write next_conditions.json into the next cycle directory.
    #[arg(long)]
    pub emit_next_picks: bool,
    /// Condition units per container instead of the free capacity.
    #[arg(long)]
    pub per_container_conditions: Option<u32>,
    /// Master seed; derived from the clock when omitted.
    #[arg(long)]
    pub seed: Option<u64>,
    /// YAML schedule configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(name) = &args.master_name {
        config.master_name = name.clone();
    }
    let options = AdvanceOptions {
        next_date: args.next_date,
        conditions_per_container: args.per_container_conditions,
        emit_next_picks: args.emit_next_picks,
        seed: resolve_seed(args.seed),
        config,
    };
    let report = roll_forward(&args.root, args.date, &options)?;
    let requeued: u32 = report.appended.values().sum();
    println!(
        "Placed {} units for {} ({} requeued failures, {} remaining).",
        report.placed_units, report.cycle, requeued, report.remaining
    );
    for path in &report.written {
        println!("  - {}", path.display());
    }
    if report.complete {
        println!("All conditions reached their replicate target.");
    }
    Ok(())
}
