use std::error::Error;
use std::path::PathBuf;

use shelfplan_core::{ConditionCatalog, CycleDate};
use shelfplan_cycle::{initialize, InitOptions};

use super::{load_config, resolve_seed};

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Experiment root directory.
    #[arg(long)]
    pub root: PathBuf,
    /// First cycle start (a Monday), YYYY-MM-DD or DD-MM-YYYY.
    #[arg(long)]
    pub date: CycleDate,
    /// Successful rows required per condition; must divide by the collections per cycle.
    #[arg(long)]
    pub sample_size: u32,
    /// Control slots added to every container layout.
    #[arg(long)]
    pub controls_per_collection: u32,
    /// CSV with a `conditions` column.
    #[arg(long)]
    pub conditions: PathBuf,
    /// Stock CSV with `ID`, `Tray` and `Location` columns.
    #[arg(long)]
    pub stock: PathBuf,
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
    let config = load_config(args.config.as_ref())?;
    let catalog = ConditionCatalog::from_csv(&args.conditions, &args.stock, args.sample_size)?;
    let options = InitOptions {
        date: args.date,
        sample_size: args.sample_size,
        controls_per_collection: args.controls_per_collection,
        seed: resolve_seed(args.seed),
        conditions_per_container: args.per_container_conditions,
        config,
    };
    let report = initialize(&args.root, &catalog, &options)?;
    println!(
        "Initialized {} with {} conditions: placed {} units, {} remaining.",
        report.cycle,
        catalog.len(),
        report.placed_units,
        report.remaining
    );
    for path in &report.written {
        println!("  - {}", path.display());
    }
    Ok(())
}
