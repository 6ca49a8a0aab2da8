use std::error::Error;
use std::path::PathBuf;

use shelfplan_core::CycleDate;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Experiment root directory.
    #[arg(long)]
    pub root: PathBuf,
    /// Cycle to report on (a Monday).
    #[arg(long)]
    pub date: CycleDate,
}

pub fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let report = shelfplan_cycle::status(&args.root, args.date)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
