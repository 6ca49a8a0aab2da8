pub mod advance;
pub mod init;
pub mod status;

use std::error::Error;
use std::path::PathBuf;

use shelfplan_core::rng::wall_clock_seed;
use shelfplan_cycle::ScheduleConfig;
use tracing::info;

pub(crate) fn load_config(path: Option<&PathBuf>) -> Result<ScheduleConfig, Box<dyn Error>> {
    match path {
        Some(path) => Ok(ScheduleConfig::load(path)?),
        None => Ok(ScheduleConfig::default()),
    }
}

pub(crate) fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        let seed = wall_clock_seed();
        info!(seed, "no seed given; derived one from the clock");
        seed
    })
}
