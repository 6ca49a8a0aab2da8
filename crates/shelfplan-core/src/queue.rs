//! Ordered queue of pending trial units.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, ShelfError};
use crate::rng::RngHandle;

/// Pending trial units, one entry per required replicate, stored as condition
/// identifiers in scheduling order.
///
/// Serialises as a plain JSON array so it matches the `remaining` field of the
/// state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialQueue {
    units: Vec<String>,
}

impl TrialQueue {
    /// Shuffles `conditions` once, then repeats the shuffled order
    /// `replicate_factor` times.
    ///
    /// Repetition happens after the shuffle, so no condition appears a second
    /// time before every condition has appeared once.
    pub fn initialize(conditions: &[String], replicate_factor: u32, rng: &mut RngHandle) -> Self {
        let mut pool = conditions.to_vec();
        pool.shuffle(rng);
        let mut units = Vec::with_capacity(pool.len() * replicate_factor as usize);
        for _ in 0..replicate_factor {
            units.extend(pool.iter().cloned());
        }
        Self { units }
    }

    /// Wraps an already ordered list of units.
    pub fn from_units(units: Vec<String>) -> Self {
        Self { units }
    }

    /// Removes and returns up to `n` units from the front.
    pub fn take(&mut self, n: usize) -> Vec<String> {
        let n = n.min(self.units.len());
        self.units.drain(..n).collect()
    }

    /// Appends `count` copies of `condition` to the tail.
    pub fn requeue(&mut self, condition: &str, count: u32) {
        self.units
            .extend(std::iter::repeat(condition.to_string()).take(count as usize));
    }

    /// Number of pending units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Pending units in order.
    pub fn as_slice(&self) -> &[String] {
        &self.units
    }

    /// Iterates pending units in order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.units.iter()
    }

    /// Number of pending units for `condition`.
    pub fn count_of(&self, condition: &str) -> usize {
        self.units.iter().filter(|unit| *unit == condition).count()
    }

    /// Consumes the queue, returning its units.
    pub fn into_units(self) -> Vec<String> {
        self.units
    }
}

/// Converts a per-condition sample size into the queue replicate factor.
///
/// Every placed unit is observed once per collection in the cycle, so the
/// sample size must split evenly across `collections_per_cycle`.
pub fn replicate_factor(sample_size: u32, collections_per_cycle: u32) -> Result<u32, ShelfError> {
    if collections_per_cycle == 0 {
        return Err(ShelfError::Config(ErrorInfo::new(
            "collections-zero",
            "collections per cycle must be positive",
        )));
    }
    if sample_size == 0 || sample_size % collections_per_cycle != 0 {
        return Err(ShelfError::Config(
            ErrorInfo::new(
                "sample-size-indivisible",
                format!("sample size must be a positive multiple of {collections_per_cycle}"),
            )
            .with_context("sample_size", sample_size.to_string())
            .with_context("collections_per_cycle", collections_per_cycle.to_string()),
        ));
    }
    Ok(sample_size / collections_per_cycle)
}
