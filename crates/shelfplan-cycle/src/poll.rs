//! Blocking wait on an external batch job, such as the tracking pipeline
//! run after each collection.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shelfplan_core::errors::{ErrorInfo, ShelfError};
use tracing::{debug, info};

/// Reports whether an external batch job has finished.
pub trait CompletionProbe {
    /// `Ok(true)` once the job has finished.
    fn is_complete(&mut self) -> Result<bool, ShelfError>;
}

impl<F> CompletionProbe for F
where
    F: FnMut() -> Result<bool, ShelfError>,
{
    fn is_complete(&mut self) -> Result<bool, ShelfError> {
        self()
    }
}

/// Timing of a blocking completion poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Wait before the first probe.
    pub initial_wait: Duration,
    /// Wait between probes.
    pub interval: Duration,
    /// Probes attempted before giving up.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_secs(60),
            interval: Duration::from_secs(30),
            max_attempts: 240,
        }
    }
}

/// Blocks until `probe` reports completion and returns the number of probes
/// made. Probe errors propagate immediately.
pub fn wait_for_completion<P: CompletionProbe>(
    probe: &mut P,
    policy: &PollPolicy,
) -> Result<u32, ShelfError> {
    thread::sleep(policy.initial_wait);
    for attempt in 1..=policy.max_attempts {
        if probe.is_complete()? {
            info!(attempt, "external job completed");
            return Ok(attempt);
        }
        debug!(attempt, "external job still running");
        if attempt < policy.max_attempts {
            thread::sleep(policy.interval);
        }
    }
    Err(ShelfError::Io(
        ErrorInfo::new("poll-exhausted", "external job did not complete in time")
            .with_context("max_attempts", policy.max_attempts.to_string()),
    ))
}
