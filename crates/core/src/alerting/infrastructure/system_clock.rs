use std::time::{SystemTime, UNIX_EPOCH};

use crate::alerting::domain::clock::Clock;

/// Reads the host clock, truncated to whole seconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_seconds(&self) -> u64 {
        // A clock set before 1970 collapses to 0 rather than failing the alert.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
