use std::time::Duration;

use crate::constants::compose::DEFAULT_POLL_INTERVAL;

/// Top-level composer configuration.
#[derive(Clone, Debug)]
pub struct ComposerConfig {
    /// Interval between progress bridge samples of a running job's counters.
    ///
    /// This bounds notification frequency independent of how fast items
    /// complete. It is a tuning knob, not a correctness property: any
    /// interval yields the same event ordering guarantees.
    pub poll_interval: Duration,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
