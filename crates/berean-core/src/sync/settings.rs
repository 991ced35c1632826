//! Sync engine tuning knobs

use std::time::Duration;

/// Default spacing between scheduled passes.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);
/// Default ceiling on queue items drained per pass.
pub const DEFAULT_BATCH_SIZE: u32 = 50;
/// Default retry budget before a queue item is dropped.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Static sync configuration.
///
/// `max_retries` bounds retries, not attempts: an item is attempted
/// `max_retries + 1` times in total before being dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub interval: Duration,
    pub batch_size: u32,
    pub max_retries: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SYNC_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = SyncSettings::default();
        assert_eq!(settings.interval, Duration::from_secs(30));
        assert_eq!(settings.batch_size, 50);
        assert_eq!(settings.max_retries, 3);
    }

    #[test]
    fn builders_override_one_knob_at_a_time() {
        let settings = SyncSettings::default()
            .with_batch_size(10)
            .with_max_retries(1);
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.max_retries, 1);
        assert_eq!(settings.interval, DEFAULT_SYNC_INTERVAL);
    }
}
