//! Session configuration.
//!
//! `ManagerConfig` carries the tunables a caller can set on a
//! [`DownloadManager`](crate::session::DownloadManager). Defaults match the
//! behavior the engine was tuned for: a short per-transfer inactivity timeout
//! and a small concurrent-transfer window.

use std::time::Duration;

/// Default per-transfer idle/connect timeout in milliseconds.
///
/// Applies to the wait for response headers and to every body-chunk await.
/// Firing it fails that transfer (and therefore the session) with
/// [`TransferTimeout`](crate::error::DownloadError::TransferTimeout).
pub const DEFAULT_TIMEOUT_MS: u64 = 4000;

/// Default upper bound on simultaneously in-flight transfers.
pub const DEFAULT_MAX_PARALLEL: usize = 5;

/// Default interval for the throttled speed computation in milliseconds.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 1000;

/// Tunables for one download manager.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Per-transfer inactivity timeout.
    pub timeout: Duration,

    /// Maximum number of concurrent transfers. The effective bound for a
    /// session is `min(max_parallel, queue length)`.
    pub max_parallel: usize,

    /// Window for the throttled speed calculation feeding progress events.
    pub progress_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_parallel: DEFAULT_MAX_PARALLEL,
            progress_interval: Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
        }
    }
}

impl ManagerConfig {
    /// Create a config with the default tunables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-transfer timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the concurrent-transfer bound, clamped to at least 1.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Set the speed-throttle window.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(4000));
        assert_eq!(config.max_parallel, 5);
        assert_eq!(config.progress_interval, Duration::from_millis(1000));
    }

    #[test]
    fn test_config_builder() {
        let config = ManagerConfig::new()
            .with_timeout(Duration::from_secs(30))
            .with_max_parallel(8)
            .with_progress_interval(Duration::from_millis(250));

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_parallel, 8);
        assert_eq!(config.progress_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_max_parallel_clamped_to_one() {
        let config = ManagerConfig::new().with_max_parallel(0);
        assert_eq!(config.max_parallel, 1);
    }
}
