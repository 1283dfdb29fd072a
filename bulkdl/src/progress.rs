//! Aggregated progress reporting.
//!
//! All transfers in a session feed one [`ProgressAggregator`]. Every received
//! chunk produces a [`ProgressUpdate`] carrying the cumulative byte count and
//! percentage for the whole batch. The transfer speed is the expensive part,
//! so it is recomputed at most once per configured interval and the in-between
//! updates carry the last computed value.
//!
//! The throttle is trailing-edge: the first speed sample lands one full
//! interval after the first chunk, and a pending sample always uses the byte
//! count current at the moment it fires. When chunks arrive after the window
//! has gone stale the speed is refreshed inline instead.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Callback invoked with every progress update.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// A snapshot of batch progress, emitted once per received chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Human-readable transfer speed, e.g. `"1.5 MB/sec"`.
    pub speed: String,
    /// Bytes accounted for so far, including bytes found on disk at start.
    pub bytes_completed: u64,
    /// Total remote size of the batch in bytes.
    pub total_bytes: u64,
    /// Completion percentage rounded to two decimals. Zero when the batch
    /// has no known size.
    pub percent: f64,
}

/// Decimal byte units. `u64` tops out in the exabyte range but the table
/// follows the usual ladder.
const UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Format a byte count with decimal (k = 1000) units.
///
/// Values are rounded to two decimals with trailing zeros dropped, so
/// `1500` renders as `"1.5 KB"` and `1000` as `"1 KB"`.
pub fn format_bytes(bytes: u64) -> String {
    const K: f64 = 1000.0;

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= K && unit < UNITS.len() - 1 {
        value /= K;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Completion percentage rounded to two decimals.
///
/// A zero total yields `0.0` rather than dividing by zero.
pub fn percent(bytes_completed: u64, total_bytes: u64) -> f64 {
    if total_bytes == 0 {
        return 0.0;
    }
    let raw = 100.0 * bytes_completed as f64 / total_bytes as f64;
    (raw * 100.0).round() / 100.0
}

/// One-sample speed window: speed is the byte delta between consecutive
/// cumulative samples taken one interval apart.
#[derive(Debug)]
struct SpeedWindow {
    previous: u64,
}

impl SpeedWindow {
    fn new() -> Self {
        Self { previous: 0 }
    }

    /// Take a cumulative sample and return the delta to the previous one.
    fn record(&mut self, cumulative: u64) -> u64 {
        let delta = self.previous.abs_diff(cumulative);
        self.previous = cumulative;
        delta
    }
}

struct AggState {
    bytes_completed: u64,
    speed: SpeedWindow,
    speed_value: u64,
    last_mark: Option<Instant>,
    flush_scheduled: bool,
    flush_gen: u64,
    closed: bool,
}

impl AggState {
    fn snapshot(&self, total_bytes: u64) -> ProgressUpdate {
        ProgressUpdate {
            speed: format!("{}/sec", format_bytes(self.speed_value)),
            bytes_completed: self.bytes_completed,
            total_bytes,
            percent: percent(self.bytes_completed, total_bytes),
        }
    }

    /// Fold the current byte count into the speed window and restart the
    /// throttle interval.
    fn refresh_speed(&mut self, now: Instant) {
        let cumulative = self.bytes_completed;
        self.speed_value = self.speed.record(cumulative);
        self.last_mark = Some(now);
    }
}

struct Inner {
    state: Mutex<AggState>,
    total_bytes: u64,
    interval: Duration,
    callback: ProgressCallback,
}

impl Inner {
    /// Trailing-edge flush. Recomputes the speed silently; the next chunk's
    /// update carries the fresh value.
    fn flush(&self, gen: u64) {
        let mut state = self.state.lock();
        if state.closed || state.flush_gen != gen || !state.flush_scheduled {
            return;
        }
        state.flush_scheduled = false;
        state.refresh_speed(Instant::now());
    }
}

/// Shared progress sink for one download session.
///
/// Cheap to clone. `add_bytes` must be called from within a Tokio runtime
/// because the speed throttle schedules its trailing flush as a task.
#[derive(Clone)]
pub struct ProgressAggregator {
    inner: Arc<Inner>,
}

impl ProgressAggregator {
    /// Create an aggregator for a batch of `total_bytes`, with `seeded`
    /// bytes already accounted for (files found complete or partial on
    /// disk before any transfer started).
    pub fn new(
        total_bytes: u64,
        seeded: u64,
        interval: Duration,
        callback: ProgressCallback,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(AggState {
                    bytes_completed: seeded,
                    speed: SpeedWindow::new(),
                    speed_value: 0,
                    last_mark: None,
                    flush_scheduled: false,
                    flush_gen: 0,
                    closed: false,
                }),
                total_bytes,
                interval,
                callback,
            }),
        }
    }

    /// Account for a received chunk and emit a progress update.
    pub fn add_bytes(&self, delta: u64) {
        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        state.bytes_completed += delta;

        let now = Instant::now();
        let mark = *state.last_mark.get_or_insert(now);
        if now.duration_since(mark) >= self.inner.interval {
            // Window went stale. Invalidate any pending flush and refresh
            // inline so this update carries a current speed.
            state.flush_gen = state.flush_gen.wrapping_add(1);
            state.flush_scheduled = false;
            state.refresh_speed(now);
        } else if !state.flush_scheduled {
            state.flush_scheduled = true;
            let gen = state.flush_gen;
            let deadline = mark + self.inner.interval;
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                inner.flush(gen);
            });
        }

        let update = state.snapshot(self.inner.total_bytes);
        drop(state);
        (self.inner.callback)(update);
    }

    /// Emit an update without touching the speed throttle. Used for the
    /// initial announcement when the batch needs no transfers.
    pub fn announce(&self, delta: u64) {
        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        state.bytes_completed += delta;
        let update = state.snapshot(self.inner.total_bytes);
        drop(state);
        (self.inner.callback)(update);
    }

    /// Bytes accounted for so far.
    pub fn bytes_completed(&self) -> u64 {
        self.inner.state.lock().bytes_completed
    }

    /// Stop emitting. Pending flush tasks become no-ops.
    pub fn close(&self) {
        self.inner.state.lock().closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn collecting() -> (Arc<Mutex<Vec<ProgressUpdate>>>, ProgressCallback) {
        let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        let callback: ProgressCallback = Box::new(move |u| sink.lock().push(u));
        (updates, callback)
    }

    #[test]
    fn test_format_bytes_zero() {
        assert_eq!(format_bytes(0), "0 Bytes");
    }

    #[test]
    fn test_format_bytes_sub_kilobyte() {
        assert_eq!(format_bytes(1), "1 Bytes");
        assert_eq!(format_bytes(500), "500 Bytes");
        assert_eq!(format_bytes(999), "999 Bytes");
    }

    #[test]
    fn test_format_bytes_unit_boundaries() {
        assert_eq!(format_bytes(1000), "1 KB");
        assert_eq!(format_bytes(1_000_000), "1 MB");
        assert_eq!(format_bytes(1_000_000_000), "1 GB");
    }

    #[test]
    fn test_format_bytes_drops_trailing_zeros() {
        assert_eq!(format_bytes(1500), "1.5 KB");
        assert_eq!(format_bytes(1536), "1.54 KB");
        assert_eq!(format_bytes(1_250_000_000), "1.25 GB");
    }

    #[test]
    fn test_format_bytes_rounds_up_within_unit() {
        // 999999 rounds to 1000 KB rather than spilling into MB.
        assert_eq!(format_bytes(999_999), "1000 KB");
    }

    #[test]
    fn test_format_bytes_max() {
        assert_eq!(format_bytes(u64::MAX), "18.45 EB");
    }

    #[test]
    fn test_percent_zero_total() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(500, 0), 0.0);
    }

    #[test]
    fn test_percent_rounding() {
        assert_eq!(percent(2000, 3000), 66.67);
        assert_eq!(percent(1, 3), 33.33);
        assert_eq!(percent(3000, 3000), 100.0);
    }

    proptest! {
        #[test]
        fn prop_format_bytes_has_known_unit(bytes in any::<u64>()) {
            let formatted = format_bytes(bytes);
            let (value, unit) = formatted.split_once(' ').unwrap();
            prop_assert!(UNITS.contains(&unit));
            prop_assert!(value.parse::<f64>().unwrap() >= 0.0);
        }

        #[test]
        fn prop_percent_bounded(total in 1u64..=u64::MAX, frac in 0.0f64..=1.0) {
            let completed = (total as f64 * frac) as u64;
            let p = percent(completed.min(total), total);
            prop_assert!((0.0..=100.0).contains(&p));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_chunk_emits() {
        let (updates, callback) = collecting();
        let agg = ProgressAggregator::new(1000, 0, Duration::from_millis(1000), callback);

        agg.add_bytes(100);
        agg.add_bytes(100);
        agg.add_bytes(100);

        let seen = updates.lock();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].bytes_completed, 300);
        assert_eq!(seen[2].percent, 30.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_speed_sample_is_deferred() {
        let (updates, callback) = collecting();
        let agg = ProgressAggregator::new(10_000, 0, Duration::from_millis(1000), callback);

        agg.add_bytes(500);
        assert_eq!(updates.lock()[0].speed, "0 Bytes/sec");

        // The trailing flush fires silently after one interval.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(updates.lock().len(), 1);

        // The next chunk's update carries the flushed speed.
        agg.add_bytes(500);
        let last = updates.lock().last().unwrap().clone();
        assert_eq!(last.speed, "500 Bytes/sec");
        assert_eq!(last.bytes_completed, 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_window_refreshes_inline() {
        let (updates, callback) = collecting();
        let agg = ProgressAggregator::new(10_000, 0, Duration::from_millis(1000), callback);

        agg.add_bytes(100);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // 1500ms since the flush at t=1000, so the speed refreshes inline:
        // |100 - 150| = 50.
        agg.add_bytes(50);
        let last = updates.lock().last().unwrap().clone();
        assert_eq!(last.speed, "50 Bytes/sec");
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_bytes_count_toward_percent() {
        let (updates, callback) = collecting();
        let agg = ProgressAggregator::new(1000, 400, Duration::from_millis(1000), callback);

        agg.announce(0);
        let seen = updates.lock();
        assert_eq!(seen[0].bytes_completed, 400);
        assert_eq!(seen[0].percent, 40.0);
        assert_eq!(seen[0].speed, "0 Bytes/sec");
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_aggregator_is_silent() {
        let (updates, callback) = collecting();
        let agg = ProgressAggregator::new(1000, 0, Duration::from_millis(1000), callback);

        agg.add_bytes(100);
        agg.close();
        agg.add_bytes(100);
        agg.announce(0);

        assert_eq!(updates.lock().len(), 1);
        assert_eq!(agg.bytes_completed(), 100);
    }
}
