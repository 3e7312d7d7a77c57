use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Real-time counters for one run.
///
/// Workers update these during execution; callers can snapshot them at any
/// time through [`RunMetrics::snapshot`].
pub struct RunMetrics {
    rows_processed: AtomicU64,
    rows_failed: AtomicU64,
    analyzer_deliveries: AtomicU64,
    listener_panics: AtomicU64,
    max_fan_out: AtomicUsize,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            rows_processed: AtomicU64::new(0),
            rows_failed: AtomicU64::new(0),
            analyzer_deliveries: AtomicU64::new(0),
            listener_panics: AtomicU64::new(0),
            max_fan_out: AtomicUsize::new(0),
        }
    }

    /// A source row finished its trip through the graph.
    pub fn on_row_processed(&self) {
        let _ = self.rows_processed.fetch_add(1, Ordering::SeqCst);
    }

    /// A source row produced at least one component error.
    pub fn on_row_failed(&self) {
        let _ = self.rows_failed.fetch_add(1, Ordering::SeqCst);
    }

    /// `count` analyzer deliveries were made for one source row.
    pub fn on_deliveries(&self, count: u64) {
        let _ = self.analyzer_deliveries.fetch_add(count, Ordering::SeqCst);
    }

    /// One source row fanned out into `branches` surviving leaf branches.
    pub fn on_fan_out(&self, branches: usize) {
        update_max_usize(&self.max_fan_out, branches);
    }

    /// A listener callback panicked and was suppressed.
    pub fn on_listener_panic(&self) {
        let _ = self.listener_panics.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> RunMetricsSnapshot {
        RunMetricsSnapshot {
            rows_processed: self.rows_processed.load(Ordering::SeqCst),
            rows_failed: self.rows_failed.load(Ordering::SeqCst),
            analyzer_deliveries: self.analyzer_deliveries.load(Ordering::SeqCst),
            listener_panics: self.listener_panics.load(Ordering::SeqCst),
            max_fan_out: self.max_fan_out.load(Ordering::SeqCst),
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`RunMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunMetricsSnapshot {
    pub rows_processed: u64,
    pub rows_failed: u64,
    pub analyzer_deliveries: u64,
    pub listener_panics: u64,
    pub max_fan_out: usize,
}

impl fmt::Display for RunMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows_processed={}, rows_failed={}, analyzer_deliveries={}, max_fan_out={}, listener_panics={}",
            self.rows_processed,
            self.rows_failed,
            self.analyzer_deliveries,
            self.max_fan_out,
            self.listener_panics
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RunMetrics;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let metrics = RunMetrics::new();
        metrics.on_row_processed();
        metrics.on_row_processed();
        metrics.on_row_failed();
        metrics.on_deliveries(5);
        metrics.on_fan_out(3);
        metrics.on_fan_out(1);

        let snap = metrics.snapshot();
        assert_eq!(snap.rows_processed, 2);
        assert_eq!(snap.rows_failed, 1);
        assert_eq!(snap.analyzer_deliveries, 5);
        assert_eq!(snap.max_fan_out, 3);
        assert_eq!(snap.listener_panics, 0);
    }

    #[test]
    fn display_is_stable() {
        let snap = RunMetrics::new().snapshot();
        assert_eq!(
            snap.to_string(),
            "rows_processed=0, rows_failed=0, analyzer_deliveries=0, max_fan_out=0, listener_panics=0"
        );
    }
}
