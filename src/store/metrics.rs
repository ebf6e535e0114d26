use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetricsSnapshot {
    pub chains_executed: u64,
    pub operations_executed: u64,
    pub backend_calls: u64,
    pub cursors_opened: u64,
    pub cursors_open: u64,
}

/// Counters shared between a store and the cursors it hands out.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    chains: AtomicU64,
    operations: AtomicU64,
    backend_calls: AtomicU64,
    cursors_opened: AtomicU64,
    cursors_open: AtomicU64,
}

impl StoreMetrics {
    pub fn snapshot(&self) -> StoreMetricsSnapshot {
        StoreMetricsSnapshot {
            chains_executed: self.chains.load(Ordering::Relaxed),
            operations_executed: self.operations.load(Ordering::Relaxed),
            backend_calls: self.backend_calls.load(Ordering::Relaxed),
            cursors_opened: self.cursors_opened.load(Ordering::Relaxed),
            cursors_open: self.cursors_open.load(Ordering::Relaxed),
        }
    }

    pub fn record_chain(&self, operations: usize) {
        self.chains.fetch_add(1, Ordering::Relaxed);
        self.operations
            .fetch_add(operations as u64, Ordering::Relaxed);
    }

    pub fn record_backend_call(&self) {
        self.backend_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a cursor as open until the returned guard is dropped.
    pub fn open_cursor(self: &Arc<Self>) -> CursorGuard {
        self.cursors_opened.fetch_add(1, Ordering::Relaxed);
        self.cursors_open.fetch_add(1, Ordering::Relaxed);
        CursorGuard {
            metrics: Arc::clone(self),
        }
    }
}

/// Held by an open cursor; decrements the open gauge on drop.
#[derive(Debug)]
pub struct CursorGuard {
    metrics: Arc<StoreMetrics>,
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.metrics.cursors_open.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_gauge_follows_guards() {
        let metrics = Arc::new(StoreMetrics::default());
        let first = metrics.open_cursor();
        let second = metrics.open_cursor();
        assert_eq!(metrics.snapshot().cursors_open, 2);
        drop(first);
        drop(second);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cursors_open, 0);
        assert_eq!(snapshot.cursors_opened, 2);
    }
}
