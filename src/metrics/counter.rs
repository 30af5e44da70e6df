use std::sync::atomic::{AtomicI64, Ordering};

use crate::metrics::MetricId;

/// A monotonically-adjusted event counter.
pub trait Counter: Send + Sync {
    fn id(&self) -> &MetricId;

    fn increment_by(&self, delta: i64);

    fn increment(&self) {
        self.increment_by(1);
    }

    fn count(&self) -> i64;
}

/// A counter accumulating since creation.
#[derive(Debug)]
pub struct CumulativeCounter {
    id: MetricId,
    count: AtomicI64,
}

impl CumulativeCounter {
    pub fn new(id: MetricId) -> CumulativeCounter {
        CumulativeCounter {
            id,
            count: AtomicI64::new(0),
        }
    }

    pub(crate) fn with_count(id: MetricId, count: i64) -> CumulativeCounter {
        CumulativeCounter {
            id,
            count: AtomicI64::new(count),
        }
    }
}

impl Counter for CumulativeCounter {
    fn id(&self) -> &MetricId {
        &self.id
    }

    fn increment_by(&self, delta: i64) {
        self.count.fetch_add(delta, Ordering::Relaxed);
    }

    fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// A counter whose value is taken and reset on flush.
#[derive(Debug)]
pub struct FlushCounter {
    id: MetricId,
    count: AtomicI64,
}

impl FlushCounter {
    pub fn new(id: MetricId) -> FlushCounter {
        FlushCounter {
            id,
            count: AtomicI64::new(0),
        }
    }

    /// Take the accumulated count, resetting this counter to zero, and return it as a frozen
    /// snapshot.
    pub fn flush(&self) -> CumulativeCounter {
        let count = self.count.swap(0, Ordering::Relaxed);
        CumulativeCounter::with_count(self.id.clone(), count)
    }
}

impl Counter for FlushCounter {
    fn id(&self) -> &MetricId {
        &self.id
    }

    fn increment_by(&self, delta: i64) {
        self.count.fetch_add(delta, Ordering::Relaxed);
    }

    fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// A counter that records nothing. Returned when a metric cannot be registered.
#[derive(Debug)]
pub struct NoopCounter {
    id: MetricId,
}

impl NoopCounter {
    pub fn new(id: MetricId) -> NoopCounter {
        NoopCounter { id }
    }
}

impl Counter for NoopCounter {
    fn id(&self) -> &MetricId {
        &self.id
    }

    fn increment_by(&self, _delta: i64) {}

    fn count(&self) -> i64 {
        0
    }
}
