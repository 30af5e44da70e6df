use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use crate::metrics::MetricId;

/// Records durations and exposes count, total, max, and mean.
pub trait Timer: Send + Sync {
    fn id(&self) -> &MetricId;

    fn record(&self, duration: Duration);

    /// Record a duration given in milliseconds. Negative values are ignored.
    fn record_millis(&self, millis: i64) {
        if millis >= 0 {
            self.record(Duration::from_millis(millis as u64));
        }
    }

    fn count(&self) -> u64;

    fn total(&self) -> Duration;

    fn max(&self) -> Duration;

    fn mean(&self) -> Duration {
        let count = self.count();
        if count == 0 {
            Duration::ZERO
        } else {
            self.total() / count as u32
        }
    }
}

/// A timer accumulating since creation.
#[derive(Debug)]
pub struct CumulativeTimer {
    id: MetricId,
    count: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl CumulativeTimer {
    pub fn new(id: MetricId) -> CumulativeTimer {
        CumulativeTimer {
            id,
            count: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            max_nanos: AtomicU64::new(0),
        }
    }

    pub(crate) fn with_values(
        id: MetricId,
        count: u64,
        total_nanos: u64,
        max_nanos: u64,
    ) -> CumulativeTimer {
        CumulativeTimer {
            id,
            count: AtomicU64::new(count),
            total_nanos: AtomicU64::new(total_nanos),
            max_nanos: AtomicU64::new(max_nanos),
        }
    }
}

impl Timer for CumulativeTimer {
    fn id(&self) -> &MetricId {
        &self.id
    }

    fn record(&self, duration: Duration) {
        let nanos = duration.as_nanos() as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }

    fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn total(&self) -> Duration {
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
    }

    fn max(&self) -> Duration {
        Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Default)]
struct TimerAccumulator {
    count: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

/// A timer whose accumulated values are taken and reset on flush.
///
/// Recorders share the read lock and stay parallel; a flush takes the write lock, so every
/// sample lands with all of its fields in exactly one flush window.
#[derive(Debug)]
pub struct FlushTimer {
    id: MetricId,
    accumulator: RwLock<TimerAccumulator>,
}

impl FlushTimer {
    pub fn new(id: MetricId) -> FlushTimer {
        FlushTimer {
            id,
            accumulator: RwLock::new(TimerAccumulator::default()),
        }
    }

    /// Take the accumulated values, resetting this timer, and return them as a frozen snapshot.
    pub fn flush(&self) -> CumulativeTimer {
        let accumulator = self
            .accumulator
            .write()
            .expect("thread holding metrics lock should not panic");
        let count = accumulator.count.swap(0, Ordering::Relaxed);
        let total_nanos = accumulator.total_nanos.swap(0, Ordering::Relaxed);
        let max_nanos = accumulator.max_nanos.swap(0, Ordering::Relaxed);
        CumulativeTimer::with_values(self.id.clone(), count, total_nanos, max_nanos)
    }
}

impl Timer for FlushTimer {
    fn id(&self) -> &MetricId {
        &self.id
    }

    fn record(&self, duration: Duration) {
        let nanos = duration.as_nanos() as u64;
        let accumulator = self
            .accumulator
            .read()
            .expect("thread holding metrics lock should not panic");
        accumulator.count.fetch_add(1, Ordering::Relaxed);
        accumulator.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        accumulator.max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }

    fn count(&self) -> u64 {
        self.accumulator
            .read()
            .expect("thread holding metrics lock should not panic")
            .count
            .load(Ordering::Relaxed)
    }

    fn total(&self) -> Duration {
        Duration::from_nanos(
            self.accumulator
                .read()
                .expect("thread holding metrics lock should not panic")
                .total_nanos
                .load(Ordering::Relaxed),
        )
    }

    fn max(&self) -> Duration {
        Duration::from_nanos(
            self.accumulator
                .read()
                .expect("thread holding metrics lock should not panic")
                .max_nanos
                .load(Ordering::Relaxed),
        )
    }
}

/// A timer that records nothing. Returned when a metric cannot be registered.
#[derive(Debug)]
pub struct NoopTimer {
    id: MetricId,
}

impl NoopTimer {
    pub fn new(id: MetricId) -> NoopTimer {
        NoopTimer { id }
    }
}

impl Timer for NoopTimer {
    fn id(&self) -> &MetricId {
        &self.id
    }

    fn record(&self, _duration: Duration) {}

    fn count(&self) -> u64 {
        0
    }

    fn total(&self) -> Duration {
        Duration::ZERO
    }

    fn max(&self) -> Duration {
        Duration::ZERO
    }
}
