use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::warn;

use crate::metrics::{
    Counter, CumulativeCounter, CumulativeTimer, FlushCounter, FlushTimer, MetricId, NoopCounter,
    NoopTimer, Timer,
};

/// Creates and caches instruments by [`MetricId`].
///
/// Creating a metric twice with the same id returns the same instrument. Creating a counter
/// where a timer is already registered (or vice versa) returns a no-op instrument, since metric
/// identity ignores the kind.
pub trait MetricRegistry: Send + Sync {
    fn create_counter(&self, id: MetricId) -> Arc<dyn Counter>;

    fn create_timer(&self, id: MetricId) -> Arc<dyn Timer>;
}

/// An instrument held by a registry, of either kind.
#[derive(Clone)]
pub enum Metric {
    Counter(Arc<dyn Counter>),
    Timer(Arc<dyn Timer>),
}

impl Metric {
    pub fn id(&self) -> &MetricId {
        match self {
            Metric::Counter(counter) => counter.id(),
            Metric::Timer(timer) => timer.id(),
        }
    }
}

fn warn_kind_collision(id: &MetricId) {
    warn!(target: "flagon",
          metric = id.name();
          "metric already registered with a different kind; returning a no-op instrument");
}

/// A registry of cumulative instruments.
#[derive(Default)]
pub struct CumulativeMetricRegistry {
    metrics: Mutex<HashMap<MetricId, Metric>>,
}

impl CumulativeMetricRegistry {
    pub fn new() -> CumulativeMetricRegistry {
        CumulativeMetricRegistry::default()
    }
}

impl MetricRegistry for CumulativeMetricRegistry {
    fn create_counter(&self, id: MetricId) -> Arc<dyn Counter> {
        let mut metrics = self
            .metrics
            .lock()
            .expect("thread holding metrics lock should not panic");
        match metrics.get(&id) {
            Some(Metric::Counter(counter)) => counter.clone(),
            Some(Metric::Timer(_)) => {
                warn_kind_collision(&id);
                Arc::new(NoopCounter::new(id))
            }
            None => {
                let counter: Arc<dyn Counter> = Arc::new(CumulativeCounter::new(id.clone()));
                metrics.insert(id, Metric::Counter(counter.clone()));
                counter
            }
        }
    }

    fn create_timer(&self, id: MetricId) -> Arc<dyn Timer> {
        let mut metrics = self
            .metrics
            .lock()
            .expect("thread holding metrics lock should not panic");
        match metrics.get(&id) {
            Some(Metric::Timer(timer)) => timer.clone(),
            Some(Metric::Counter(_)) => {
                warn_kind_collision(&id);
                Arc::new(NoopTimer::new(id))
            }
            None => {
                let timer: Arc<dyn Timer> = Arc::new(CumulativeTimer::new(id.clone()));
                metrics.insert(id, Metric::Timer(timer.clone()));
                timer
            }
        }
    }
}

enum FlushInstrument {
    Counter(Arc<FlushCounter>),
    Timer(Arc<FlushTimer>),
}

/// A registry of flush instruments: [`flush`](FlushMetricRegistry::flush) takes a snapshot of
/// every metric and resets the live instruments.
#[derive(Default)]
pub struct FlushMetricRegistry {
    metrics: Mutex<HashMap<MetricId, FlushInstrument>>,
}

impl FlushMetricRegistry {
    pub fn new() -> FlushMetricRegistry {
        FlushMetricRegistry::default()
    }

    /// Snapshot and reset all registered metrics.
    pub fn flush(&self) -> Vec<Metric> {
        let metrics = self
            .metrics
            .lock()
            .expect("thread holding metrics lock should not panic");
        metrics
            .values()
            .map(|instrument| match instrument {
                FlushInstrument::Counter(counter) => Metric::Counter(Arc::new(counter.flush())),
                FlushInstrument::Timer(timer) => Metric::Timer(Arc::new(timer.flush())),
            })
            .collect()
    }
}

impl MetricRegistry for FlushMetricRegistry {
    fn create_counter(&self, id: MetricId) -> Arc<dyn Counter> {
        let mut metrics = self
            .metrics
            .lock()
            .expect("thread holding metrics lock should not panic");
        match metrics.get(&id) {
            Some(FlushInstrument::Counter(counter)) => counter.clone(),
            Some(FlushInstrument::Timer(_)) => {
                warn_kind_collision(&id);
                Arc::new(NoopCounter::new(id))
            }
            None => {
                let counter = Arc::new(FlushCounter::new(id.clone()));
                metrics.insert(id, FlushInstrument::Counter(counter.clone()));
                counter
            }
        }
    }

    fn create_timer(&self, id: MetricId) -> Arc<dyn Timer> {
        let mut metrics = self
            .metrics
            .lock()
            .expect("thread holding metrics lock should not panic");
        match metrics.get(&id) {
            Some(FlushInstrument::Timer(timer)) => timer.clone(),
            Some(FlushInstrument::Counter(_)) => {
                warn_kind_collision(&id);
                Arc::new(NoopTimer::new(id))
            }
            None => {
                let timer = Arc::new(FlushTimer::new(id.clone()));
                metrics.insert(id, FlushInstrument::Timer(timer.clone()));
                timer
            }
        }
    }
}
