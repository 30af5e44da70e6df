use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use log::warn;

use crate::metrics::{Counter, MetricId, MetricRegistry, NoopCounter, NoopTimer, Timer};

/// A counter fanning writes out to one delegate per bound registry.
///
/// Reads come from the first bound delegate, so they reflect a single registry rather than a sum
/// over all of them. An unbound delegating counter reads zero.
pub struct DelegatingCounter {
    id: MetricId,
    delegates: RwLock<Vec<Arc<dyn Counter>>>,
}

impl DelegatingCounter {
    pub fn new(id: MetricId) -> DelegatingCounter {
        DelegatingCounter {
            id,
            delegates: RwLock::new(Vec::new()),
        }
    }

    /// Bind a registry, creating this counter in it.
    pub fn add(&self, registry: &dyn MetricRegistry) {
        let counter = registry.create_counter(self.id.clone());
        self.delegates
            .write()
            .expect("thread holding metrics lock should not panic")
            .push(counter);
    }

    fn first(&self) -> Arc<dyn Counter> {
        let delegates = self
            .delegates
            .read()
            .expect("thread holding metrics lock should not panic");
        match delegates.first() {
            Some(counter) => counter.clone(),
            None => Arc::new(NoopCounter::new(self.id.clone())),
        }
    }
}

impl Counter for DelegatingCounter {
    fn id(&self) -> &MetricId {
        &self.id
    }

    fn increment_by(&self, delta: i64) {
        let delegates = self
            .delegates
            .read()
            .expect("thread holding metrics lock should not panic");
        for counter in delegates.iter() {
            counter.increment_by(delta);
        }
    }

    fn count(&self) -> i64 {
        self.first().count()
    }
}

/// A timer fanning writes out to one delegate per bound registry.
pub struct DelegatingTimer {
    id: MetricId,
    delegates: RwLock<Vec<Arc<dyn Timer>>>,
}

impl DelegatingTimer {
    pub fn new(id: MetricId) -> DelegatingTimer {
        DelegatingTimer {
            id,
            delegates: RwLock::new(Vec::new()),
        }
    }

    /// Bind a registry, creating this timer in it.
    pub fn add(&self, registry: &dyn MetricRegistry) {
        let timer = registry.create_timer(self.id.clone());
        self.delegates
            .write()
            .expect("thread holding metrics lock should not panic")
            .push(timer);
    }

    fn first(&self) -> Arc<dyn Timer> {
        let delegates = self
            .delegates
            .read()
            .expect("thread holding metrics lock should not panic");
        match delegates.first() {
            Some(timer) => timer.clone(),
            None => Arc::new(NoopTimer::new(self.id.clone())),
        }
    }
}

impl Timer for DelegatingTimer {
    fn id(&self) -> &MetricId {
        &self.id
    }

    fn record(&self, duration: Duration) {
        let delegates = self
            .delegates
            .read()
            .expect("thread holding metrics lock should not panic");
        for timer in delegates.iter() {
            timer.record(duration);
        }
    }

    fn count(&self) -> u64 {
        self.first().count()
    }

    fn total(&self) -> Duration {
        self.first().total()
    }

    fn max(&self) -> Duration {
        self.first().max()
    }
}

enum DelegatingInstrument {
    Counter(Arc<DelegatingCounter>),
    Timer(Arc<DelegatingTimer>),
}

/// A registry multiplexing over other registries.
///
/// Registries may be added after metrics were created: adding a registry binds it to every
/// existing delegating metric, and metrics created later are bound to every registry added so
/// far.
#[derive(Default)]
pub struct DelegatingMetricRegistry {
    registries: Mutex<Vec<Arc<dyn MetricRegistry>>>,
    metrics: Mutex<HashMap<MetricId, DelegatingInstrument>>,
}

impl DelegatingMetricRegistry {
    pub fn new() -> DelegatingMetricRegistry {
        DelegatingMetricRegistry::default()
    }

    pub fn add_registry(&self, registry: Arc<dyn MetricRegistry>) {
        let mut registries = self
            .registries
            .lock()
            .expect("thread holding metrics lock should not panic");
        let metrics = self
            .metrics
            .lock()
            .expect("thread holding metrics lock should not panic");
        for instrument in metrics.values() {
            match instrument {
                DelegatingInstrument::Counter(counter) => counter.add(registry.as_ref()),
                DelegatingInstrument::Timer(timer) => timer.add(registry.as_ref()),
            }
        }
        registries.push(registry);
    }
}

impl MetricRegistry for DelegatingMetricRegistry {
    fn create_counter(&self, id: MetricId) -> Arc<dyn Counter> {
        let registries = self
            .registries
            .lock()
            .expect("thread holding metrics lock should not panic");
        let mut metrics = self
            .metrics
            .lock()
            .expect("thread holding metrics lock should not panic");
        match metrics.get(&id) {
            Some(DelegatingInstrument::Counter(counter)) => counter.clone(),
            Some(DelegatingInstrument::Timer(_)) => {
                warn!(target: "flagon",
                      metric = id.name();
                      "metric already registered with a different kind; returning a no-op instrument");
                Arc::new(NoopCounter::new(id))
            }
            None => {
                let counter = Arc::new(DelegatingCounter::new(id.clone()));
                for registry in registries.iter() {
                    counter.add(registry.as_ref());
                }
                metrics.insert(id, DelegatingInstrument::Counter(counter.clone()));
                counter
            }
        }
    }

    fn create_timer(&self, id: MetricId) -> Arc<dyn Timer> {
        let registries = self
            .registries
            .lock()
            .expect("thread holding metrics lock should not panic");
        let mut metrics = self
            .metrics
            .lock()
            .expect("thread holding metrics lock should not panic");
        match metrics.get(&id) {
            Some(DelegatingInstrument::Timer(timer)) => timer.clone(),
            Some(DelegatingInstrument::Counter(_)) => {
                warn!(target: "flagon",
                      metric = id.name();
                      "metric already registered with a different kind; returning a no-op instrument");
                Arc::new(NoopTimer::new(id))
            }
            None => {
                let timer = Arc::new(DelegatingTimer::new(id.clone()));
                for registry in registries.iter() {
                    timer.add(registry.as_ref());
                }
                metrics.insert(id, DelegatingInstrument::Timer(timer.clone()));
                timer
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{DelegatingCounter, DelegatingMetricRegistry};
    use crate::metrics::{
        Counter, CumulativeMetricRegistry, FlushMetricRegistry, MetricId, MetricRegistry, Timer,
    };

    #[test]
    fn unbound_delegating_counter_is_a_noop() {
        let counter = DelegatingCounter::new(MetricId::counter("requests"));
        counter.increment();
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn writes_fan_out_to_all_bound_registries() {
        let cumulative = Arc::new(CumulativeMetricRegistry::new());
        let flush = Arc::new(FlushMetricRegistry::new());
        let delegating = DelegatingMetricRegistry::new();
        delegating.add_registry(cumulative.clone());
        delegating.add_registry(flush.clone());

        let counter = delegating.create_counter(MetricId::counter("requests"));
        counter.increment_by(5);

        assert_eq!(
            cumulative.create_counter(MetricId::counter("requests")).count(),
            5
        );
        assert_eq!(flush.create_counter(MetricId::counter("requests")).count(), 5);
        // Reads come from the first bound registry.
        assert_eq!(counter.count(), 5);
    }

    #[test]
    fn registries_added_later_are_bound_to_existing_metrics() {
        let delegating = DelegatingMetricRegistry::new();
        let timer = delegating.create_timer(MetricId::timer("latency"));
        timer.record(Duration::from_millis(1));
        assert_eq!(timer.count(), 0);

        let cumulative = Arc::new(CumulativeMetricRegistry::new());
        delegating.add_registry(cumulative.clone());
        timer.record(Duration::from_millis(2));

        // Only the record made after binding reaches the registry.
        let bound = cumulative.create_timer(MetricId::timer("latency"));
        assert_eq!(bound.count(), 1);
        assert_eq!(bound.total(), Duration::from_millis(2));
        assert_eq!(timer.count(), 1);
    }

    #[test]
    fn same_id_returns_same_delegating_metric() {
        let delegating = DelegatingMetricRegistry::new();
        let a = delegating.create_counter(MetricId::counter("requests"));
        let b = delegating.create_counter(MetricId::counter("requests"));
        let cumulative = Arc::new(CumulativeMetricRegistry::new());
        delegating.add_registry(cumulative.clone());
        a.increment();
        b.increment();
        assert_eq!(
            cumulative.create_counter(MetricId::counter("requests")).count(),
            2
        );
    }

    #[test]
    fn concurrent_writes_through_the_delegating_registry() {
        let cumulative = Arc::new(CumulativeMetricRegistry::new());
        let delegating = Arc::new(DelegatingMetricRegistry::new());
        delegating.add_registry(cumulative.clone());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let delegating = delegating.clone();
                std::thread::spawn(move || {
                    let counter = delegating.create_counter(MetricId::counter("requests"));
                    for _ in 0..100_000 {
                        counter.increment();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(
            cumulative.create_counter(MetricId::counter("requests")).count(),
            800_000
        );
    }
}
