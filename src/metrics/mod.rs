//! Lightweight in-process metrics: counters and timers, identified by name and tags, held in
//! registries.
//!
//! Instruments are lock-free on the write path ([`CumulativeCounter`] and [`CumulativeTimer`]
//! are atomics), so they may be shared freely across threads. Registries cache instruments by
//! [`MetricId`]. [`DelegatingMetricRegistry`] multiplexes over registries added at any time,
//! which lets metric-producing code start recording before a backing registry exists.

mod counter;
mod delegating;
mod id;
mod registry;
mod timer;

pub use counter::{Counter, CumulativeCounter, FlushCounter, NoopCounter};
pub use delegating::{DelegatingCounter, DelegatingMetricRegistry, DelegatingTimer};
pub use id::{MetricId, MetricKind};
pub use registry::{CumulativeMetricRegistry, FlushMetricRegistry, Metric, MetricRegistry};
pub use timer::{CumulativeTimer, FlushTimer, NoopTimer, Timer};
