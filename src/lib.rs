//! `flagon_core` is a common library to build Flagon SDKs for different languages. If you're a
//! Flagon user, you probably want to take a look at one of the existing SDKs.
//!
//! # Overview
//!
//! `flagon_core` is organized as a set of building blocks that help to build Flagon SDKs. It
//! contains the decision engine only: fetching definitions from the server, caching them, and the
//! public `variation()`/`remote_config()` API surfaces live in the SDK layers built on top.
//!
//! [`Workspace`] is the heart of the engine. It is an immutable snapshot of all server-provided
//! definitions (experiments, feature flags, segments, buckets, containers and remote config
//! parameters) that describes how the engine should answer evaluation requests. Whenever
//! definitions change, the snapshot is replaced completely; an in-flight evaluation keeps using
//! the snapshot it started with.
//!
//! [`eval`] module contains the evaluation flows. An
//! [`ExperimentEvaluator`](eval::ExperimentEvaluator) or a
//! [`RemoteConfigEvaluator`](eval::RemoteConfigEvaluator) answers one request by walking a
//! per-entity-type chain of decision steps ([`EvaluationFlow`](eval::EvaluationFlow)), guarded
//! against circular evaluation by an [`EvaluatorContext`](eval::EvaluatorContext).
//!
//! [`target`] module contains the targeting sublayer: resolving user values, matching individual
//! conditions, and combining them into target (AND) and segment (OR) matches.
//!
//! [`metrics`] module contains thread-safe counters and timers used to instrument evaluations.
//! They are updated by callers around evaluation calls and are independent of the flow itself.
//!
//! Evaluation is a pure, synchronous computation over in-memory data: no I/O, no suspension
//! points, no shared mutable state outside of the metrics subsystem.

#![warn(rustdoc::missing_crate_level_docs)]

pub mod eval;
pub mod flag;
pub mod metrics;
pub mod sharder;
pub mod target;

mod error;
mod properties;
mod user;
mod workspace;

pub use error::{EvaluationError, Result};
pub use properties::{Properties, PropertyValue};
pub use user::{IdentifiersBuilder, InternalUser};
pub use workspace::Workspace;
