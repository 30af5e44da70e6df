//! Definition model for experiments, feature flags, segments, buckets, containers and remote
//! config parameters. These are immutable snapshots supplied by the configuration-fetch layer.

mod models;

pub use models::*;
