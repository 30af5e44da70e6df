use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::flag::{Bucket, Container, Experiment, RemoteConfigParameter, Segment};

/// An immutable snapshot of all server-provided definitions. It's the central piece the engine
/// evaluates against.
///
/// `Workspace` is never mutated: the configuration-fetch layer replaces the whole snapshot on
/// refresh, so unsynchronized concurrent reads are safe. An in-flight evaluation keeps using the
/// snapshot it started with.
#[derive(Debug)]
pub struct Workspace {
    /// Timestamp when this snapshot was assembled.
    pub created_at: DateTime<Utc>,
    experiments: HashMap<u64, Experiment>,
    feature_flags: HashMap<u64, Experiment>,
    segments: HashMap<String, Segment>,
    buckets: HashMap<u64, Bucket>,
    containers: HashMap<u64, Container>,
    remote_config_parameters: HashMap<String, RemoteConfigParameter>,
}

impl Workspace {
    /// Assemble a snapshot from definition lists. Experiments are indexed by key, segments and
    /// remote config parameters by key, buckets and containers by id.
    pub fn new(
        experiments: Vec<Experiment>,
        feature_flags: Vec<Experiment>,
        segments: Vec<Segment>,
        buckets: Vec<Bucket>,
        containers: Vec<Container>,
        remote_config_parameters: Vec<RemoteConfigParameter>,
    ) -> Workspace {
        Workspace {
            created_at: Utc::now(),
            experiments: experiments.into_iter().map(|it| (it.key, it)).collect(),
            feature_flags: feature_flags.into_iter().map(|it| (it.key, it)).collect(),
            segments: segments.into_iter().map(|it| (it.key.clone(), it)).collect(),
            buckets: buckets.into_iter().map(|it| (it.id, it)).collect(),
            containers: containers.into_iter().map(|it| (it.id, it)).collect(),
            remote_config_parameters: remote_config_parameters
                .into_iter()
                .map(|it| (it.key.clone(), it))
                .collect(),
        }
    }

    pub fn experiment(&self, experiment_key: u64) -> Option<&Experiment> {
        self.experiments.get(&experiment_key)
    }

    pub fn feature_flag(&self, feature_key: u64) -> Option<&Experiment> {
        self.feature_flags.get(&feature_key)
    }

    pub fn segment(&self, segment_key: &str) -> Option<&Segment> {
        self.segments.get(segment_key)
    }

    pub fn bucket(&self, bucket_id: u64) -> Option<&Bucket> {
        self.buckets.get(&bucket_id)
    }

    pub fn container(&self, container_id: u64) -> Option<&Container> {
        self.containers.get(&container_id)
    }

    pub fn remote_config_parameter(&self, parameter_key: &str) -> Option<&RemoteConfigParameter> {
        self.remote_config_parameters.get(parameter_key)
    }
}
