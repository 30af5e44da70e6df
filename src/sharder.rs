//! Sharder implementation and bucket slot assignment.
use md5;

use crate::flag::{Bucket, Slot};

pub trait Sharder {
    fn get_shard(&self, input: impl AsRef<[u8]>, total_shards: u64) -> u64;
}

/// The default (and only) sharder.
pub struct Md5Sharder;

impl Sharder for Md5Sharder {
    fn get_shard(&self, input: impl AsRef<[u8]>, total_shards: u64) -> u64 {
        let hash = md5::compute(input);
        let value = u32::from_be_bytes(hash[0..4].try_into().unwrap());
        (value as u64) % total_shards
    }
}

/// Deterministically assigns an identifier to a slot of a [`Bucket`].
pub struct Bucketer<S = Md5Sharder> {
    sharder: S,
}

impl Bucketer<Md5Sharder> {
    pub fn new() -> Bucketer<Md5Sharder> {
        Bucketer {
            sharder: Md5Sharder,
        }
    }
}

impl Default for Bucketer<Md5Sharder> {
    fn default() -> Self {
        Bucketer::new()
    }
}

impl<S: Sharder> Bucketer<S> {
    pub fn with_sharder(sharder: S) -> Bucketer<S> {
        Bucketer { sharder }
    }

    /// Return the slot the identifier lands in, or `None` if the slot number falls outside every
    /// slot range (traffic not allocated).
    pub fn bucketing<'a>(&self, bucket: &'a Bucket, identifier: &str) -> Option<&'a Slot> {
        let slot_number = self
            .sharder
            .get_shard(format!("{}-{}", bucket.seed, identifier), bucket.slot_size);
        bucket.slot(slot_number)
    }
}
