use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Kind of instrument a [`MetricId`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Timer,
}

/// Identity of a metric: its name and tags.
///
/// The kind is carried for registration-time checks but does not participate in equality or
/// hashing, so a counter and a timer with the same name and tags collide in a registry.
#[derive(Debug, Clone)]
pub struct MetricId {
    name: String,
    tags: BTreeMap<String, String>,
    kind: MetricKind,
}

impl MetricId {
    pub fn new(
        name: impl Into<String>,
        tags: impl IntoIterator<Item = (String, String)>,
        kind: MetricKind,
    ) -> MetricId {
        MetricId {
            name: name.into(),
            tags: tags.into_iter().collect(),
            kind,
        }
    }

    pub fn counter(name: impl Into<String>) -> MetricId {
        MetricId::new(name, [], MetricKind::Counter)
    }

    pub fn timer(name: impl Into<String>) -> MetricId {
        MetricId::new(name, [], MetricKind::Timer)
    }

    /// Return a copy with the given tag added.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> MetricId {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }
}

impl PartialEq for MetricId {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.tags == other.tags
    }
}

impl Eq for MetricId {}

impl Hash for MetricId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.tags.hash(state);
    }
}
