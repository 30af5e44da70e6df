use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::PropertyValue;

#[allow(missing_docs)]
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// An experiment or feature flag definition.
///
/// Immutable configuration data supplied by the configuration-fetch layer; replaced wholesale on
/// refresh, never mutated in place.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub id: u64,
    pub key: u64,
    pub experiment_type: ExperimentType,
    /// Which identifier of the user this experiment buckets on (e.g. `$id`, `$deviceId`).
    pub identifier_type: String,
    pub status: ExperimentStatus,
    pub version: u64,
    pub execution_version: u64,
    /// Ordered variations. Ids and keys are unique within the experiment.
    pub variations: Vec<Variation>,
    /// Per-user overrides: identifier value to variation id.
    #[serde(default)]
    pub user_overrides: HashMap<String, u64>,
    /// Per-segment overrides, evaluated in declaration order.
    #[serde(default)]
    pub segment_overrides: Vec<TargetRule>,
    /// Audience gate: user must match at least one target (empty means everyone).
    #[serde(default)]
    pub target_audiences: Vec<Target>,
    /// Targeting rules, evaluated in declaration order.
    #[serde(default)]
    pub target_rules: Vec<TargetRule>,
    /// Action applied when no target rule matches.
    pub default_rule: TargetAction,
    /// Mutual-exclusivity group this experiment belongs to, if any.
    #[serde(default)]
    pub container_id: Option<u64>,
    /// Winner variation of a completed experiment.
    #[serde(default)]
    pub winner_variation_id: Option<u64>,
}

impl Experiment {
    pub fn variation_by_id(&self, variation_id: u64) -> Option<&Variation> {
        self.variations.iter().find(|it| it.id == variation_id)
    }

    pub fn variation_by_key(&self, variation_key: &str) -> Option<&Variation> {
        self.variations.iter().find(|it| it.key == variation_key)
    }

    pub fn winner_variation(&self) -> Option<&Variation> {
        self.variation_by_id(self.winner_variation_id?)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum ExperimentType {
    AbTest,
    FeatureFlag,
}

/// Lifecycle status of an experiment.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum ExperimentStatus {
    Draft,
    Running,
    Paused,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Variation {
    pub id: u64,
    pub key: String,
    #[serde(default)]
    pub is_dropped: bool,
    #[serde(default)]
    pub parameter_configuration_id: Option<u64>,
}

/// Action attached to a target rule or the default rule.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetAction {
    /// Assign a fixed variation.
    #[serde(rename_all = "camelCase")]
    Variation { variation_id: u64 },
    /// Assign by bucketing the user's identifier into the referenced bucket.
    #[serde(rename_all = "camelCase")]
    Bucket { bucket_id: u64 },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct TargetRule {
    pub target: Target,
    pub action: TargetAction,
}

/// An AND-combination of conditions describing "this kind of user".
///
/// Matches a user iff all conditions match. An empty condition list trivially matches.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub conditions: Vec<TargetCondition>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct TargetCondition {
    pub key: TargetKey,
    #[serde(rename = "match")]
    pub matcher: TargetMatch,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct TargetKey {
    #[serde(rename = "type")]
    pub key_type: TargetKeyType,
    pub name: String,
}

/// Kind of value a condition key resolves against.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum TargetKeyType {
    /// An identifier of the user (looked up by identifier type name).
    UserId,
    /// A user property (looked up by property name).
    UserProperty,
    /// A property computed by the engine itself. Not resolvable in this layer.
    SystemProperty,
    /// Membership in a segment. Must be evaluated by the segment matcher, never by direct value
    /// resolution.
    Segment,
}

/// A single rule comparing a resolved user value against expected values.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetMatch {
    pub match_type: MatchType,
    pub operator: MatchOperator,
    /// Expected values; the condition matches when the user value matches any of them.
    pub values: Vec<PropertyValue>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum MatchType {
    Match,
    NotMatch,
}

/// Possible condition operators.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchOperator {
    /// Equality. Values are compared within the same type only.
    In,
    /// Substring check. String values only.
    Contains,
    /// Prefix check. String values only.
    StartsWith,
    /// Suffix check. String values only.
    EndsWith,
    /// Matches regex. Expected value must be a regex string.
    Matches,
    /// Greater than. Values must either be numbers or semver strings.
    Gt,
    /// Greater than or equal. Values must either be numbers or semver strings.
    Gte,
    /// Less than. Values must either be numbers or semver strings.
    Lt,
    /// Less than or equal. Values must either be numbers or semver strings.
    Lte,
}

/// A named, reusable OR-combination of targets.
///
/// Matches iff any target matches. An empty target list never matches.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: u64,
    pub key: String,
    #[serde(rename = "type")]
    pub segment_type: SegmentType,
    pub targets: Vec<Target>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum SegmentType {
    UserId,
    UserProperty,
}

/// Traffic allocation table: an identifier is hashed into a slot number in `0..slot_size`, and
/// the slot (if any) names the assigned variation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub id: u64,
    pub seed: u64,
    pub slot_size: u64,
    pub slots: Vec<Slot>,
}

impl Bucket {
    /// Return the slot containing the given slot number, if any.
    pub fn slot(&self, slot_number: u64) -> Option<&Slot> {
        self.slots.iter().find(|it| it.contains(slot_number))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Slot {
    /// Inclusive start of the slot range.
    pub start: u64,
    /// Exclusive end of the slot range.
    pub end: u64,
    pub variation_id: u64,
}

impl Slot {
    pub(crate) fn contains(&self, slot_number: u64) -> bool {
        self.start <= slot_number && slot_number < self.end
    }
}

/// Mutual-exclusivity group. A container buckets users into groups; an experiment only receives
/// traffic from users whose group contains it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: u64,
    pub bucket_id: u64,
    pub groups: Vec<ContainerGroup>,
}

impl Container {
    pub fn group(&self, group_id: u64) -> Option<&ContainerGroup> {
        self.groups.iter().find(|it| it.id == group_id)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ContainerGroup {
    pub id: u64,
    pub experiments: Vec<u64>,
}

/// A remote config parameter definition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfigParameter {
    pub id: u64,
    pub key: String,
    /// Which identifier of the user this parameter targets on.
    pub identifier_type: String,
    /// Targeting rules, evaluated in declaration order.
    #[serde(default)]
    pub target_rules: Vec<RemoteConfigTargetRule>,
    pub default_value: RemoteConfigValue,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct RemoteConfigTargetRule {
    pub key: String,
    pub name: String,
    pub target: Target,
    pub value: RemoteConfigValue,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct RemoteConfigValue {
    pub id: u64,
    pub raw_value: PropertyValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variation(id: u64, key: &str) -> Variation {
        Variation {
            id,
            key: key.to_owned(),
            is_dropped: false,
            parameter_configuration_id: None,
        }
    }

    #[test]
    fn variation_lookups() {
        let experiment = Experiment {
            id: 1,
            key: 1,
            experiment_type: ExperimentType::AbTest,
            identifier_type: "$id".to_owned(),
            status: ExperimentStatus::Running,
            version: 1,
            execution_version: 1,
            variations: vec![variation(10, "A"), variation(11, "B")],
            user_overrides: HashMap::new(),
            segment_overrides: vec![],
            target_audiences: vec![],
            target_rules: vec![],
            default_rule: TargetAction::Bucket { bucket_id: 1 },
            container_id: None,
            winner_variation_id: Some(11),
        };

        assert_eq!(experiment.variation_by_id(10).map(|v| v.key.as_str()), Some("A"));
        assert_eq!(experiment.variation_by_key("B").map(|v| v.id), Some(11));
        assert_eq!(experiment.variation_by_key("C"), None);
        assert_eq!(experiment.winner_variation().map(|v| v.key.as_str()), Some("B"));
    }

    #[test]
    fn slot_range_is_start_inclusive_end_exclusive() {
        let bucket = Bucket {
            id: 1,
            seed: 42,
            slot_size: 10000,
            slots: vec![Slot {
                start: 0,
                end: 5000,
                variation_id: 10,
            }],
        };

        assert!(bucket.slot(0).is_some());
        assert!(bucket.slot(4999).is_some());
        assert!(bucket.slot(5000).is_none());
    }

    #[test]
    fn target_action_serialization_is_tagged() {
        let action = TargetAction::Bucket { bucket_id: 7 };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "BUCKET", "bucketId": 7})
        );
    }

    #[test]
    fn condition_match_field_serializes_as_match() {
        let condition = TargetCondition {
            key: TargetKey {
                key_type: TargetKeyType::UserProperty,
                name: "age".to_owned(),
            },
            matcher: TargetMatch {
                match_type: MatchType::Match,
                operator: MatchOperator::Gte,
                values: vec![18.0.into()],
            },
        };
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(json["key"]["type"], "USER_PROPERTY");
        assert!(json.get("match").is_some());
    }
}
