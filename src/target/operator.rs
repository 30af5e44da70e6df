use regex::Regex;
use semver::Version;

use crate::{
    flag::{MatchOperator, MatchType, TargetMatch},
    PropertyValue,
};

/// Applies a [`TargetMatch`] rule to a resolved user value: the operator is tried against every
/// expected value (any-of), then the match type applies or inverts the result.
#[derive(Debug, Default)]
pub struct ValueOperatorMatcher;

impl ValueOperatorMatcher {
    pub fn matches(&self, user_value: &PropertyValue, target_match: &TargetMatch) -> bool {
        let matched = target_match
            .values
            .iter()
            .any(|value| target_match.operator.eval(user_value, value));
        match target_match.match_type {
            MatchType::Match => matched,
            MatchType::NotMatch => !matched,
        }
    }
}

impl MatchOperator {
    /// Applying the operator to the values. Returns `false` if the operator cannot be applied or
    /// there's a misconfiguration.
    pub(crate) fn eval(&self, user_value: &PropertyValue, match_value: &PropertyValue) -> bool {
        self.try_eval(user_value, match_value).unwrap_or(false)
    }

    /// Try applying the operator to the values, returning `None` if the operator cannot be
    /// applied.
    fn try_eval(&self, user_value: &PropertyValue, match_value: &PropertyValue) -> Option<bool> {
        match self {
            Self::In => match (user_value, match_value) {
                (PropertyValue::String(a), PropertyValue::String(b)) => Some(a == b),
                (PropertyValue::Number(a), PropertyValue::Number(b)) => Some(a == b),
                (PropertyValue::Boolean(a), PropertyValue::Boolean(b)) => Some(a == b),
                _ => None,
            },

            Self::Contains | Self::StartsWith | Self::EndsWith => {
                let a = user_value.as_str()?;
                let b = match_value.as_str()?;
                Some(match self {
                    Self::Contains => a.contains(b),
                    Self::StartsWith => a.starts_with(b),
                    Self::EndsWith => a.ends_with(b),
                    _ => return None,
                })
            }

            Self::Matches => {
                let s = user_value.as_str()?;
                let regex = Regex::new(match_value.as_str()?).ok()?;
                Some(regex.is_match(s))
            }

            Self::Gte | Self::Gt | Self::Lte | Self::Lt => {
                let match_version = match_value.as_str().and_then(|s| Version::parse(s).ok());

                if let Some(match_version) = match_version {
                    // semver comparison
                    let user_version = Version::parse(user_value.as_str()?).ok()?;

                    Some(match self {
                        Self::Gt => user_version > match_version,
                        Self::Gte => user_version >= match_version,
                        Self::Lt => user_version < match_version,
                        Self::Lte => user_version <= match_version,
                        _ => {
                            // unreachable
                            return None;
                        }
                    })
                } else {
                    // numeric comparison
                    let match_number = match match_value {
                        PropertyValue::Number(n) => *n,
                        PropertyValue::String(s) => s.parse().ok()?,
                        _ => return None,
                    };
                    let user_number = match user_value {
                        PropertyValue::Number(n) => *n,
                        PropertyValue::String(s) => s.parse().ok()?,
                        _ => return None,
                    };

                    Some(match self {
                        Self::Gt => user_number > match_number,
                        Self::Gte => user_number >= match_number,
                        Self::Lt => user_number < match_number,
                        Self::Lte => user_number <= match_number,
                        _ => {
                            // unreachable
                            return None;
                        }
                    })
                }
            }
        }
    }
}
