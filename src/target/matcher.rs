use std::sync::Arc;

use log::warn;

use crate::{
    eval::{EvaluatorContext, EvaluatorRequest},
    flag::{Segment, Target},
    target::{ConditionMatcher, ConditionMatcherFactory, UserConditionMatcher},
    Result,
};

/// Matches a [`Target`] against a request: all conditions must match (AND).
///
/// An empty condition list trivially matches. A condition whose key kind has no matcher does not
/// fail the evaluation but the target does not match.
pub struct TargetMatcher {
    condition_matcher_factory: ConditionMatcherFactory,
}

impl Default for TargetMatcher {
    fn default() -> Self {
        TargetMatcher::new()
    }
}

impl TargetMatcher {
    pub fn new() -> TargetMatcher {
        TargetMatcher {
            condition_matcher_factory: ConditionMatcherFactory::new(),
        }
    }

    pub fn matches(
        &self,
        request: &dyn EvaluatorRequest,
        context: &mut EvaluatorContext,
        target: &Target,
    ) -> Result<bool> {
        for condition in &target.conditions {
            let Some(matcher) = self
                .condition_matcher_factory
                .matcher_or_none(condition.key.key_type)
            else {
                warn!(target: "flagon",
                      key_type:? = condition.key.key_type;
                      "no condition matcher for target key type");
                return Ok(false);
            };
            if !matcher.matches(request, context, condition)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Matches a [`Segment`] against a request: the user belongs when any of the segment's targets
/// matches (OR).
///
/// A segment with no targets never matches. Segment targets only carry user-value conditions, so
/// matching goes through the [`UserConditionMatcher`] directly and never recurses.
pub struct SegmentMatcher {
    user_condition_matcher: Arc<UserConditionMatcher>,
}

impl SegmentMatcher {
    pub fn new(user_condition_matcher: Arc<UserConditionMatcher>) -> SegmentMatcher {
        SegmentMatcher {
            user_condition_matcher,
        }
    }

    pub fn matches(
        &self,
        request: &dyn EvaluatorRequest,
        context: &mut EvaluatorContext,
        segment: &Segment,
    ) -> Result<bool> {
        for target in &segment.targets {
            if self.target_matches(request, context, target)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn target_matches(
        &self,
        request: &dyn EvaluatorRequest,
        context: &mut EvaluatorContext,
        target: &Target,
    ) -> Result<bool> {
        for condition in &target.conditions {
            if !self
                .user_condition_matcher
                .matches(request, context, condition)?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
