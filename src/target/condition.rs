use std::sync::Arc;

use crate::{
    eval::{EvaluatorContext, EvaluatorRequest},
    flag::{MatchType, TargetCondition, TargetKeyType},
    target::{SegmentMatcher, UserValueResolver, ValueOperatorMatcher},
    EvaluationError, Result,
};

/// Evaluates one targeting condition: a resolved user value against the condition's rule.
pub trait ConditionMatcher: Send + Sync {
    fn matches(
        &self,
        request: &dyn EvaluatorRequest,
        context: &mut EvaluatorContext,
        condition: &TargetCondition,
    ) -> Result<bool>;
}

/// Matches conditions whose key resolves to a user value (identifier, user property, or system
/// property).
#[derive(Default)]
pub struct UserConditionMatcher {
    value_resolver: UserValueResolver,
    value_operator_matcher: ValueOperatorMatcher,
}

impl UserConditionMatcher {
    pub fn new() -> UserConditionMatcher {
        UserConditionMatcher::default()
    }
}

impl ConditionMatcher for UserConditionMatcher {
    fn matches(
        &self,
        request: &dyn EvaluatorRequest,
        _context: &mut EvaluatorContext,
        condition: &TargetCondition,
    ) -> Result<bool> {
        let Some(user_value) = self
            .value_resolver
            .resolve_or_none(request.user(), &condition.key)?
        else {
            return Ok(false);
        };
        Ok(self
            .value_operator_matcher
            .matches(&user_value, &condition.matcher))
    }
}

/// Matches `SEGMENT`-kind conditions by evaluating segment membership through the
/// [`SegmentMatcher`].
pub struct SegmentConditionMatcher {
    segment_matcher: SegmentMatcher,
}

impl SegmentConditionMatcher {
    pub fn new(segment_matcher: SegmentMatcher) -> SegmentConditionMatcher {
        SegmentConditionMatcher { segment_matcher }
    }

    fn value_matches(
        &self,
        request: &dyn EvaluatorRequest,
        context: &mut EvaluatorContext,
        condition: &TargetCondition,
    ) -> Result<bool> {
        for value in &condition.matcher.values {
            let segment_key = value
                .as_str()
                .ok_or(EvaluationError::InvalidSegmentMatchValue)?;
            let segment = request
                .workspace()
                .segment(segment_key)
                .ok_or_else(|| EvaluationError::SegmentNotFound(segment_key.to_owned()))?;
            if self.segment_matcher.matches(request, context, segment)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl ConditionMatcher for SegmentConditionMatcher {
    fn matches(
        &self,
        request: &dyn EvaluatorRequest,
        context: &mut EvaluatorContext,
        condition: &TargetCondition,
    ) -> Result<bool> {
        if condition.key.key_type != TargetKeyType::Segment {
            return Err(EvaluationError::UnsupportedTargetKeyType(
                condition.key.key_type,
            ));
        }
        let matched = self.value_matches(request, context, condition)?;
        Ok(match condition.matcher.match_type {
            MatchType::Match => matched,
            MatchType::NotMatch => !matched,
        })
    }
}

/// Selects the condition matcher for a condition's key kind.
pub struct ConditionMatcherFactory {
    user_condition_matcher: Arc<UserConditionMatcher>,
    segment_condition_matcher: Arc<SegmentConditionMatcher>,
}

impl Default for ConditionMatcherFactory {
    fn default() -> Self {
        ConditionMatcherFactory::new()
    }
}

impl ConditionMatcherFactory {
    pub fn new() -> ConditionMatcherFactory {
        let user_condition_matcher = Arc::new(UserConditionMatcher::new());
        let segment_condition_matcher = Arc::new(SegmentConditionMatcher::new(
            SegmentMatcher::new(user_condition_matcher.clone()),
        ));
        ConditionMatcherFactory {
            user_condition_matcher,
            segment_condition_matcher,
        }
    }

    /// Return the matcher for the given key kind, or `None` when no matcher exists for it.
    pub fn matcher_or_none(&self, key_type: TargetKeyType) -> Option<Arc<dyn ConditionMatcher>> {
        match key_type {
            TargetKeyType::UserId
            | TargetKeyType::UserProperty
            | TargetKeyType::SystemProperty => Some(self.user_condition_matcher.clone() as _),
            TargetKeyType::Segment => Some(self.segment_condition_matcher.clone() as _),
        }
    }
}
