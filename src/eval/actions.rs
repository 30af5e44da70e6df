use std::sync::Arc;

use crate::{
    eval::{EvaluatorContext, ExperimentRequest},
    flag::{TargetAction, Variation},
    sharder::Bucketer,
    target::TargetMatcher,
    EvaluationError, Result,
};

/// Resolves a [`TargetAction`] to a concrete variation.
pub struct ActionResolver {
    bucketer: Bucketer,
}

impl Default for ActionResolver {
    fn default() -> Self {
        ActionResolver::new()
    }
}

impl ActionResolver {
    pub fn new() -> ActionResolver {
        ActionResolver {
            bucketer: Bucketer::new(),
        }
    }

    /// Resolve the action to a variation. Returns `None` when the user's identifier is missing or
    /// the identifier lands outside every slot of the bucket (traffic not allocated).
    pub fn resolve_or_none<'a>(
        &self,
        request: &ExperimentRequest<'a>,
        action: &TargetAction,
    ) -> Result<Option<&'a Variation>> {
        match action {
            TargetAction::Variation { variation_id } => {
                let variation = request
                    .experiment
                    .variation_by_id(*variation_id)
                    .ok_or(EvaluationError::VariationNotFound(*variation_id))?;
                Ok(Some(variation))
            }
            TargetAction::Bucket { bucket_id } => {
                let bucket = request
                    .workspace
                    .bucket(*bucket_id)
                    .ok_or(EvaluationError::BucketNotFound(*bucket_id))?;
                let Some(identifier) = request.user.identifier(&request.experiment.identifier_type)
                else {
                    return Ok(None);
                };
                let Some(slot) = self.bucketer.bucketing(bucket, identifier) else {
                    return Ok(None);
                };
                Ok(request.experiment.variation_by_id(slot.variation_id))
            }
        }
    }
}

/// Resolves per-user and per-segment overrides, in that order.
pub struct OverrideResolver {
    target_matcher: Arc<TargetMatcher>,
    action_resolver: Arc<ActionResolver>,
}

impl OverrideResolver {
    pub fn new(
        target_matcher: Arc<TargetMatcher>,
        action_resolver: Arc<ActionResolver>,
    ) -> OverrideResolver {
        OverrideResolver {
            target_matcher,
            action_resolver,
        }
    }

    pub fn resolve_or_none<'a>(
        &self,
        request: &ExperimentRequest<'a>,
        context: &mut EvaluatorContext,
    ) -> Result<Option<&'a Variation>> {
        if let Some(variation) = self.resolve_user_override(request) {
            return Ok(Some(variation));
        }
        self.resolve_segment_override(request, context)
    }

    fn resolve_user_override<'a>(&self, request: &ExperimentRequest<'a>) -> Option<&'a Variation> {
        let identifier = request.user.identifier(&request.experiment.identifier_type)?;
        let variation_id = request.experiment.user_overrides.get(identifier)?;
        request.experiment.variation_by_id(*variation_id)
    }

    fn resolve_segment_override<'a>(
        &self,
        request: &ExperimentRequest<'a>,
        context: &mut EvaluatorContext,
    ) -> Result<Option<&'a Variation>> {
        for rule in &request.experiment.segment_overrides {
            if self.target_matcher.matches(request, context, &rule.target)? {
                return self.action_resolver.resolve_or_none(request, &rule.action);
            }
        }
        Ok(None)
    }
}
