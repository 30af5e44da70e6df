use std::sync::Arc;

use crate::{
    eval::{
        ActionResolver, DecisionReason, EvaluationFlow, EvaluatorContext, ExperimentEvaluation,
        ExperimentRequest, FlowEvaluator,
    },
    eval::actions::OverrideResolver,
    flag::{ExperimentStatus, ExperimentType},
    sharder::Bucketer,
    target::TargetMatcher,
    EvaluationError, Result,
};

/// Serves per-user and per-segment overrides before any other decision step.
pub struct OverrideEvaluator {
    override_resolver: OverrideResolver,
}

impl OverrideEvaluator {
    pub fn new(override_resolver: OverrideResolver) -> OverrideEvaluator {
        OverrideEvaluator { override_resolver }
    }
}

impl FlowEvaluator for OverrideEvaluator {
    fn evaluate(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
        next_flow: &EvaluationFlow,
    ) -> Result<ExperimentEvaluation> {
        match self.override_resolver.resolve_or_none(request, context)? {
            Some(variation) => Ok(ExperimentEvaluation::of(
                request,
                context,
                variation,
                DecisionReason::Overridden,
            )),
            None => next_flow.evaluate(request, context),
        }
    }
}

/// Short-circuits when the user has no identifier of the experiment's identifier type.
pub struct IdentifierEvaluator;

impl FlowEvaluator for IdentifierEvaluator {
    fn evaluate(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
        next_flow: &EvaluationFlow,
    ) -> Result<ExperimentEvaluation> {
        if request
            .user
            .identifier(&request.experiment.identifier_type)
            .is_some()
        {
            next_flow.evaluate(request, context)
        } else {
            Ok(ExperimentEvaluation::of_default(
                request,
                context,
                DecisionReason::IdentifierNotFound,
            ))
        }
    }
}

/// Mutual-exclusivity gate: only users bucketed into the experiment's container group receive
/// the experiment.
pub struct ContainerEvaluator {
    bucketer: Bucketer,
}

impl Default for ContainerEvaluator {
    fn default() -> Self {
        ContainerEvaluator::new()
    }
}

impl ContainerEvaluator {
    pub fn new() -> ContainerEvaluator {
        ContainerEvaluator {
            bucketer: Bucketer::new(),
        }
    }

    fn is_user_in_container_group(&self, request: &ExperimentRequest) -> Result<bool> {
        let Some(container_id) = request.experiment.container_id else {
            return Ok(true);
        };
        let container = request
            .workspace
            .container(container_id)
            .ok_or(EvaluationError::ContainerNotFound(container_id))?;
        let bucket = request
            .workspace
            .bucket(container.bucket_id)
            .ok_or(EvaluationError::BucketNotFound(container.bucket_id))?;

        let Some(identifier) = request.user.identifier(&request.experiment.identifier_type) else {
            return Ok(false);
        };
        let Some(slot) = self.bucketer.bucketing(bucket, identifier) else {
            return Ok(false);
        };
        let in_group = container
            .group(slot.variation_id)
            .is_some_and(|group| group.experiments.contains(&request.experiment.id));
        Ok(in_group)
    }
}

impl FlowEvaluator for ContainerEvaluator {
    fn evaluate(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
        next_flow: &EvaluationFlow,
    ) -> Result<ExperimentEvaluation> {
        if self.is_user_in_container_group(request)? {
            next_flow.evaluate(request, context)
        } else {
            Ok(ExperimentEvaluation::of_default(
                request,
                context,
                DecisionReason::NotInMutualExclusionExperiment,
            ))
        }
    }
}

/// Audience gate: the user must match at least one audience target. An empty audience list means
/// everyone.
pub struct ExperimentTargetEvaluator {
    target_matcher: Arc<TargetMatcher>,
}

impl ExperimentTargetEvaluator {
    pub fn new(target_matcher: Arc<TargetMatcher>) -> ExperimentTargetEvaluator {
        ExperimentTargetEvaluator { target_matcher }
    }

    fn is_user_in_experiment_target(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
    ) -> Result<bool> {
        if request.experiment.target_audiences.is_empty() {
            return Ok(true);
        }
        for audience in &request.experiment.target_audiences {
            if self.target_matcher.matches(request, context, audience)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl FlowEvaluator for ExperimentTargetEvaluator {
    fn evaluate(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
        next_flow: &EvaluationFlow,
    ) -> Result<ExperimentEvaluation> {
        if self.is_user_in_experiment_target(request, context)? {
            next_flow.evaluate(request, context)
        } else {
            Ok(ExperimentEvaluation::of_default(
                request,
                context,
                DecisionReason::NotInExperimentTarget,
            ))
        }
    }
}

/// Lifecycle gate for experiments still in `DRAFT`.
pub struct DraftExperimentEvaluator;

impl FlowEvaluator for DraftExperimentEvaluator {
    fn evaluate(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
        next_flow: &EvaluationFlow,
    ) -> Result<ExperimentEvaluation> {
        if request.experiment.status == ExperimentStatus::Draft {
            Ok(ExperimentEvaluation::of_default(
                request,
                context,
                DecisionReason::ExperimentDraft,
            ))
        } else {
            next_flow.evaluate(request, context)
        }
    }
}

/// Lifecycle gate for `PAUSED` experiments. A paused feature flag reports the flag as inactive.
pub struct PausedExperimentEvaluator;

impl FlowEvaluator for PausedExperimentEvaluator {
    fn evaluate(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
        next_flow: &EvaluationFlow,
    ) -> Result<ExperimentEvaluation> {
        if request.experiment.status != ExperimentStatus::Paused {
            return next_flow.evaluate(request, context);
        }
        let reason = match request.experiment.experiment_type {
            ExperimentType::AbTest => DecisionReason::ExperimentPaused,
            ExperimentType::FeatureFlag => DecisionReason::FeatureFlagInactive,
        };
        Ok(ExperimentEvaluation::of_default(request, context, reason))
    }
}

/// Lifecycle gate for `COMPLETED` experiments: serves the recorded winner variation.
pub struct CompletedExperimentEvaluator;

impl FlowEvaluator for CompletedExperimentEvaluator {
    fn evaluate(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
        next_flow: &EvaluationFlow,
    ) -> Result<ExperimentEvaluation> {
        if request.experiment.status != ExperimentStatus::Completed {
            return next_flow.evaluate(request, context);
        }
        let winner = request
            .experiment
            .winner_variation()
            .ok_or(EvaluationError::WinnerVariationNotFound(
                request.experiment.id,
            ))?;
        Ok(ExperimentEvaluation::of(
            request,
            context,
            winner,
            DecisionReason::ExperimentCompleted,
        ))
    }
}

/// Terminal allocation step of the `AB_TEST` flow: buckets the user through the experiment's
/// default rule.
pub struct TrafficAllocateEvaluator {
    action_resolver: Arc<ActionResolver>,
}

impl TrafficAllocateEvaluator {
    pub fn new(action_resolver: Arc<ActionResolver>) -> TrafficAllocateEvaluator {
        TrafficAllocateEvaluator { action_resolver }
    }
}

impl FlowEvaluator for TrafficAllocateEvaluator {
    fn evaluate(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
        _next_flow: &EvaluationFlow,
    ) -> Result<ExperimentEvaluation> {
        let variation = self
            .action_resolver
            .resolve_or_none(request, &request.experiment.default_rule)?;
        Ok(match variation {
            None => ExperimentEvaluation::of_default(
                request,
                context,
                DecisionReason::TrafficNotAllocated,
            ),
            Some(variation) if variation.is_dropped => ExperimentEvaluation::of_default(
                request,
                context,
                DecisionReason::VariationDropped,
            ),
            Some(variation) => ExperimentEvaluation::of(
                request,
                context,
                variation,
                DecisionReason::TrafficAllocated,
            ),
        })
    }
}

/// Ordered rule matching for feature flags: the first rule whose target matches decides.
pub struct TargetRuleEvaluator {
    target_matcher: Arc<TargetMatcher>,
    action_resolver: Arc<ActionResolver>,
}

impl TargetRuleEvaluator {
    pub fn new(
        target_matcher: Arc<TargetMatcher>,
        action_resolver: Arc<ActionResolver>,
    ) -> TargetRuleEvaluator {
        TargetRuleEvaluator {
            target_matcher,
            action_resolver,
        }
    }
}

impl FlowEvaluator for TargetRuleEvaluator {
    fn evaluate(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
        next_flow: &EvaluationFlow,
    ) -> Result<ExperimentEvaluation> {
        if request
            .user
            .identifier(&request.experiment.identifier_type)
            .is_none()
        {
            return next_flow.evaluate(request, context);
        }
        for rule in &request.experiment.target_rules {
            if self.target_matcher.matches(request, context, &rule.target)? {
                // A matched rule whose action cannot allocate (e.g. a partial-rollout bucket
                // miss) falls through to the default rule.
                match self.action_resolver.resolve_or_none(request, &rule.action)? {
                    Some(variation) => {
                        return Ok(ExperimentEvaluation::of(
                            request,
                            context,
                            variation,
                            DecisionReason::TargetRuleMatch,
                        ))
                    }
                    None => return next_flow.evaluate(request, context),
                }
            }
        }
        next_flow.evaluate(request, context)
    }
}

/// Applies the feature flag's default rule when no target rule matched.
pub struct DefaultRuleEvaluator {
    action_resolver: Arc<ActionResolver>,
}

impl DefaultRuleEvaluator {
    pub fn new(action_resolver: Arc<ActionResolver>) -> DefaultRuleEvaluator {
        DefaultRuleEvaluator { action_resolver }
    }
}

impl FlowEvaluator for DefaultRuleEvaluator {
    fn evaluate(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
        _next_flow: &EvaluationFlow,
    ) -> Result<ExperimentEvaluation> {
        if request
            .user
            .identifier(&request.experiment.identifier_type)
            .is_none()
        {
            return Ok(ExperimentEvaluation::of_default(
                request,
                context,
                DecisionReason::DefaultRule,
            ));
        }
        let variation = self
            .action_resolver
            .resolve_or_none(request, &request.experiment.default_rule)?;
        Ok(match variation {
            Some(variation) => ExperimentEvaluation::of(
                request,
                context,
                variation,
                DecisionReason::DefaultRule,
            ),
            None => {
                ExperimentEvaluation::of_default(request, context, DecisionReason::DefaultRule)
            }
        })
    }
}
