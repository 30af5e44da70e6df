use std::sync::Arc;

use crate::{
    eval::{
        actions::OverrideResolver,
        flow_evaluators::{
            CompletedExperimentEvaluator, ContainerEvaluator, DefaultRuleEvaluator,
            DraftExperimentEvaluator, ExperimentTargetEvaluator, IdentifierEvaluator,
            OverrideEvaluator, PausedExperimentEvaluator, TargetRuleEvaluator,
            TrafficAllocateEvaluator,
        },
        ActionResolver, EvaluationFlow, FlowEvaluator,
    },
    flag::ExperimentType,
    target::TargetMatcher,
};

/// Builds and holds the per-entity-type evaluation flows.
///
/// Flows are assembled once at construction from a declarative evaluator list and reused for
/// every request.
pub struct EvaluationFlowFactory {
    ab_test_flow: EvaluationFlow,
    feature_flag_flow: EvaluationFlow,
}

impl Default for EvaluationFlowFactory {
    fn default() -> Self {
        EvaluationFlowFactory::new()
    }
}

impl EvaluationFlowFactory {
    pub fn new() -> EvaluationFlowFactory {
        let target_matcher = Arc::new(TargetMatcher::new());
        let action_resolver = Arc::new(ActionResolver::new());

        let override_evaluator = |target_matcher: &Arc<TargetMatcher>,
                                  action_resolver: &Arc<ActionResolver>| {
            Arc::new(OverrideEvaluator::new(OverrideResolver::new(
                target_matcher.clone(),
                action_resolver.clone(),
            ))) as Arc<dyn FlowEvaluator>
        };

        let ab_test_evaluators: Vec<Arc<dyn FlowEvaluator>> = vec![
            override_evaluator(&target_matcher, &action_resolver),
            Arc::new(IdentifierEvaluator),
            Arc::new(ContainerEvaluator::new()),
            Arc::new(ExperimentTargetEvaluator::new(target_matcher.clone())),
            Arc::new(DraftExperimentEvaluator),
            Arc::new(PausedExperimentEvaluator),
            Arc::new(CompletedExperimentEvaluator),
            Arc::new(TrafficAllocateEvaluator::new(action_resolver.clone())),
        ];
        let ab_test_flow = EvaluationFlow::of(ab_test_evaluators);

        let feature_flag_evaluators: Vec<Arc<dyn FlowEvaluator>> = vec![
            Arc::new(DraftExperimentEvaluator),
            Arc::new(PausedExperimentEvaluator),
            Arc::new(CompletedExperimentEvaluator),
            override_evaluator(&target_matcher, &action_resolver),
            Arc::new(IdentifierEvaluator),
            Arc::new(TargetRuleEvaluator::new(
                target_matcher.clone(),
                action_resolver.clone(),
            )),
            Arc::new(DefaultRuleEvaluator::new(action_resolver)),
        ];
        let feature_flag_flow = EvaluationFlow::of(feature_flag_evaluators);

        EvaluationFlowFactory {
            ab_test_flow,
            feature_flag_flow,
        }
    }

    /// Return the prebuilt chain for the given entity type.
    pub fn flow(&self, experiment_type: ExperimentType) -> &EvaluationFlow {
        match experiment_type {
            ExperimentType::AbTest => &self.ab_test_flow,
            ExperimentType::FeatureFlag => &self.feature_flag_flow,
        }
    }
}
