use std::sync::Arc;

use crate::{
    eval::{
        DecisionReason, EvaluationFlowFactory, EvaluatorContext, EvaluatorKey, EvaluatorType,
        Evaluation, ExperimentEvaluation, RemoteConfigEvaluation,
    },
    flag::{Experiment, RemoteConfigParameter},
    target::TargetMatcher,
    EvaluationError, InternalUser, Properties, PropertyValue, Result, Workspace,
};

/// Common shape of a top-level evaluation request: the definition snapshot it runs against, the
/// user, and the identity used by the recursion guard.
pub trait EvaluatorRequest {
    fn key(&self) -> EvaluatorKey;
    fn workspace(&self) -> &Workspace;
    fn user(&self) -> &InternalUser;
}

/// A request to evaluate an experiment or feature flag.
#[derive(Clone, Copy)]
pub struct ExperimentRequest<'a> {
    pub workspace: &'a Workspace,
    pub user: &'a InternalUser,
    pub experiment: &'a Experiment,
    /// Variation key served when no decision step allocates one. Conventionally the control
    /// variation key `"A"`.
    pub default_variation_key: &'a str,
}

impl<'a> ExperimentRequest<'a> {
    pub fn of(
        workspace: &'a Workspace,
        user: &'a InternalUser,
        experiment: &'a Experiment,
    ) -> ExperimentRequest<'a> {
        ExperimentRequest {
            workspace,
            user,
            experiment,
            default_variation_key: "A",
        }
    }
}

impl EvaluatorRequest for ExperimentRequest<'_> {
    fn key(&self) -> EvaluatorKey {
        EvaluatorKey::new(EvaluatorType::Experiment, self.experiment.id)
    }

    fn workspace(&self) -> &Workspace {
        self.workspace
    }

    fn user(&self) -> &InternalUser {
        self.user
    }
}

/// A request to evaluate a remote config parameter.
#[derive(Clone)]
pub struct RemoteConfigRequest<'a> {
    pub workspace: &'a Workspace,
    pub user: &'a InternalUser,
    pub parameter: &'a RemoteConfigParameter,
    /// Caller-supplied fallback, served when the user cannot be targeted at all (e.g. the
    /// required identifier is missing).
    pub default_value: PropertyValue,
}

impl<'a> RemoteConfigRequest<'a> {
    pub fn of(
        workspace: &'a Workspace,
        user: &'a InternalUser,
        parameter: &'a RemoteConfigParameter,
        default_value: PropertyValue,
    ) -> RemoteConfigRequest<'a> {
        RemoteConfigRequest {
            workspace,
            user,
            parameter,
            default_value,
        }
    }
}

impl EvaluatorRequest for RemoteConfigRequest<'_> {
    fn key(&self) -> EvaluatorKey {
        EvaluatorKey::new(EvaluatorType::RemoteConfig, self.parameter.id)
    }

    fn workspace(&self) -> &Workspace {
        self.workspace
    }

    fn user(&self) -> &InternalUser {
        self.user
    }
}

/// Closed set of request kinds the top-level evaluators dispatch on.
pub enum Request<'a> {
    Experiment(&'a ExperimentRequest<'a>),
    RemoteConfig(&'a RemoteConfigRequest<'a>),
}

/// A top-level evaluation entry point, polymorphic over the request kind.
pub trait Evaluator {
    /// Return `true` only for the request kind this evaluator handles.
    fn supports(&self, request: &Request) -> bool;

    fn evaluate(&self, request: &Request, context: &mut EvaluatorContext) -> Result<Evaluation>;
}

/// Evaluates experiments and feature flags by selecting the flow for the experiment's type and
/// driving it, guarded against circular evaluation.
pub struct ExperimentEvaluator {
    flow_factory: EvaluationFlowFactory,
}

impl Default for ExperimentEvaluator {
    fn default() -> Self {
        ExperimentEvaluator::new()
    }
}

impl ExperimentEvaluator {
    pub fn new() -> ExperimentEvaluator {
        ExperimentEvaluator {
            flow_factory: EvaluationFlowFactory::new(),
        }
    }

    pub fn evaluate_experiment(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
    ) -> Result<ExperimentEvaluation> {
        let key = request.key();
        context.add_request(key)?;
        let result = self
            .flow_factory
            .flow(request.experiment.experiment_type)
            .evaluate(request, context);
        context.remove_request(&key);

        match &result {
            Ok(evaluation) => {
                log::trace!(target: "flagon",
                    experiment_key = request.experiment.key,
                    variation_key = evaluation.variation_key.as_str(),
                    reason:serde = evaluation.reason;
                    "evaluated an experiment");
            }
            Err(err) => {
                log::warn!(target: "flagon",
                    experiment_key = request.experiment.key;
                    "error occurred while evaluating an experiment: {err}");
            }
        }

        result
    }
}

impl Evaluator for ExperimentEvaluator {
    fn supports(&self, request: &Request) -> bool {
        matches!(request, Request::Experiment(_))
    }

    fn evaluate(&self, request: &Request, context: &mut EvaluatorContext) -> Result<Evaluation> {
        match request {
            Request::Experiment(request) => self
                .evaluate_experiment(request, context)
                .map(Evaluation::Experiment),
            _ => Err(EvaluationError::UnsupportedRequest),
        }
    }
}

/// Evaluates remote config parameters: identifier gate, then ordered target rules, then the
/// parameter's default value.
pub struct RemoteConfigEvaluator {
    target_matcher: Arc<TargetMatcher>,
}

impl Default for RemoteConfigEvaluator {
    fn default() -> Self {
        RemoteConfigEvaluator::new()
    }
}

impl RemoteConfigEvaluator {
    pub fn new() -> RemoteConfigEvaluator {
        RemoteConfigEvaluator::with_matcher(Arc::new(TargetMatcher::new()))
    }

    pub fn with_matcher(target_matcher: Arc<TargetMatcher>) -> RemoteConfigEvaluator {
        RemoteConfigEvaluator { target_matcher }
    }

    pub fn evaluate_remote_config(
        &self,
        request: &RemoteConfigRequest,
        context: &mut EvaluatorContext,
    ) -> Result<RemoteConfigEvaluation> {
        let key = request.key();
        context.add_request(key)?;
        let result = self.evaluate_inner(request, context);
        context.remove_request(&key);
        result
    }

    fn evaluate_inner(
        &self,
        request: &RemoteConfigRequest,
        context: &mut EvaluatorContext,
    ) -> Result<RemoteConfigEvaluation> {
        let parameter = request.parameter;

        if request.user.identifier(&parameter.identifier_type).is_none() {
            return Ok(RemoteConfigEvaluation::of(
                request,
                context,
                None,
                request.default_value.clone(),
                DecisionReason::IdentifierNotFound,
                Properties::new(),
            ));
        }

        for target_rule in &parameter.target_rules {
            if self
                .target_matcher
                .matches(request, context, &target_rule.target)?
            {
                let mut properties = Properties::new();
                properties.insert(
                    "targetRuleKey".to_owned(),
                    target_rule.key.clone().into(),
                );
                properties.insert(
                    "targetRuleName".to_owned(),
                    target_rule.name.clone().into(),
                );
                return Ok(RemoteConfigEvaluation::of(
                    request,
                    context,
                    Some(target_rule.value.id),
                    target_rule.value.raw_value.clone(),
                    DecisionReason::TargetRuleMatch,
                    properties,
                ));
            }
        }

        Ok(RemoteConfigEvaluation::of_default(
            request,
            context,
            DecisionReason::DefaultRule,
            Properties::new(),
        ))
    }
}

impl Evaluator for RemoteConfigEvaluator {
    fn supports(&self, request: &Request) -> bool {
        matches!(request, Request::RemoteConfig(_))
    }

    fn evaluate(&self, request: &Request, context: &mut EvaluatorContext) -> Result<Evaluation> {
        match request {
            Request::RemoteConfig(request) => self
                .evaluate_remote_config(request, context)
                .map(Evaluation::RemoteConfig),
            _ => Err(EvaluationError::UnsupportedRequest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::test_support;
    use crate::flag::{
        MatchOperator, MatchType, RemoteConfigTargetRule, RemoteConfigValue, Target,
        TargetCondition, TargetKey, TargetKeyType, TargetMatch,
    };

    #[test]
    fn circular_evaluation_fails_closed() {
        let _ = env_logger::builder().is_test(true).try_init();

        let workspace = test_support::workspace_with_default_experiment();
        let user = test_support::user("user-1");
        let request = test_support::experiment_request(&workspace, &user, 1);

        let mut context = EvaluatorContext::new();
        context.add_request(request.key()).unwrap();

        let evaluator = ExperimentEvaluator::new();
        let result = evaluator.evaluate_experiment(&request, &mut context);
        assert_eq!(result, Err(EvaluationError::CircularEvaluation));
        // The guard must not disturb the pre-existing stack entry.
        assert_eq!(context.stack_depth(), 1);
    }

    #[test]
    fn stack_depth_is_restored_after_evaluation() {
        let workspace = test_support::workspace_with_default_experiment();
        let user = test_support::user("user-1");
        let request = test_support::experiment_request(&workspace, &user, 1);

        let mut context = EvaluatorContext::new();
        let evaluator = ExperimentEvaluator::new();
        evaluator
            .evaluate_experiment(&request, &mut context)
            .unwrap();
        assert_eq!(context.stack_depth(), 0);
    }

    #[test]
    fn running_ab_test_reaches_traffic_allocation() {
        let _ = env_logger::builder().is_test(true).try_init();

        let workspace = test_support::workspace_with_default_experiment();
        let user = test_support::user("user-1");
        let request = test_support::experiment_request(&workspace, &user, 1);

        let mut context = EvaluatorContext::new();
        let evaluation = ExperimentEvaluator::new()
            .evaluate_experiment(&request, &mut context)
            .unwrap();

        // The full-range bucket allocates everyone, so reaching TRAFFIC_ALLOCATED proves none of
        // the earlier steps short-circuited.
        assert_eq!(evaluation.reason, DecisionReason::TrafficAllocated);
        assert_eq!(evaluation.variation_key, "B");
        assert_eq!(evaluation.variation_id, Some(11));
    }

    #[test]
    fn evaluator_trait_dispatches_on_request_kind() {
        let workspace = test_support::workspace_with_default_experiment();
        let user = test_support::user("user-1");
        let request = test_support::experiment_request(&workspace, &user, 1);
        let request = Request::Experiment(&request);

        let experiment_evaluator = ExperimentEvaluator::new();
        let remote_config_evaluator = RemoteConfigEvaluator::new();
        assert!(experiment_evaluator.supports(&request));
        assert!(!remote_config_evaluator.supports(&request));
        assert_eq!(
            remote_config_evaluator.evaluate(&request, &mut EvaluatorContext::new()),
            Err(EvaluationError::UnsupportedRequest)
        );
    }

    fn parameter(rules: Vec<RemoteConfigTargetRule>) -> RemoteConfigParameter {
        RemoteConfigParameter {
            id: 7,
            key: "greeting".to_owned(),
            identifier_type: "$id".to_owned(),
            target_rules: rules,
            default_value: RemoteConfigValue {
                id: 100,
                raw_value: "hello".into(),
            },
        }
    }

    fn rule_matching_user(id_value: &str, value: RemoteConfigValue) -> RemoteConfigTargetRule {
        RemoteConfigTargetRule {
            key: "rule-1".to_owned(),
            name: "first rule".to_owned(),
            target: Target {
                conditions: vec![TargetCondition {
                    key: TargetKey {
                        key_type: TargetKeyType::UserId,
                        name: "$id".to_owned(),
                    },
                    matcher: TargetMatch {
                        match_type: MatchType::Match,
                        operator: MatchOperator::In,
                        values: vec![id_value.into()],
                    },
                }],
            },
            value,
        }
    }

    #[test]
    fn remote_config_serves_default_value_when_no_rule_matches() {
        let workspace = Workspace::new(vec![], vec![], vec![], vec![], vec![], vec![]);
        let user = test_support::user("user-1");
        let parameter = parameter(vec![rule_matching_user(
            "someone-else",
            RemoteConfigValue {
                id: 101,
                raw_value: "bonjour".into(),
            },
        )]);
        let request = RemoteConfigRequest::of(&workspace, &user, &parameter, "fallback".into());

        let evaluation = RemoteConfigEvaluator::new()
            .evaluate_remote_config(&request, &mut EvaluatorContext::new())
            .unwrap();
        assert_eq!(evaluation.reason, DecisionReason::DefaultRule);
        assert_eq!(evaluation.value_id, Some(100));
        assert_eq!(evaluation.value, "hello".into());
        assert_eq!(
            evaluation.properties.get("returnValue"),
            Some(&"hello".into())
        );
    }

    #[test]
    fn remote_config_serves_first_matching_rule() {
        let workspace = Workspace::new(vec![], vec![], vec![], vec![], vec![], vec![]);
        let user = test_support::user("user-1");
        let parameter = parameter(vec![rule_matching_user(
            "user-1",
            RemoteConfigValue {
                id: 101,
                raw_value: "bonjour".into(),
            },
        )]);
        let request = RemoteConfigRequest::of(&workspace, &user, &parameter, "fallback".into());

        let evaluation = RemoteConfigEvaluator::new()
            .evaluate_remote_config(&request, &mut EvaluatorContext::new())
            .unwrap();
        assert_eq!(evaluation.reason, DecisionReason::TargetRuleMatch);
        assert_eq!(evaluation.value_id, Some(101));
        assert_eq!(
            evaluation.properties.get("returnValue"),
            Some(&"bonjour".into())
        );
        assert_eq!(
            evaluation.properties.get("targetRuleKey"),
            Some(&"rule-1".into())
        );
    }

    #[test]
    fn remote_config_missing_identifier_serves_request_default() {
        let workspace = Workspace::new(vec![], vec![], vec![], vec![], vec![], vec![]);
        let user = InternalUser::default();
        let parameter = parameter(vec![]);
        let request = RemoteConfigRequest::of(&workspace, &user, &parameter, "fallback".into());

        let evaluation = RemoteConfigEvaluator::new()
            .evaluate_remote_config(&request, &mut EvaluatorContext::new())
            .unwrap();
        assert_eq!(evaluation.reason, DecisionReason::IdentifierNotFound);
        assert_eq!(evaluation.value_id, None);
        assert_eq!(evaluation.value, "fallback".into());
        assert_eq!(
            evaluation.properties.get("returnValue"),
            Some(&"fallback".into())
        );
    }
}
