use serde::{Deserialize, Serialize};

use crate::{
    eval::{EvaluatorContext, ExperimentRequest, RemoteConfigRequest},
    flag::Variation,
    Properties, PropertyValue,
};

/// Enumerated reason explaining how a decision was reached.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum DecisionReason {
    Overridden,
    IdentifierNotFound,
    ExperimentDraft,
    ExperimentPaused,
    ExperimentCompleted,
    FeatureFlagInactive,
    NotInMutualExclusionExperiment,
    NotInExperimentTarget,
    TrafficNotAllocated,
    TrafficAllocated,
    VariationDropped,
    TargetRuleMatch,
    DefaultRule,
}

/// The result of running the engine once: a decision plus its reason and the nested evaluations
/// consulted while deciding.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum Evaluation {
    Experiment(ExperimentEvaluation),
    RemoteConfig(RemoteConfigEvaluation),
}

impl Evaluation {
    pub fn reason(&self) -> DecisionReason {
        match self {
            Evaluation::Experiment(it) => it.reason,
            Evaluation::RemoteConfig(it) => it.reason,
        }
    }

    pub fn target_evaluations(&self) -> &[Evaluation] {
        match self {
            Evaluation::Experiment(it) => &it.target_evaluations,
            Evaluation::RemoteConfig(it) => &it.target_evaluations,
        }
    }

    pub fn properties(&self) -> &Properties {
        match self {
            Evaluation::Experiment(it) => &it.properties,
            Evaluation::RemoteConfig(it) => &it.properties,
        }
    }
}

/// Decision for an experiment or feature flag request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentEvaluation {
    pub reason: DecisionReason,
    /// Nested evaluations consulted while deciding, in order. Kept for audit/visibility.
    pub target_evaluations: Vec<Evaluation>,
    pub experiment_id: u64,
    pub experiment_key: u64,
    /// Resolved variation id. `None` when the default variation key is not defined on the
    /// experiment.
    pub variation_id: Option<u64>,
    pub variation_key: String,
    /// Parameter configuration attached to the resolved variation, if any.
    pub parameter_configuration_id: Option<u64>,
    /// Free-form properties for analytics.
    #[serde(default)]
    pub properties: Properties,
}

impl ExperimentEvaluation {
    /// Build an evaluation for a concrete variation, capturing the nested evaluations collected
    /// in the context so far.
    pub fn of(
        request: &ExperimentRequest,
        context: &EvaluatorContext,
        variation: &Variation,
        reason: DecisionReason,
    ) -> ExperimentEvaluation {
        ExperimentEvaluation {
            reason,
            target_evaluations: context.evaluations().to_vec(),
            experiment_id: request.experiment.id,
            experiment_key: request.experiment.key,
            variation_id: Some(variation.id),
            variation_key: variation.key.clone(),
            parameter_configuration_id: variation.parameter_configuration_id,
            properties: Properties::new(),
        }
    }

    /// Build the fallback evaluation carrying the request's default variation key. The variation
    /// id is resolved when the experiment defines that key.
    pub fn of_default(
        request: &ExperimentRequest,
        context: &EvaluatorContext,
        reason: DecisionReason,
    ) -> ExperimentEvaluation {
        match request.experiment.variation_by_key(request.default_variation_key) {
            Some(variation) => ExperimentEvaluation::of(request, context, variation, reason),
            None => ExperimentEvaluation {
                reason,
                target_evaluations: context.evaluations().to_vec(),
                experiment_id: request.experiment.id,
                experiment_key: request.experiment.key,
                variation_id: None,
                variation_key: request.default_variation_key.to_owned(),
                parameter_configuration_id: None,
                properties: Properties::new(),
            },
        }
    }
}

/// Decision for a remote config parameter request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfigEvaluation {
    pub reason: DecisionReason,
    /// Nested evaluations consulted while deciding, in order.
    pub target_evaluations: Vec<Evaluation>,
    pub parameter_id: u64,
    pub parameter_key: String,
    /// Id of the parameter value that was served, when a defined value was served.
    pub value_id: Option<u64>,
    pub value: PropertyValue,
    /// Free-form properties for analytics. `returnValue` is always populated.
    pub properties: Properties,
}

impl RemoteConfigEvaluation {
    /// Build an evaluation from a resolved value. `returnValue` is recorded into the properties
    /// unconditionally; the nested evaluations are taken from the context at creation time.
    pub fn of(
        request: &RemoteConfigRequest,
        context: &EvaluatorContext,
        value_id: Option<u64>,
        value: PropertyValue,
        reason: DecisionReason,
        mut properties: Properties,
    ) -> RemoteConfigEvaluation {
        properties.insert("returnValue".to_owned(), value.clone());
        RemoteConfigEvaluation {
            reason,
            target_evaluations: context.evaluations().to_vec(),
            parameter_id: request.parameter.id,
            parameter_key: request.parameter.key.clone(),
            value_id,
            value,
            properties,
        }
    }

    /// Build an evaluation serving the parameter's default value.
    pub fn of_default(
        request: &RemoteConfigRequest,
        context: &EvaluatorContext,
        reason: DecisionReason,
        properties: Properties,
    ) -> RemoteConfigEvaluation {
        let default_value = &request.parameter.default_value;
        RemoteConfigEvaluation::of(
            request,
            context,
            Some(default_value.id),
            default_value.raw_value.clone(),
            reason,
            properties,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{test_support, EvaluatorContext};
    use crate::flag::{RemoteConfigParameter, RemoteConfigValue};

    #[test]
    fn nested_evaluations_are_captured_in_the_result() {
        let workspace = test_support::workspace_with_default_experiment();
        let user = test_support::user("user-1");
        let request = test_support::experiment_request(&workspace, &user, 1);
        let mut context = EvaluatorContext::new();

        let nested =
            ExperimentEvaluation::of_default(&request, &context, DecisionReason::TrafficAllocated);
        context.add_evaluation(Evaluation::Experiment(nested.clone()));

        let evaluation =
            ExperimentEvaluation::of_default(&request, &context, DecisionReason::DefaultRule);
        assert_eq!(
            evaluation.target_evaluations,
            vec![Evaluation::Experiment(nested)]
        );
    }

    #[test]
    fn remote_config_evaluation_captures_nested_evaluations() {
        let workspace = test_support::workspace_with_default_experiment();
        let user = test_support::user("user-1");
        let experiment_request = test_support::experiment_request(&workspace, &user, 1);
        let parameter = RemoteConfigParameter {
            id: 7,
            key: "greeting".to_owned(),
            identifier_type: "$id".to_owned(),
            target_rules: vec![],
            default_value: RemoteConfigValue {
                id: 100,
                raw_value: "hello".into(),
            },
        };
        let request = crate::eval::RemoteConfigRequest::of(&workspace, &user, &parameter, "".into());
        let mut context = EvaluatorContext::new();

        let nested = ExperimentEvaluation::of_default(
            &experiment_request,
            &context,
            DecisionReason::TrafficAllocated,
        );
        context.add_evaluation(Evaluation::Experiment(nested.clone()));

        let evaluation = RemoteConfigEvaluation::of_default(
            &request,
            &context,
            DecisionReason::DefaultRule,
            Properties::new(),
        );
        assert_eq!(
            evaluation.target_evaluations,
            vec![Evaluation::Experiment(nested)]
        );
        assert_eq!(
            evaluation.properties.get("returnValue"),
            Some(&"hello".into())
        );
    }
}
