//! Evaluation flows and top-level evaluators.
//!
//! An evaluation request is answered by walking a per-entity-type chain of decision steps
//! ([`EvaluationFlow`]). Each step either produces a terminal decision or defers to the rest of
//! the chain. The [`EvaluatorContext`] guards against circular evaluation and collects the
//! nested evaluations produced along the way.

mod actions;
mod context;
mod evaluation;
mod evaluator;
mod flow;
mod flow_evaluators;
mod flow_factory;

pub use actions::{ActionResolver, OverrideResolver};
pub use context::{EvaluatorContext, EvaluatorKey, EvaluatorType};
pub use evaluation::{DecisionReason, Evaluation, ExperimentEvaluation, RemoteConfigEvaluation};
pub use evaluator::{
    Evaluator, EvaluatorRequest, ExperimentEvaluator, ExperimentRequest, RemoteConfigEvaluator,
    RemoteConfigRequest, Request,
};
pub use flow::{EvaluationFlow, FlowEvaluator};
pub use flow_evaluators::{
    CompletedExperimentEvaluator, ContainerEvaluator, DefaultRuleEvaluator,
    DraftExperimentEvaluator, ExperimentTargetEvaluator, IdentifierEvaluator, OverrideEvaluator,
    PausedExperimentEvaluator, TargetRuleEvaluator, TrafficAllocateEvaluator,
};
pub use flow_factory::EvaluationFlowFactory;
