use std::sync::Arc;

use crate::{
    eval::{DecisionReason, EvaluatorContext, ExperimentEvaluation, ExperimentRequest},
    Result,
};

/// One decision step of an evaluation flow.
///
/// A flow evaluator either returns a concrete evaluation, terminating the chain early, or calls
/// `next_flow.evaluate(..)` to defer to the rest of the chain.
pub trait FlowEvaluator: Send + Sync {
    fn evaluate(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
        next_flow: &EvaluationFlow,
    ) -> Result<ExperimentEvaluation>;
}

/// An ordered, type-specific chain of decision steps applied to one evaluation request.
///
/// The chain is an immutable linked structure built once at startup: each decision node owns its
/// flow evaluator and the rest of the chain; the distinguished terminal node returns the fallback
/// decision with reason `TRAFFIC_NOT_ALLOCATED`.
pub enum EvaluationFlow {
    End,
    Decision {
        flow_evaluator: Arc<dyn FlowEvaluator>,
        next_flow: Box<EvaluationFlow>,
    },
}

impl EvaluationFlow {
    /// Build a chain left-to-right: the first evaluator wraps the flow built from the rest, with
    /// the terminal node at the end.
    pub fn of<I>(flow_evaluators: I) -> EvaluationFlow
    where
        I: IntoIterator<Item = Arc<dyn FlowEvaluator>>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut flow = EvaluationFlow::End;
        for flow_evaluator in flow_evaluators.into_iter().rev() {
            flow = EvaluationFlow::Decision {
                flow_evaluator,
                next_flow: Box::new(flow),
            };
        }
        flow
    }

    pub fn is_end(&self) -> bool {
        matches!(self, EvaluationFlow::End)
    }

    pub fn evaluate(
        &self,
        request: &ExperimentRequest,
        context: &mut EvaluatorContext,
    ) -> Result<ExperimentEvaluation> {
        match self {
            EvaluationFlow::End => Ok(ExperimentEvaluation::of_default(
                request,
                context,
                DecisionReason::TrafficNotAllocated,
            )),
            EvaluationFlow::Decision {
                flow_evaluator,
                next_flow,
            } => flow_evaluator.evaluate(request, context, next_flow),
        }
    }

    /// The evaluator of this node, or `None` on the terminal node.
    pub fn flow_evaluator(&self) -> Option<&Arc<dyn FlowEvaluator>> {
        match self {
            EvaluationFlow::End => None,
            EvaluationFlow::Decision { flow_evaluator, .. } => Some(flow_evaluator),
        }
    }

    /// The rest of the chain, or `None` on the terminal node.
    pub fn next_flow(&self) -> Option<&EvaluationFlow> {
        match self {
            EvaluationFlow::End => None,
            EvaluationFlow::Decision { next_flow, .. } => Some(next_flow),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{EvaluationFlow, FlowEvaluator};
    use crate::{
        eval::{DecisionReason, EvaluatorContext, ExperimentEvaluation, ExperimentRequest},
        Result,
    };

    struct Continue;

    impl FlowEvaluator for Continue {
        fn evaluate(
            &self,
            request: &ExperimentRequest,
            context: &mut EvaluatorContext,
            next_flow: &EvaluationFlow,
        ) -> Result<ExperimentEvaluation> {
            next_flow.evaluate(request, context)
        }
    }

    struct Terminate(DecisionReason);

    impl FlowEvaluator for Terminate {
        fn evaluate(
            &self,
            request: &ExperimentRequest,
            context: &mut EvaluatorContext,
            _next_flow: &EvaluationFlow,
        ) -> Result<ExperimentEvaluation> {
            Ok(ExperimentEvaluation::of_default(request, context, self.0))
        }
    }

    #[test]
    fn of_builds_chain_left_to_right() {
        let flow = EvaluationFlow::of([
            Arc::new(Continue) as Arc<dyn FlowEvaluator>,
            Arc::new(Continue),
            Arc::new(Continue),
        ]);

        let second = flow.next_flow().unwrap();
        let third = second.next_flow().unwrap();
        let end = third.next_flow().unwrap();

        assert!(!flow.is_end());
        assert!(!second.is_end());
        assert!(!third.is_end());
        assert!(end.is_end());
        assert!(end.flow_evaluator().is_none());
    }

    #[test]
    fn empty_flow_is_the_terminal_node() {
        let flow = EvaluationFlow::of(Vec::<Arc<dyn FlowEvaluator>>::new());
        assert!(flow.is_end());
    }

    #[test]
    fn terminal_node_returns_traffic_not_allocated_default() {
        let workspace = crate::eval::test_support::workspace_with_default_experiment();
        let user = crate::eval::test_support::user("user-1");
        let request =
            crate::eval::test_support::experiment_request(&workspace, &user, 1);
        let mut context = EvaluatorContext::new();

        let evaluation = EvaluationFlow::End.evaluate(&request, &mut context).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::TrafficNotAllocated);
        assert_eq!(evaluation.variation_key, "A");
    }

    #[test]
    fn decision_node_can_terminate_early() {
        let workspace = crate::eval::test_support::workspace_with_default_experiment();
        let user = crate::eval::test_support::user("user-1");
        let request =
            crate::eval::test_support::experiment_request(&workspace, &user, 1);
        let mut context = EvaluatorContext::new();

        let flow = EvaluationFlow::of([
            Arc::new(Continue) as Arc<dyn FlowEvaluator>,
            Arc::new(Terminate(DecisionReason::ExperimentDraft)),
            Arc::new(Terminate(DecisionReason::ExperimentPaused)),
        ]);

        let evaluation = flow.evaluate(&request, &mut context).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::ExperimentDraft);
    }
}
