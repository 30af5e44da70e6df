use serde::{Deserialize, Serialize};

use crate::{eval::Evaluation, EvaluationError, Result};

/// Kind of a top-level evaluation request.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum EvaluatorType {
    Experiment,
    RemoteConfig,
}

/// Identity of an in-flight evaluation request, used by the recursion guard.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatorKey {
    pub evaluator_type: EvaluatorType,
    pub id: u64,
}

impl EvaluatorKey {
    pub fn new(evaluator_type: EvaluatorType, id: u64) -> EvaluatorKey {
        EvaluatorKey { evaluator_type, id }
    }
}

/// Per-call evaluation state: the recursion-guard stack of in-flight requests and the ordered
/// list of sub-evaluations produced while answering one request.
///
/// A context is created fresh for every outer evaluation call and discarded at the end of that
/// call. Contexts are never shared across threads or across independent top-level calls, so no
/// locking is needed here.
#[derive(Debug, Default)]
pub struct EvaluatorContext {
    stack: Vec<EvaluatorKey>,
    evaluations: Vec<Evaluation>,
}

impl EvaluatorContext {
    pub fn new() -> EvaluatorContext {
        EvaluatorContext::default()
    }

    /// Push the request onto the in-flight stack. Fails with
    /// [`EvaluationError::CircularEvaluation`] without mutating any state if an equal request is
    /// already on the stack.
    pub fn add_request(&mut self, key: EvaluatorKey) -> Result<()> {
        if self.stack.contains(&key) {
            return Err(EvaluationError::CircularEvaluation);
        }
        self.stack.push(key);
        Ok(())
    }

    /// Pop the request from the in-flight stack. Called on both success and failure paths so the
    /// stack is restored to its pre-call depth.
    pub fn remove_request(&mut self, key: &EvaluatorKey) {
        self.stack.retain(|it| it != key);
    }

    /// Append a nested evaluation consulted while deciding the current request.
    pub fn add_evaluation(&mut self, evaluation: Evaluation) {
        self.evaluations.push(evaluation);
    }

    /// The ordered list of nested evaluations produced so far.
    pub fn evaluations(&self) -> &[Evaluation] {
        &self.evaluations
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn contains_request(&self, key: &EvaluatorKey) -> bool {
        self.stack.contains(key)
    }
}
