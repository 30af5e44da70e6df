use crate::flag::TargetKeyType;

/// Represents a result type for operations in the Flagon engine.
///
/// This `Result` type is a standard Rust `Result` type where the error variant is defined by the
/// engine-specific [`EvaluationError`] enum.
pub type Result<T> = std::result::Result<T, EvaluationError>;

/// Enum representing possible errors that can occur during evaluation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EvaluationError {
    /// A request re-triggered its own evaluation before completing. The outer SDK layer is
    /// expected to catch this and fall back to a default decision.
    #[error("Circular evaluation has occurred")]
    CircularEvaluation,

    /// The value resolver was asked to resolve a `SEGMENT`-kind key directly. Segment membership
    /// must go through the segment matcher, so this indicates a caller or configuration bug.
    #[error("unsupported target key type: {0:?}")]
    UnsupportedTargetKeyType(TargetKeyType),

    /// A condition referenced a segment that does not exist in the workspace.
    #[error("segment not found: {0}")]
    SegmentNotFound(String),

    /// An action or container referenced a bucket that does not exist in the workspace.
    #[error("bucket not found: {0}")]
    BucketNotFound(u64),

    /// An experiment referenced a container that does not exist in the workspace.
    #[error("container not found: {0}")]
    ContainerNotFound(u64),

    /// A rule or slot referenced a variation that does not exist in the experiment.
    #[error("variation not found: {0}")]
    VariationNotFound(u64),

    /// An experiment in `COMPLETED` status has no winner variation recorded.
    #[error("winner variation not found: experiment {0}")]
    WinnerVariationNotFound(u64),

    /// A segment condition carried a non-string match value.
    #[error("segment match value must be a string")]
    InvalidSegmentMatchValue,

    /// The evaluator does not support this request kind.
    #[error("unsupported evaluator request")]
    UnsupportedRequest,
}
