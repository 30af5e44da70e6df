//! Targeting sublayer: resolving user values, matching single conditions, and combining them
//! into target (AND) and segment (OR) matches.

mod condition;
mod matcher;
mod operator;
mod value_resolver;

pub use condition::{
    ConditionMatcher, ConditionMatcherFactory, SegmentConditionMatcher, UserConditionMatcher,
};
pub use matcher::{SegmentMatcher, TargetMatcher};
pub use operator::ValueOperatorMatcher;
pub use value_resolver::UserValueResolver;
