//! The rule evaluation engine: rules, transactions, interruptions.

pub mod interruption;
pub mod phase;
pub mod rule;
pub mod transaction;

pub use interruption::{Interruption, InterruptionKind};
pub use phase::Phase;
pub use rule::{
    OperatorSpec, Rule, SelectorKey, Severity, TransformationStep, VariableException, VariableSpec,
};
pub use transaction::{MatchData, MatchedRule, RuleTargetException, Transaction};
