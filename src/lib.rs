//! # rampart
//!
//! SecRules-compatible WAF rule evaluation core.
//!
//! This crate implements the evaluation pipeline at the heart of a
//! ModSecurity-style engine: variable selection with per-rule key
//! exceptions, transformation pipelines with multi-match semantics,
//! operator dispatch with negation, chained rule conjunctions, and the
//! strict ordering of non-disruptive versus disruptive actions. A multipart
//! body processor feeds upload metadata and post fields into the
//! transaction's variable store.
//!
//! Rule parsing, configuration loading, HTTP integration and audit
//! persistence are external collaborators; this crate only defines their
//! seams.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use rampart::{Rule, RuleVariable, Transaction};
//! use rampart::operators::Rx;
//!
//! // SecRule ARGS "@rx ^attack$" "id:1001,log"
//! let mut rule = Rule::new();
//! rule.id = 1001;
//! rule.log = true;
//! rule.add_variable(RuleVariable::Args, None, false)?;
//! rule.set_operator(Arc::new(Rx::new("^attack$")?), "@rx", "^attack$");
//!
//! let mut tx = Transaction::new("tx-1");
//! tx.variables_mut().add(RuleVariable::Args, "q", "attack");
//!
//! let matches = rule.evaluate(&mut tx);
//! assert_eq!(matches.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod actions;
pub mod bodyprocessors;
pub mod engine;
pub mod error;
pub mod operators;
pub mod transformations;
pub mod variables;

// Re-export main types at crate root
pub use engine::{
    Interruption, InterruptionKind, MatchData, MatchedRule, Phase, Rule, SelectorKey, Severity,
    Transaction,
};
pub use error::{Error, Result};
pub use variables::RuleVariable;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
