//! Operator predicates at the heart of rules.

mod comparison;
mod pattern;

pub use comparison::{Contains, Streq};
pub use pattern::Rx;

use crate::engine::Transaction;

/// The boolean predicate of a rule (`@rx`, `@streq`, `@contains`, ...).
///
/// Operators are initialized from their raw parameter at construction time;
/// constructors return `Result` so a bad parameter fails compilation, not
/// evaluation. During evaluation an operator may read transaction state (for
/// macro expansion) but signals trouble only through a `false` result.
pub trait Operator: Send + Sync {
    /// Evaluate the operator against a single transformed value.
    fn evaluate(&self, tx: &Transaction, value: &str) -> bool;

    /// Get the operator name.
    fn name(&self) -> &'static str;
}
