//! String comparison operators.

use super::Operator;
use crate::engine::Transaction;
use crate::error::Result;

/// String equality operator (`@streq`).
///
/// The target is macro expanded against the transaction before comparison.
pub struct Streq {
    target: String,
}

impl Streq {
    /// Create the operator from its raw parameter.
    pub fn new(target: &str) -> Result<Self> {
        Ok(Self {
            target: target.to_string(),
        })
    }
}

impl Operator for Streq {
    fn evaluate(&self, tx: &Transaction, value: &str) -> bool {
        tx.macro_expand(&self.target) == value
    }

    fn name(&self) -> &'static str {
        "streq"
    }
}

/// Substring operator (`@contains`).
pub struct Contains {
    needle: String,
}

impl Contains {
    /// Create the operator from its raw parameter.
    pub fn new(needle: &str) -> Result<Self> {
        Ok(Self {
            needle: needle.to_string(),
        })
    }
}

impl Operator for Contains {
    fn evaluate(&self, tx: &Transaction, value: &str) -> bool {
        let needle = tx.macro_expand(&self.needle);
        value.contains(needle.as_str())
    }

    fn name(&self) -> &'static str {
        "contains"
    }
}
