//! Pattern matching operators.

use std::sync::Arc;

use regex::Regex;

use super::Operator;
use crate::engine::Transaction;
use crate::error::{Error, Result};

/// Regular expression operator (`@rx`).
pub struct Rx {
    regex: Arc<Regex>,
}

impl Rx {
    /// Compile the operator from its raw pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| Error::RegexCompile {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            regex: Arc::new(regex),
        })
    }
}

impl Operator for Rx {
    fn evaluate(&self, _tx: &Transaction, value: &str) -> bool {
        self.regex.is_match(value)
    }

    fn name(&self) -> &'static str {
        "rx"
    }
}
