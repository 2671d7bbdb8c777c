//! Data actions (variable setters).

use super::{ActionKind, RuleAction};
use crate::engine::{Rule, Transaction};
use crate::error::{Error, Result};
use crate::variables::RuleVariable;

/// The `setvar` action: writes into a rule-writable collection.
///
/// Parameter forms: `tx.score=5`, `tx.score=+1`, `tx.score=-1`,
/// `!tx.score`. Values are macro expanded at evaluation time.
pub struct SetVar {
    variable: RuleVariable,
    key: String,
    op: SetVarOp,
}

enum SetVarOp {
    Set(String),
    Increment(String),
    Decrement(String),
    Delete,
}

impl SetVar {
    /// Create an uninitialized `setvar`; `init` fills it from the raw param.
    pub fn new() -> Self {
        Self {
            variable: RuleVariable::Tx,
            key: String::new(),
            op: SetVarOp::Set(String::new()),
        }
    }

    fn parse_target(&mut self, target: &str) -> Result<()> {
        let (collection, key) = target.split_once('.').ok_or_else(|| invalid(target))?;
        self.variable = RuleVariable::from_name(collection).ok_or_else(|| invalid(target))?;
        if key.is_empty() {
            return Err(invalid(target));
        }
        self.key = key.to_lowercase();
        Ok(())
    }
}

impl Default for SetVar {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(param: &str) -> Error {
    Error::InvalidActionArgument {
        action: "setvar".to_string(),
        message: format!("cannot parse target '{param}'"),
    }
}

impl RuleAction for SetVar {
    fn init(&mut self, _rule: &mut Rule, param: &str) -> Result<()> {
        if let Some(target) = param.strip_prefix('!') {
            self.parse_target(target)?;
            self.op = SetVarOp::Delete;
            return Ok(());
        }
        let (target, value) = param.split_once('=').ok_or_else(|| invalid(param))?;
        self.parse_target(target)?;
        self.op = if let Some(amount) = value.strip_prefix('+') {
            SetVarOp::Increment(amount.to_string())
        } else if let Some(amount) = value.strip_prefix('-') {
            SetVarOp::Decrement(amount.to_string())
        } else {
            SetVarOp::Set(value.to_string())
        };
        Ok(())
    }

    fn evaluate(&self, _rule: &Rule, tx: &mut Transaction) {
        match &self.op {
            SetVarOp::Set(value) => {
                let value = tx.macro_expand(value);
                tx.variables_mut().set(self.variable, self.key.as_str(), value);
            }
            SetVarOp::Increment(amount) => self.arith(tx, amount, 1),
            SetVarOp::Decrement(amount) => self.arith(tx, amount, -1),
            SetVarOp::Delete => {
                tx.variables_mut().collection_mut(self.variable).remove(&self.key);
            }
        }
    }

    fn kind(&self) -> ActionKind {
        ActionKind::NonDisruptive
    }
}

impl SetVar {
    fn arith(&self, tx: &mut Transaction, amount: &str, sign: i64) {
        let amount: i64 = tx.macro_expand(amount).parse().unwrap_or(0);
        let current: i64 = tx
            .variables()
            .first(self.variable, &self.key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let next = current + sign * amount;
        tx.variables_mut().set(self.variable, self.key.as_str(), next.to_string());
    }
}
