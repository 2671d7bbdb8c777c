//! Logging metadata actions.

use super::{ActionKind, RuleAction};
use crate::engine::{Rule, Transaction};
use crate::error::Result;

/// The `log` action: marks the rule for audit logging on match.
#[derive(Default)]
pub struct Log;

impl RuleAction for Log {
    fn init(&mut self, rule: &mut Rule, _param: &str) -> Result<()> {
        rule.log = true;
        Ok(())
    }

    fn evaluate(&self, _rule: &Rule, _tx: &mut Transaction) {}

    fn kind(&self) -> ActionKind {
        ActionKind::NonDisruptive
    }
}

/// The `nolog` action: suppresses audit logging for the rule.
#[derive(Default)]
pub struct NoLog;

impl RuleAction for NoLog {
    fn init(&mut self, rule: &mut Rule, _param: &str) -> Result<()> {
        rule.log = false;
        Ok(())
    }

    fn evaluate(&self, _rule: &Rule, _tx: &mut Transaction) {}

    fn kind(&self) -> ActionKind {
        ActionKind::NonDisruptive
    }
}
