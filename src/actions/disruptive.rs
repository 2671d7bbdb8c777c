//! Disruptive actions (deny, drop).

use super::{ActionKind, RuleAction};
use crate::engine::{Interruption, Rule, Transaction};
use crate::error::{Error, Result};

/// The `deny` action: records a blocking interruption on the transaction.
pub struct Deny {
    status: u16,
}

impl Deny {
    /// Create a `deny` with the default 403 status.
    pub fn new() -> Self {
        Self { status: 403 }
    }
}

impl Default for Deny {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleAction for Deny {
    fn init(&mut self, rule: &mut Rule, param: &str) -> Result<()> {
        if !param.is_empty() {
            self.status = param.parse().map_err(|_| Error::InvalidActionArgument {
                action: "deny".to_string(),
                message: format!("invalid status '{param}'"),
            })?;
        }
        rule.disruptive = true;
        Ok(())
    }

    fn evaluate(&self, rule: &Rule, tx: &mut Transaction) {
        tx.interrupt(Interruption::deny(self.status, rule.id));
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Disruptive
    }
}

/// The `drop` action: records a connection-drop interruption.
#[derive(Default)]
pub struct Drop;

impl RuleAction for Drop {
    fn init(&mut self, rule: &mut Rule, _param: &str) -> Result<()> {
        rule.disruptive = true;
        Ok(())
    }

    fn evaluate(&self, rule: &Rule, tx: &mut Transaction) {
        tx.interrupt(Interruption::drop(rule.id));
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Disruptive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deny_records_interruption() {
        let mut rule = Rule::new();
        rule.id = 7;
        let mut action = Deny::new();
        action.init(&mut rule, "429").unwrap();
        assert!(rule.disruptive);

        let mut tx = Transaction::new("t1");
        action.evaluate(&rule, &mut tx);
        let interruption = tx.interruption().unwrap();
        assert_eq!(interruption.status, 429);
        assert_eq!(interruption.rule_id, 7);
    }

    #[test]
    fn test_drop_records_interruption() {
        use crate::engine::InterruptionKind;

        let mut rule = Rule::new();
        rule.id = 9;
        let mut action = Drop;
        action.init(&mut rule, "").unwrap();

        let mut tx = Transaction::new("t1");
        action.evaluate(&rule, &mut tx);
        assert_eq!(tx.interruption().unwrap().kind, InterruptionKind::Drop);
    }

    #[test]
    fn test_deny_bad_status() {
        let mut rule = Rule::new();
        let mut action = Deny::new();
        assert!(matches!(
            action.init(&mut rule, "teapot"),
            Err(Error::InvalidActionArgument { .. })
        ));
    }
}
