//! Flow actions (pass, skipAfter).

use super::{ActionKind, RuleAction};
use crate::engine::{Rule, Transaction};
use crate::error::{Error, Result};

/// The `pass` action: continue processing, only recording the match.
#[derive(Default)]
pub struct Pass;

impl RuleAction for Pass {
    fn evaluate(&self, _rule: &Rule, _tx: &mut Transaction) {}

    fn kind(&self) -> ActionKind {
        ActionKind::Flow
    }
}

/// The `skipAfter` action: asks the phase runner to jump past a marker.
pub struct SkipAfter {
    marker: String,
}

impl SkipAfter {
    /// Create an uninitialized `skipAfter`; `init` fills the marker.
    pub fn new() -> Self {
        Self {
            marker: String::new(),
        }
    }
}

impl Default for SkipAfter {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleAction for SkipAfter {
    fn init(&mut self, _rule: &mut Rule, param: &str) -> Result<()> {
        if param.is_empty() {
            return Err(Error::InvalidActionArgument {
                action: "skipAfter".to_string(),
                message: "missing marker".to_string(),
            });
        }
        self.marker = param.to_string();
        Ok(())
    }

    fn evaluate(&self, _rule: &Rule, tx: &mut Transaction) {
        tx.set_skip_after(&self.marker);
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Flow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_after_records_marker() {
        let mut rule = Rule::new();
        let mut action = SkipAfter::new();
        action.init(&mut rule, "END-HOST-CHECK").unwrap();

        let mut tx = Transaction::new("t1");
        action.evaluate(&rule, &mut tx);
        assert_eq!(tx.skip_after(), Some("END-HOST-CHECK"));
    }

    #[test]
    fn test_pass_is_inert() {
        let rule = Rule::new();
        let mut tx = Transaction::new("t1");
        Pass.evaluate(&rule, &mut tx);
        assert!(tx.interruption().is_none());
        assert_eq!(Pass.kind(), ActionKind::Flow);
    }

    #[test]
    fn test_skip_after_requires_marker() {
        let mut rule = Rule::new();
        let mut action = SkipAfter::new();
        assert!(matches!(
            action.init(&mut rule, ""),
            Err(Error::InvalidActionArgument { .. })
        ));
    }
}
