//! Action framework for rule execution.

mod data;
mod disruptive;
mod flow;
mod metadata;

pub use data::SetVar;
pub use disruptive::{Deny, Drop};
pub use flow::{Pass, SkipAfter};
pub use metadata::{Log, NoLog};

use std::sync::Arc;

use crate::engine::{Rule, Transaction};
use crate::error::Result;

/// Classification that decides *when* an action runs during evaluation.
///
/// Non-disruptive actions run as soon as the current rule matches, even on a
/// partial chain; disruptive and flow actions run only on the chain head once
/// the full conjunction holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Logging, metadata, variable setters, captures.
    NonDisruptive,
    /// Deny, drop, redirect, allow.
    Disruptive,
    /// Skip, skipAfter, pass.
    Flow,
}

/// An action attached to a rule.
pub trait RuleAction: Send + Sync {
    /// Initialize the action during compilation, before it is bound to the
    /// rule with [`Rule::add_action`].
    fn init(&mut self, rule: &mut Rule, param: &str) -> Result<()> {
        let _ = (rule, param);
        Ok(())
    }

    /// Run the action against a transaction.
    fn evaluate(&self, rule: &Rule, tx: &mut Transaction);

    /// The action's scheduling kind.
    fn kind(&self) -> ActionKind;
}

/// A named action bound to a rule.
#[derive(Clone)]
pub struct ActionBinding {
    /// The action's dialect name, used for logging.
    pub name: String,
    /// The initialized action.
    pub action: Arc<dyn RuleAction>,
}

impl std::fmt::Debug for ActionBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionBinding")
            .field("name", &self.name)
            .field("kind", &self.action.kind())
            .finish()
    }
}
