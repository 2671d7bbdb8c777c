//! Per-request transaction state and the variable selector.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::interruption::Interruption;
use super::rule::{Rule, VariableSpec};
use crate::bodyprocessors::CollectionsMap;
use crate::variables::{RuleVariable, VariableStore};

/// One matched `(variable, key, value)` tuple.
#[derive(Debug, Clone)]
pub struct MatchData {
    /// The variable kind the value came from.
    pub variable: RuleVariable,
    /// The variable's dialect name, empty for synthetic matches.
    pub variable_name: &'static str,
    /// The entry key, empty for keyless variables.
    pub key: String,
    /// The (transformed) value the operator accepted.
    pub value: String,
}

impl MatchData {
    /// The synthetic match used by rules without an operator.
    pub fn synthetic() -> Self {
        Self {
            variable: RuleVariable::Unknown,
            variable_name: "",
            key: String::new(),
            value: String::new(),
        }
    }
}

/// A match record escaping to the audit sink.
#[derive(Debug, Clone)]
pub struct MatchedRule {
    /// Snapshot of the rule that matched.
    pub rule: Rule,
    /// The canonical (first) match of the rule.
    pub match_data: MatchData,
    /// Macro-expanded rule message.
    pub message: String,
    /// Macro-expanded rule logdata.
    pub data: String,
    /// Request URI at match time.
    pub uri: String,
    /// Owning transaction id.
    pub transaction_id: String,
    /// Whether the rule carries a disruptive action.
    pub disruptive: bool,
    /// Server IP address.
    pub server_ip: String,
    /// Client IP address.
    pub client_ip: String,
}

/// A runtime-injected target removal for a specific rule.
#[derive(Debug, Clone)]
pub struct RuleTargetException {
    /// The variable the removal applies to.
    pub variable: RuleVariable,
    /// The literal key to exclude; empty excludes the whole variable.
    pub key_str: String,
}

static MACRO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%\{([A-Za-z0-9_.\-]+)\}").expect("macro pattern"));

/// The per-HTTP-request state rules are evaluated against.
///
/// A transaction is owned by one logical thread for its whole lifetime; the
/// compiled rules it is evaluated with are shared and never mutated.
pub struct Transaction {
    /// Unique transaction identifier.
    pub id: String,
    variables: VariableStore,
    matched_rules: Vec<MatchedRule>,
    last_match: Option<MatchData>,
    interruption: Option<Interruption>,
    skip_after: Option<String>,
    rule_remove_target_by_id: HashMap<u64, Vec<RuleTargetException>>,
}

impl Transaction {
    /// Create a transaction with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut variables = VariableStore::new();
        variables.set(RuleVariable::UniqueId, "", id.clone());
        Self {
            id,
            variables,
            matched_rules: Vec::new(),
            last_match: None,
            interruption: None,
            skip_after: None,
            rule_remove_target_by_id: HashMap::new(),
        }
    }

    /// The transaction's variable store.
    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    /// Mutable access to the variable store.
    pub fn variables_mut(&mut self) -> &mut VariableStore {
        &mut self.variables
    }

    /// Materialize the concrete matches a variable spec selects right now.
    ///
    /// An entry is retained iff the spec's key predicate accepts it and no
    /// exception does. With the count flag, a single synthetic entry carrying
    /// the decimal count is returned instead.
    pub fn get_field(&self, spec: &VariableSpec) -> Vec<MatchData> {
        let mut out = Vec::new();
        if let Some(col) = self.variables.collection(spec.variable) {
            for (key, values) in col.iter() {
                if !spec.selects(key) {
                    continue;
                }
                if spec.exceptions.iter().any(|e| e.matches(key)) {
                    continue;
                }
                for value in values {
                    out.push(MatchData {
                        variable: spec.variable,
                        variable_name: spec.variable.name(),
                        key: key.to_string(),
                        value: value.clone(),
                    });
                }
            }
        }
        if spec.count {
            return vec![MatchData {
                variable: spec.variable,
                variable_name: spec.variable.name(),
                key: String::new(),
                value: out.len().to_string(),
            }];
        }
        out
    }

    /// Expand `%{VAR}` and `%{COLLECTION.key}` placeholders against the
    /// variable store. Unknown variables are left verbatim.
    pub fn macro_expand(&self, text: &str) -> String {
        if !text.contains("%{") {
            return text.to_string();
        }
        MACRO_PATTERN
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let token = &caps[1];
                let (name, key) = match token.split_once('.') {
                    Some((name, key)) => (name, key.to_lowercase()),
                    None => (token, String::new()),
                };
                match RuleVariable::from_name(name) {
                    Some(variable) => self
                        .variables
                        .first(variable, &key)
                        .unwrap_or_default()
                        .to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Announce a match: publishes it as `MATCHED_VAR`/`MATCHED_VARS` and
    /// remembers it as the most recent match.
    pub fn match_variable(&mut self, data: MatchData) {
        let full_name = if data.key.is_empty() {
            data.variable_name.to_string()
        } else {
            format!("{}:{}", data.variable_name, data.key)
        };
        self.variables
            .set(RuleVariable::MatchedVar, "", data.value.clone());
        self.variables
            .add(RuleVariable::MatchedVars, full_name, data.value.clone());
        self.last_match = Some(data);
    }

    /// The most recently announced match, if any.
    pub fn last_match(&self) -> Option<&MatchData> {
        self.last_match.as_ref()
    }

    /// Record a matched rule for the audit sink.
    pub fn match_rule(&mut self, matched: MatchedRule) {
        self.matched_rules.push(matched);
    }

    /// All rules matched so far.
    pub fn matched_rules(&self) -> &[MatchedRule] {
        &self.matched_rules
    }

    /// Exclude a `(variable, key)` target from a specific rule's selection,
    /// as done by `ctl:ruleRemoveTargetById`.
    pub fn remove_rule_target_by_id(
        &mut self,
        rule_id: u64,
        variable: RuleVariable,
        key: impl Into<String>,
    ) {
        self.rule_remove_target_by_id
            .entry(rule_id)
            .or_default()
            .push(RuleTargetException {
                variable,
                key_str: key.into().to_lowercase(),
            });
    }

    /// The injected target removals for a rule.
    pub fn removed_targets(&self, rule_id: u64) -> &[RuleTargetException] {
        self.rule_remove_target_by_id
            .get(&rule_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Record an interruption; the first one wins.
    pub fn interrupt(&mut self, interruption: Interruption) {
        if self.interruption.is_none() {
            self.interruption = Some(interruption);
        }
    }

    /// The recorded interruption, if any.
    pub fn interruption(&self) -> Option<&Interruption> {
        self.interruption.as_ref()
    }

    /// Ask the phase runner to jump past a marker.
    pub fn set_skip_after(&mut self, marker: &str) {
        self.skip_after = Some(marker.to_string());
    }

    /// The pending skip-after marker, if any.
    pub fn skip_after(&self) -> Option<&str> {
        self.skip_after.as_deref()
    }

    /// Merge collections produced by a body processor into the store.
    pub fn import_collections(&mut self, collections: CollectionsMap) {
        for (variable, data) in collections {
            for (key, values) in data {
                for value in values {
                    self.variables.add(variable, key.as_str(), value);
                }
            }
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("matched_rules", &self.matched_rules.len())
            .field("has_interruption", &self.interruption.is_some())
            .finish()
    }
}
