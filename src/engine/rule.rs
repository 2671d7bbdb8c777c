//! Rules and the rule evaluation pipeline.

use std::borrow::Cow;
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use super::phase::Phase;
use super::transaction::{MatchData, MatchedRule, Transaction};
use crate::actions::{ActionBinding, ActionKind, RuleAction};
use crate::error::{Error, Result};
use crate::operators::Operator;
use crate::transformations::Transformation;
use crate::variables::RuleVariable;

/// Rule severity, syslog ordering (0 = emergency, 7 = debug).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Severity 0.
    #[default]
    Emergency,
    /// Severity 1.
    Alert,
    /// Severity 2.
    Critical,
    /// Severity 3.
    Error,
    /// Severity 4.
    Warning,
    /// Severity 5.
    Notice,
    /// Severity 6.
    Info,
    /// Severity 7.
    Debug,
}

impl Severity {
    /// The severity's dialect name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Alert => "alert",
            Self::Critical => "critical",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    /// Create from the numeric severity level.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::Emergency),
            1 => Some(Self::Alert),
            2 => Some(Self::Critical),
            3 => Some(Self::Error),
            4 => Some(Self::Warning),
            5 => Some(Self::Notice),
            6 => Some(Self::Info),
            7 => Some(Self::Debug),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A key selector handed to the rule builder by the compiler.
#[derive(Debug, Clone)]
pub enum SelectorKey {
    /// Literal key, matched case-insensitively.
    Text(String),
    /// Regex pattern over entry keys.
    Pattern(String),
}

/// A key exception filtering out otherwise-selected entries.
#[derive(Debug, Clone)]
pub struct VariableException {
    /// Literal key; empty matches every key. Ignored when a regex is set.
    pub key_str: String,
    /// Compiled key regex, if any.
    pub key_rx: Option<Arc<Regex>>,
}

impl VariableException {
    /// Whether the exception excludes an entry key.
    pub fn matches(&self, key: &str) -> bool {
        match &self.key_rx {
            Some(rx) => rx.is_match(key),
            None => self.key_str.is_empty() || self.key_str == key.to_lowercase(),
        }
    }
}

/// One variable slot of a rule.
#[derive(Debug, Clone)]
pub struct VariableSpec {
    /// The variable to select from.
    pub variable: RuleVariable,
    /// Literal key (lowercased); empty selects every key. For regex keys
    /// this holds the pattern text and is ignored for matching.
    pub key_str: String,
    /// Compiled key regex; takes precedence over `key_str`.
    pub key_rx: Option<Arc<Regex>>,
    /// Emit the count of selected entries instead of the entries.
    pub count: bool,
    /// Key exceptions from variable negations.
    pub exceptions: Vec<VariableException>,
}

impl VariableSpec {
    /// Whether the spec's key predicate accepts an entry key.
    pub fn selects(&self, key: &str) -> bool {
        match &self.key_rx {
            Some(rx) => rx.is_match(key),
            None => self.key_str.is_empty() || self.key_str == key.to_lowercase(),
        }
    }
}

/// The operator slot of a rule: predicate plus registration data.
#[derive(Clone)]
pub struct OperatorSpec {
    /// The predicate.
    pub operator: Arc<dyn Operator>,
    /// Function name as written in the rule (e.g. `@rx`, `!@rx`).
    pub function: String,
    /// Raw operator parameter.
    pub data: String,
    /// Whether the result is negated.
    pub negated: bool,
}

impl std::fmt::Debug for OperatorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorSpec")
            .field("function", &self.function)
            .field("data", &self.data)
            .field("negated", &self.negated)
            .finish()
    }
}

/// One step of the transformation pipeline.
#[derive(Clone)]
pub struct TransformationStep {
    /// The transformation's dialect name, used for logging.
    pub name: String,
    /// The transformation function.
    pub function: Arc<dyn Transformation>,
}

impl std::fmt::Debug for TransformationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformationStep")
            .field("name", &self.name)
            .finish()
    }
}

/// A declarative predicate over transaction state plus a list of actions.
///
/// Rules are built by the compiler through the builder methods, then frozen:
/// evaluation never mutates a rule, so compiled rules can be shared across
/// transactions.
#[derive(Clone)]
pub struct Rule {
    variables: Vec<VariableSpec>,
    // SecAction and SecMarker rules have no operator.
    operator: Option<OperatorSpec>,
    transformations: Vec<TransformationStep>,
    actions: Vec<ActionBinding>,
    /// The chained successor forming a conjunction, if any.
    pub chain: Option<Box<Rule>>,
    /// Id of the chain head when this rule is a chained child, else 0.
    pub parent_id: u64,
    /// Marker name when the rule is a SecMarker.
    pub sec_mark: String,
    /// Raw rule text.
    pub raw: String,
    /// File the rule was loaded from.
    pub file: String,
    /// Line of the file where the rule was found.
    pub line: usize,
    /// Rule unique identifier; 0 for chained children.
    pub id: u64,
    /// Rule tag list.
    pub tags: Vec<String>,
    /// Execution phase.
    pub phase: Phase,
    /// Message template, macro expanded when logged.
    pub msg: String,
    /// Revision value.
    pub rev: String,
    /// Maturity index.
    pub maturity: u8,
    /// Ruleset version.
    pub version: String,
    /// Accuracy index.
    pub accuracy: u8,
    /// Severity level.
    pub severity: Severity,
    /// Logdata template, macro expanded when logged.
    pub log_data: String,
    /// Whether a match is written to the audit log.
    pub log: bool,
    /// Feed every intermediate transformation result to the operator.
    pub multi_match: bool,
    /// Whether the rule carries a disruptive action.
    pub disruptive: bool,
}

impl Rule {
    /// Create an empty rule with dialect defaults.
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            operator: None,
            transformations: Vec::new(),
            actions: Vec::new(),
            chain: None,
            parent_id: 0,
            sec_mark: String::new(),
            raw: String::new(),
            file: String::new(),
            line: 0,
            id: 0,
            tags: Vec::new(),
            phase: Phase::default(),
            msg: String::new(),
            rev: String::new(),
            maturity: 0,
            version: String::new(),
            accuracy: 0,
            severity: Severity::default(),
            log_data: String::new(),
            log: false,
            multi_match: false,
            disruptive: false,
        }
    }

    /// The rule's variable slots.
    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    /// The rule's operator slot, absent for SecAction/SecMarker.
    pub fn operator(&self) -> Option<&OperatorSpec> {
        self.operator.as_ref()
    }

    /// The rule's transformation pipeline.
    pub fn transformations(&self) -> &[TransformationStep] {
        &self.transformations
    }

    /// The rule's bound actions.
    pub fn actions(&self) -> &[ActionBinding] {
        &self.actions
    }

    /// Append an initialized action.
    pub fn add_action(&mut self, name: impl Into<String>, action: Arc<dyn RuleAction>) {
        self.actions.push(ActionBinding {
            name: name.into(),
            action,
        });
    }

    /// Append a variable slot. Literal keys are lowercased; a `None` key
    /// selects every entry of the variable.
    pub fn add_variable(
        &mut self,
        variable: RuleVariable,
        key: Option<SelectorKey>,
        is_count: bool,
    ) -> Result<()> {
        let (key_str, key_rx) = match key {
            None => (String::new(), None),
            Some(SelectorKey::Text(text)) => (text.to_lowercase(), None),
            Some(SelectorKey::Pattern(pattern)) => {
                let rx = Regex::new(&pattern).map_err(|e| Error::InvalidKey {
                    key: pattern.clone(),
                    message: e.to_string(),
                })?;
                (pattern, Some(Arc::new(rx)))
            }
        };
        self.variables.push(VariableSpec {
            variable,
            key_str,
            key_rx,
            count: is_count,
            exceptions: Vec::new(),
        });
        Ok(())
    }

    /// Append a key exception to every slot of the given variable.
    pub fn add_variable_negation(
        &mut self,
        variable: RuleVariable,
        key: SelectorKey,
    ) -> Result<()> {
        let (key_str, key_rx) = match key {
            SelectorKey::Text(text) => {
                if text.is_empty() {
                    return Err(Error::EmptyKey);
                }
                (text.to_lowercase(), None)
            }
            SelectorKey::Pattern(pattern) => {
                if pattern.is_empty() {
                    return Err(Error::EmptyKey);
                }
                let rx = Regex::new(&pattern).map_err(|e| Error::InvalidKey {
                    key: pattern.clone(),
                    message: e.to_string(),
                })?;
                (pattern, Some(Arc::new(rx)))
            }
        };
        let mut count = 0;
        for spec in &mut self.variables {
            if spec.variable == variable {
                spec.exceptions.push(VariableException {
                    key_str: key_str.clone(),
                    key_rx: key_rx.clone(),
                });
                count += 1;
            }
        }
        if count == 0 {
            return Err(Error::NoSuchVariable {
                name: variable.name(),
            });
        }
        Ok(())
    }

    /// Append a transformation step.
    pub fn add_transformation(
        &mut self,
        name: impl Into<String>,
        function: Arc<dyn Transformation>,
    ) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidTransformation { name });
        }
        self.transformations.push(TransformationStep { name, function });
        Ok(())
    }

    /// Empty the transformation pipeline, as the `none` transformation does.
    pub fn clear_transformations(&mut self) {
        self.transformations.clear();
    }

    /// Install the operator. The negation flag is derived from the function
    /// name (`!@rx` negates).
    pub fn set_operator(&mut self, operator: Arc<dyn Operator>, function: &str, params: &str) {
        self.operator = Some(OperatorSpec {
            operator,
            function: function.to_string(),
            data: params.to_string(),
            negated: function.starts_with('!'),
        });
    }

    /// Evaluate the rule against a transaction.
    ///
    /// Returns the matched variables, keys and values; an empty list means no
    /// match. Non-disruptive actions run as soon as this rule matches; on a
    /// chain head, disruptive and flow actions (and the audit record) wait
    /// for the whole chain to hold.
    pub fn evaluate(&self, tx: &mut Transaction) -> Vec<MatchData> {
        let rid = if self.id == 0 { self.parent_id } else { self.id };
        debug!(
            txid = %tx.id,
            rule = rid,
            raw = %self.raw,
            event = "EVALUATE_RULE",
            "evaluating rule",
        );

        let rule_data = [
            ("id", rid.to_string()),
            ("msg", self.msg.clone()),
            ("rev", self.rev.clone()),
            ("logdata", tx.macro_expand(&self.log_data)),
            ("severity", self.severity.name().to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), vec![v]))
        .collect();
        tx.variables_mut().set_data(RuleVariable::Rule, rule_data);

        let mut matched = Vec::new();
        match &self.operator {
            // SecMarker and SecAction always match, once.
            None => {
                debug!(
                    txid = %tx.id,
                    rule = self.id,
                    event = "RULE_FORCE_MATCH",
                    "forcing rule match",
                );
                matched.push(MatchData::synthetic());
            }
            Some(op) => {
                let ecol = tx.removed_targets(self.id).to_vec();
                for v in &self.variables {
                    // Runtime target removals extend the exception list on a
                    // per-evaluation copy; the compiled rule stays untouched.
                    let spec = if ecol.iter().any(|c| c.variable == v.variable) {
                        let mut local = v.clone();
                        for c in &ecol {
                            if c.variable == v.variable {
                                local.exceptions.push(VariableException {
                                    key_str: c.key_str.clone(),
                                    key_rx: None,
                                });
                            }
                        }
                        Cow::Owned(local)
                    } else {
                        Cow::Borrowed(v)
                    };

                    let values = tx.get_field(&spec);
                    if values.is_empty() {
                        continue;
                    }
                    for arg in values {
                        let args = if self.multi_match {
                            self.execute_transformations_multimatch(&arg.value)
                        } else {
                            vec![self.execute_transformations(&arg.value)]
                        };
                        for carg in args {
                            let result = op.operator.evaluate(tx, &carg);
                            let is_match = result != op.negated;
                            debug!(
                                txid = %tx.id,
                                rule = rid,
                                event = "EVALUATE_RULE_OPERATOR",
                                operator = %op.function,
                                data = %carg,
                                variable = v.variable.name(),
                                key = %arg.key,
                                value = %carg,
                                result = is_match,
                                "evaluated rule operator",
                            );
                            if is_match {
                                matched.push(MatchData {
                                    variable: arg.variable,
                                    variable_name: v.variable.name(),
                                    key: arg.key.clone(),
                                    value: carg,
                                });
                            }
                        }
                    }
                }
            }
        }

        if matched.is_empty() {
            return matched;
        }

        // The match must be announced before the chain runs so chained rules
        // can observe MATCHED_VAR.
        tx.match_variable(matched[0].clone());

        // Non-disruptive actions run on every matching rule, even when the
        // chain later fails: they record evidence chained rules build on.
        for binding in &self.actions {
            if binding.action.kind() == ActionKind::NonDisruptive {
                binding.action.evaluate(self, tx);
            }
        }

        let mut next = self.chain.as_deref();
        while let Some(nr) = next {
            let m = nr.evaluate(tx);
            if m.is_empty() {
                // One broken link fails the whole conjunction.
                return Vec::new();
            }
            matched.extend(m);
            next = nr.chain.as_deref();
        }

        if self.parent_id == 0 {
            if self.log {
                tx.match_rule(MatchedRule {
                    rule: self.clone(),
                    match_data: matched[0].clone(),
                    message: tx.macro_expand(&self.msg),
                    data: tx.macro_expand(&self.log_data),
                    uri: tx
                        .variables()
                        .first(RuleVariable::RequestUri, "")
                        .unwrap_or_default()
                        .to_string(),
                    transaction_id: tx.id.clone(),
                    disruptive: self.disruptive,
                    server_ip: tx
                        .variables()
                        .first(RuleVariable::ServerAddr, "")
                        .unwrap_or_default()
                        .to_string(),
                    client_ip: tx
                        .variables()
                        .first(RuleVariable::RemoteAddr, "")
                        .unwrap_or_default()
                        .to_string(),
                });
            }
            // Disruptive and flow actions wait for the full conjunction,
            // otherwise they would fire without their chains.
            for binding in &self.actions {
                let kind = binding.action.kind();
                if kind == ActionKind::Disruptive || kind == ActionKind::Flow {
                    binding.action.evaluate(self, tx);
                }
            }
        }

        debug!(
            txid = %tx.id,
            rule = rid,
            matched_values = matched.len(),
            event = "FINISH_RULE",
            "finished evaluating rule",
        );
        matched
    }

    fn execute_transformations(&self, value: &str) -> String {
        let mut value = value.to_string();
        for step in &self.transformations {
            value = step.function.transform(&value).into_owned();
        }
        value
    }

    fn execute_transformations_multimatch(&self, value: &str) -> Vec<String> {
        let mut out = Vec::with_capacity(self.transformations.len() + 1);
        let mut value = value.to_string();
        out.push(value.clone());
        for step in &self.transformations {
            value = step.function.transform(&value).into_owned();
            out.push(value.clone());
        }
        out
    }
}

impl Default for Rule {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("parent_id", &self.parent_id)
            .field("phase", &self.phase)
            .field("variables", &self.variables)
            .field("operator", &self.operator)
            .field("chained", &self.chain.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Deny, Log, SetVar};
    use crate::engine::InterruptionKind;
    use crate::operators::{Rx, Streq};
    use crate::transformations::{Lowercase, Trim};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test operator counting how often it is invoked.
    struct Counting {
        calls: AtomicUsize,
        accept: String,
    }

    impl Counting {
        fn new(accept: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                accept: accept.to_string(),
            })
        }
    }

    impl Operator for Counting {
        fn evaluate(&self, _tx: &Transaction, value: &str) -> bool {
            self.calls.fetch_add(1, Ordering::Relaxed);
            value == self.accept
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn add_setvar(rule: &mut Rule, param: &str) {
        let mut action = SetVar::new();
        action.init(rule, param).unwrap();
        rule.add_action("setvar", Arc::new(action));
    }

    fn add_log(rule: &mut Rule) {
        let mut action = Log;
        action.init(rule, "").unwrap();
        rule.add_action("log", Arc::new(action));
    }

    fn add_deny(rule: &mut Rule) {
        let mut action = Deny::new();
        action.init(rule, "").unwrap();
        rule.add_action("deny", Arc::new(action));
    }

    fn args_rule(id: u64, pattern: &str) -> Rule {
        let mut rule = Rule::new();
        rule.id = id;
        rule.add_variable(RuleVariable::Args, None, false).unwrap();
        rule.set_operator(Arc::new(Rx::new(pattern).unwrap()), "@rx", pattern);
        rule
    }

    #[test]
    fn test_sec_action_forced_match() {
        let mut rule = Rule::new();
        rule.id = 1;
        rule.msg = "hello %{tx.who}".to_string();
        add_log(&mut rule);
        add_setvar(&mut rule, "tx.counter=1");

        let mut tx = Transaction::new("t1");
        tx.variables_mut().set(RuleVariable::Tx, "who", "world");

        let matches = rule.evaluate(&mut tx);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].key, "");
        assert_eq!(matches[0].value, "");

        assert_eq!(tx.variables().first(RuleVariable::Tx, "counter"), Some("1"));
        assert_eq!(tx.matched_rules().len(), 1);
        assert_eq!(tx.matched_rules()[0].message, "hello world");
    }

    #[test]
    fn test_simple_match() {
        let mut rule = args_rule(2, "^attack$");
        add_log(&mut rule);

        let mut tx = Transaction::new("t1");
        tx.variables_mut().add(RuleVariable::Args, "q", "attack");
        tx.variables_mut().set(RuleVariable::RequestUri, "", "/search?q=attack");

        let matches = rule.evaluate(&mut tx);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].variable, RuleVariable::Args);
        assert_eq!(matches[0].key, "q");
        assert_eq!(matches[0].value, "attack");

        assert_eq!(tx.matched_rules().len(), 1);
        assert_eq!(tx.matched_rules()[0].uri, "/search?q=attack");
        assert_eq!(tx.matched_rules()[0].match_data.key, "q");
    }

    #[test]
    fn test_negated_operator_prevents_match() {
        let mut rule = Rule::new();
        rule.id = 3;
        rule.add_variable(RuleVariable::Args, None, false).unwrap();
        rule.set_operator(Arc::new(Rx::new("^attack$").unwrap()), "!@rx", "^attack$");
        assert!(rule.operator().unwrap().negated);

        let mut tx = Transaction::new("t1");
        tx.variables_mut().add(RuleVariable::Args, "q", "attack");
        assert!(rule.evaluate(&mut tx).is_empty());
    }

    #[test]
    fn test_negated_operator_matches_on_miss() {
        let mut rule = Rule::new();
        rule.id = 3;
        rule.add_variable(RuleVariable::Args, None, false).unwrap();
        rule.set_operator(Arc::new(Rx::new("^attack$").unwrap()), "!@rx", "^attack$");

        let mut tx = Transaction::new("t1");
        tx.variables_mut().add(RuleVariable::Args, "q", "harmless");
        assert_eq!(rule.evaluate(&mut tx).len(), 1);
    }

    #[test]
    fn test_multi_match_candidates() {
        let mut rule = Rule::new();
        rule.id = 4;
        rule.multi_match = true;
        rule.add_variable(RuleVariable::Args, None, false).unwrap();
        rule.add_transformation("lowercase", Arc::new(Lowercase)).unwrap();
        rule.add_transformation("trim", Arc::new(Trim)).unwrap();
        let op = Counting::new("attack");
        rule.set_operator(op.clone(), "@streq", "attack");

        let mut tx = Transaction::new("t1");
        tx.variables_mut().add(RuleVariable::Args, "q", " ATTACK ");

        let matches = rule.evaluate(&mut tx);
        // |transformations| + 1 candidates, one of which matches.
        assert_eq!(op.calls.load(Ordering::Relaxed), 3);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value, "attack");
    }

    #[test]
    fn test_single_match_composes_transformations() {
        let mut rule = Rule::new();
        rule.id = 4;
        rule.add_variable(RuleVariable::Args, None, false).unwrap();
        rule.add_transformation("lowercase", Arc::new(Lowercase)).unwrap();
        rule.add_transformation("trim", Arc::new(Trim)).unwrap();
        let op = Counting::new("attack");
        rule.set_operator(op.clone(), "@streq", "attack");

        let mut tx = Transaction::new("t1");
        tx.variables_mut().add(RuleVariable::Args, "q", " ATTACK ");

        let matches = rule.evaluate(&mut tx);
        assert_eq!(op.calls.load(Ordering::Relaxed), 1);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_chain_success_fires_deny_once() {
        let mut child = args_rule(0, "admin");
        child.parent_id = 10;

        let mut head = args_rule(10, "login");
        add_log(&mut head);
        add_deny(&mut head);
        head.chain = Some(Box::new(child));

        let mut tx = Transaction::new("t1");
        tx.variables_mut().add(RuleVariable::Args, "q", "login admin");

        let matches = head.evaluate(&mut tx);
        assert_eq!(matches.len(), 2);

        let interruption = tx.interruption().unwrap();
        assert_eq!(interruption.kind, InterruptionKind::Deny);
        assert_eq!(interruption.rule_id, 10);
        assert_eq!(tx.matched_rules().len(), 1);
    }

    #[test]
    fn test_chain_failure_gates_head_effects() {
        let mut child = args_rule(0, "nowhere");
        child.parent_id = 10;

        let mut head = args_rule(10, "login");
        add_log(&mut head);
        add_deny(&mut head);
        add_setvar(&mut head, "tx.seen=yes");
        head.chain = Some(Box::new(child));

        let mut tx = Transaction::new("t1");
        tx.variables_mut().add(RuleVariable::Args, "q", "login");

        let matches = head.evaluate(&mut tx);
        assert!(matches.is_empty());
        assert!(tx.interruption().is_none());
        assert!(tx.matched_rules().is_empty());
        // Non-disruptive evidence still recorded on the partial match.
        assert_eq!(tx.variables().first(RuleVariable::Tx, "seen"), Some("yes"));
    }

    #[test]
    fn test_no_selection_no_actions() {
        let mut rule = args_rule(5, ".*");
        add_log(&mut rule);
        add_setvar(&mut rule, "tx.seen=yes");

        let mut tx = Transaction::new("t1");
        assert!(rule.evaluate(&mut tx).is_empty());
        assert!(tx.matched_rules().is_empty());
        assert_eq!(tx.variables().first(RuleVariable::Tx, "seen"), None);
    }

    #[test]
    fn test_removed_targets_do_not_leak_into_rule() {
        let rule = args_rule(6, ".+");

        let mut tx = Transaction::new("t1");
        tx.variables_mut().add(RuleVariable::Args, "q", "x");
        tx.variables_mut().add(RuleVariable::Args, "user", "y");
        tx.remove_rule_target_by_id(6, RuleVariable::Args, "q");

        for _ in 0..3 {
            let matches = rule.evaluate(&mut tx);
            assert_eq!(matches.len(), 1);
            assert_eq!(matches[0].key, "user");
        }
        assert!(rule.variables()[0].exceptions.is_empty());
    }

    #[test]
    fn test_rule_collection_populated() {
        let mut rule = Rule::new();
        rule.id = 42;
        rule.msg = "boom".to_string();
        rule.severity = Severity::Critical;
        rule.log_data = "score=%{tx.score}".to_string();

        let mut tx = Transaction::new("t1");
        tx.variables_mut().set(RuleVariable::Tx, "score", "8");
        rule.evaluate(&mut tx);

        assert_eq!(tx.variables().first(RuleVariable::Rule, "id"), Some("42"));
        assert_eq!(tx.variables().first(RuleVariable::Rule, "msg"), Some("boom"));
        assert_eq!(tx.variables().first(RuleVariable::Rule, "severity"), Some("critical"));
        assert_eq!(tx.variables().first(RuleVariable::Rule, "logdata"), Some("score=8"));
    }

    #[test]
    fn test_add_variable_round_trip() {
        let mut rule = Rule::new();
        rule.add_variable(
            RuleVariable::Args,
            Some(SelectorKey::Text("Q".to_string())),
            true,
        )
        .unwrap();

        let spec = rule.variables().last().unwrap();
        assert_eq!(spec.variable, RuleVariable::Args);
        assert_eq!(spec.key_str, "q");
        assert!(spec.key_rx.is_none());
        assert!(spec.count);
    }

    #[test]
    fn test_add_variable_bad_pattern() {
        let mut rule = Rule::new();
        let err = rule
            .add_variable(
                RuleVariable::Args,
                Some(SelectorKey::Pattern("(".to_string())),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }));
    }

    #[test]
    fn test_add_variable_negation() {
        let mut rule = Rule::new();
        rule.add_variable(RuleVariable::Args, None, false).unwrap();
        rule.add_variable_negation(RuleVariable::Args, SelectorKey::Text("Token".to_string()))
            .unwrap();
        assert_eq!(rule.variables()[0].exceptions.len(), 1);
        assert!(rule.variables()[0].exceptions[0].matches("token"));
        assert!(rule.variables()[0].exceptions[0].matches("TOKEN"));
        assert!(!rule.variables()[0].exceptions[0].matches("other"));
    }

    #[test]
    fn test_add_variable_negation_errors() {
        let mut rule = Rule::new();
        assert!(matches!(
            rule.add_variable_negation(RuleVariable::Args, SelectorKey::Text(String::new())),
            Err(Error::EmptyKey)
        ));
        assert!(matches!(
            rule.add_variable_negation(RuleVariable::Args, SelectorKey::Text("q".to_string())),
            Err(Error::NoSuchVariable { .. })
        ));
    }

    #[test]
    fn test_negation_excludes_entries() {
        let mut rule = args_rule(7, ".+");
        rule.add_variable_negation(RuleVariable::Args, SelectorKey::Text("secret".to_string()))
            .unwrap();

        let mut tx = Transaction::new("t1");
        tx.variables_mut().add(RuleVariable::Args, "secret", "x");
        tx.variables_mut().add(RuleVariable::Args, "open", "y");

        let matches = rule.evaluate(&mut tx);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].key, "open");
    }

    #[test]
    fn test_add_transformation_rejects_empty_name() {
        let mut rule = Rule::new();
        assert!(matches!(
            rule.add_transformation("", Arc::new(Trim)),
            Err(Error::InvalidTransformation { .. })
        ));
    }

    #[test]
    fn test_clear_transformations() {
        let mut rule = Rule::new();
        rule.add_transformation("trim", Arc::new(Trim)).unwrap();
        rule.clear_transformations();
        assert!(rule.transformations().is_empty());
    }

    #[test]
    fn test_count_variable_always_one_candidate() {
        let mut rule = Rule::new();
        rule.id = 8;
        rule.add_variable(RuleVariable::Args, None, true).unwrap();
        rule.set_operator(Arc::new(Streq::new("0").unwrap()), "@streq", "0");

        let mut tx = Transaction::new("t1");
        let matches = rule.evaluate(&mut tx);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value, "0");
    }

    #[test]
    fn test_chained_child_observes_setvar() {
        let mut child = Rule::new();
        child.parent_id = 11;
        child.add_variable(RuleVariable::Tx, Some(SelectorKey::Text("stage".into())), false)
            .unwrap();
        child.set_operator(Arc::new(Streq::new("one").unwrap()), "@streq", "one");

        let mut head = args_rule(11, "trigger");
        add_setvar(&mut head, "tx.stage=one");
        add_log(&mut head);
        head.chain = Some(Box::new(child));

        let mut tx = Transaction::new("t1");
        tx.variables_mut().add(RuleVariable::Args, "q", "trigger");

        let matches = head.evaluate(&mut tx);
        assert_eq!(matches.len(), 2);
        assert_eq!(tx.matched_rules().len(), 1);
    }
}
