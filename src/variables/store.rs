//! Keyed, multi-valued variable storage owned by a transaction.

use std::collections::HashMap;

use super::RuleVariable;

/// A collection of keyed, multi-valued entries for one variable.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    data: HashMap<String, Vec<String>>,
}

impl Collection {
    /// Create a new empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under a key.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.entry(key.into()).or_default().push(value.into());
    }

    /// Replace all values under a key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), vec![value.into()]);
    }

    /// Replace the whole collection content.
    pub fn set_data(&mut self, data: HashMap<String, Vec<String>>) {
        self.data = data;
    }

    /// Delete a key.
    pub fn remove(&mut self, key: &str) {
        self.data.remove(key);
    }

    /// Get all values under a key.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.data.get(key).map(|v| v.as_slice())
    }

    /// Get the first value under a key.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.first()).map(|s| s.as_str())
    }

    /// Iterate over all `(key, values)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total number of stored values.
    pub fn len(&self) -> usize {
        self.data.values().map(|v| v.len()).sum()
    }

    /// Whether the collection holds no values.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The store of all variable collections for one transaction.
///
/// Addressed by `(RuleVariable, key)`; each address holds a list of values.
#[derive(Debug, Default)]
pub struct VariableStore {
    collections: HashMap<RuleVariable, Collection>,
}

impl VariableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a variable's collection, if populated.
    pub fn collection(&self, variable: RuleVariable) -> Option<&Collection> {
        self.collections.get(&variable)
    }

    /// Get or create a variable's collection.
    pub fn collection_mut(&mut self, variable: RuleVariable) -> &mut Collection {
        self.collections.entry(variable).or_default()
    }

    /// Append a value at `(variable, key)`.
    pub fn add(&mut self, variable: RuleVariable, key: impl Into<String>, value: impl Into<String>) {
        self.collection_mut(variable).add(key, value);
    }

    /// Replace the values at `(variable, key)` with a single value.
    pub fn set(&mut self, variable: RuleVariable, key: impl Into<String>, value: impl Into<String>) {
        self.collection_mut(variable).set(key, value);
    }

    /// Replace a variable's whole collection.
    pub fn set_data(&mut self, variable: RuleVariable, data: HashMap<String, Vec<String>>) {
        self.collection_mut(variable).set_data(data);
    }

    /// Get the first value at `(variable, key)`.
    pub fn first(&self, variable: RuleVariable, key: &str) -> Option<&str> {
        self.collections.get(&variable).and_then(|c| c.first(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut store = VariableStore::new();
        store.add(RuleVariable::Args, "q", "attack");
        store.add(RuleVariable::Args, "q", "again");

        let col = store.collection(RuleVariable::Args).unwrap();
        assert_eq!(col.get("q"), Some(&["attack".to_string(), "again".to_string()][..]));
        assert_eq!(col.first("q"), Some("attack"));
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn test_set_replaces() {
        let mut store = VariableStore::new();
        store.add(RuleVariable::Tx, "score", "1");
        store.set(RuleVariable::Tx, "score", "5");
        assert_eq!(store.first(RuleVariable::Tx, "score"), Some("5"));
    }

    #[test]
    fn test_set_data_replaces_collection() {
        let mut store = VariableStore::new();
        store.add(RuleVariable::Rule, "stale", "x");

        let mut data = HashMap::new();
        data.insert("id".to_string(), vec!["42".to_string()]);
        store.set_data(RuleVariable::Rule, data);

        let col = store.collection(RuleVariable::Rule).unwrap();
        assert_eq!(col.first("id"), Some("42"));
        assert!(col.get("stale").is_none());
    }

    #[test]
    fn test_missing_collection() {
        let store = VariableStore::new();
        assert!(store.collection(RuleVariable::Files).is_none());
        assert_eq!(store.first(RuleVariable::Files, ""), None);
    }
}
