//! Ordered, name-keyed variable collection owned by a session

use super::{Variable, VariableValue};
use crate::error::{BotflowError, ErrorCode, Result};
use serde_json::{Map, Value};

/// Variables in declaration order. Names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    variables: Vec<Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.iter_mut().find(|v| v.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.variables
            .iter()
            .position(|v| v.name == name || format!("{{{}}}", v.name) == name)
    }

    /// Insert or update a variable's value.
    ///
    /// An existing entry also matches when `name` is the braced form of its
    /// name. Updating keeps the secret flag and resets the cursor.
    pub fn set(&mut self, name: &str, value: VariableValue) {
        match self.position(name) {
            Some(index) => {
                let existing = &mut self.variables[index];
                existing.value = value;
                existing.cursor = 0;
            }
            None => self.variables.push(Variable::new(name, value)),
        }
    }

    /// Insert a full variable, replacing any entry with the same name
    pub fn insert(&mut self, variable: Variable) {
        match self.position(&variable.name) {
            Some(index) => self.variables[index] = variable,
            None => self.variables.push(variable),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        let index = self.position(name)?;
        Some(self.variables.remove(index))
    }

    pub fn set_cursor(&mut self, name: &str, index: usize) -> Result<()> {
        let variable = self.get_mut(name).ok_or_else(|| {
            BotflowError::lookup_with_code(ErrorCode::LOOKUP_VARIABLE, name, "Variable not found")
        })?;
        variable.cursor = index;
        Ok(())
    }

    /// Overwrite declared variables with same-named overrides.
    ///
    /// Overrides whose names are not declared are ignored.
    pub fn merge_overrides(&mut self, overrides: &[Variable]) -> usize {
        let mut applied = 0;
        for override_var in overrides {
            if let Some(existing) = self.get_mut(&override_var.name) {
                existing.value = override_var.value.clone();
                existing.cursor = override_var.cursor;
                existing.is_secret |= override_var.is_secret;
                applied += 1;
            }
        }
        applied
    }

    /// Name-to-text snapshot with secrets masked
    pub fn to_masked_json(&self) -> Value {
        let map: Map<String, Value> = self
            .variables
            .iter()
            .map(|v| (v.name.clone(), Value::String(v.safe_display_value())))
            .collect();
        Value::Object(map)
    }
}

impl From<Vec<Variable>> for VariableStore {
    fn from(variables: Vec<Variable>) -> Self {
        let mut store = VariableStore::new();
        for variable in variables {
            store.insert(variable);
        }
        store
    }
}

impl IntoIterator for VariableStore {
    type Item = Variable;
    type IntoIter = std::vec::IntoIter<Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_inserts_then_updates() {
        let mut store = VariableStore::new();
        store.set("vName", "first".into());
        store.set("vName", "second".into());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("vName").unwrap().display_value().unwrap(), "second");
    }

    #[test]
    fn test_set_tolerates_braced_name() {
        let mut store = VariableStore::from(vec![Variable::secret("vToken", "old")]);
        store.set("{vToken}", "new".into());
        assert_eq!(store.len(), 1);
        let token = store.get("vToken").unwrap();
        assert_eq!(token.display_value().unwrap(), "new");
        assert!(token.is_secret);
    }

    #[test]
    fn test_set_cursor_unknown_variable() {
        let mut store = VariableStore::new();
        let err = store.set_cursor("missing", 2).unwrap_err();
        assert_eq!(err.kind_name(), "LookupError");
    }

    #[test]
    fn test_merge_overrides_only_declared() {
        let mut store = VariableStore::from(vec![
            Variable::new("vA", "script-a"),
            Variable::new("vB", "script-b"),
        ]);
        let applied = store.merge_overrides(&[
            Variable::new("vB", "override-b"),
            Variable::new("vC", "ignored"),
        ]);
        assert_eq!(applied, 1);
        assert_eq!(store.get("vA").unwrap().display_value().unwrap(), "script-a");
        assert_eq!(store.get("vB").unwrap().display_value().unwrap(), "override-b");
        assert!(store.get("vC").is_none());
    }

    #[test]
    fn test_masked_snapshot() {
        let store = VariableStore::from(vec![
            Variable::new("vUser", "ada"),
            Variable::secret("vPass", "hunter2"),
        ]);
        let json = store.to_masked_json();
        assert_eq!(json["vUser"], "ada");
        assert_eq!(json["vPass"], "********");
    }
}
