//! Script variables
//!
//! A [`Variable`] pairs a name with a [`VariableValue`] and a cursor. The
//! cursor selects the "current" item of lists and the current row of tables,
//! so `{vList}` renders one item rather than the whole list.

use crate::error::{BotflowError, ErrorCode, Result};
use serde::{Deserialize, Serialize};

pub mod store;
pub mod value;

pub use store::VariableStore;
pub use value::{json_to_text, DataRow, DataTable, VariableValue};

/// Text shown in place of a secret variable's value in logs and snapshots
pub const MASKED_VALUE: &str = "********";

/// A named script variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub value: VariableValue,
    #[serde(skip)]
    pub cursor: usize,
    #[serde(default, alias = "secret")]
    pub is_secret: bool,
}

/// Named properties exposed by `{name.property}` access on non-tabular values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableProperty {
    Count,
    Index,
    Type,
    ToJson,
}

impl VariableProperty {
    const TABLE: &'static [(&'static str, VariableProperty)] = &[
        ("count", VariableProperty::Count),
        ("length", VariableProperty::Count),
        ("index", VariableProperty::Index),
        ("type", VariableProperty::Type),
        ("tojson", VariableProperty::ToJson),
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::TABLE
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, property)| *property)
    }
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            cursor: 0,
            is_secret: false,
        }
    }

    pub fn secret(name: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        Self {
            is_secret: true,
            ..Self::new(name, value)
        }
    }

    /// Text rendering at the current cursor
    pub fn display_value(&self) -> Result<String> {
        self.value.display(self.cursor)
    }

    /// Like [`Variable::display_value`] but masks secrets
    pub fn safe_display_value(&self) -> String {
        if self.is_secret {
            return MASKED_VALUE.to_string();
        }
        match self.display_value() {
            Ok(text) => text,
            Err(_) => self.value.to_display_json().to_string(),
        }
    }

    /// Value of a named property such as `count` or `type`
    pub fn display_property(&self, name: &str) -> Result<String> {
        let property = VariableProperty::from_name(name).ok_or_else(|| {
            BotflowError::lookup_with_code(
                ErrorCode::LOOKUP_PROPERTY,
                format!("{}.{}", self.name, name),
                format!("'{}' has no property '{}'", self.value.type_name(), name),
            )
        })?;
        Ok(match property {
            VariableProperty::Count => self.value.len().to_string(),
            VariableProperty::Index => self.cursor.to_string(),
            VariableProperty::Type => self.value.type_name().to_string(),
            VariableProperty::ToJson => self.value.to_display_json().to_string(),
        })
    }

    /// Resolve the `selector` part of `{name.selector}`.
    ///
    /// Tables select a column of the cursor row, rows select a column,
    /// dictionaries select a key and fall back to properties, everything
    /// else selects a property.
    pub fn field(&self, selector: &str) -> Result<String> {
        match &self.value {
            VariableValue::Table(table) => table.row(self.cursor)?.get(selector),
            VariableValue::Row(row) => row.get(selector),
            VariableValue::Dictionary(map) => match map.get(selector) {
                Some(value) => Ok(value.clone()),
                None => self.display_property(selector),
            },
            _ => self.display_property(selector),
        }
    }

    /// Run `f` with the cursor temporarily moved to `index`, restoring it afterwards
    pub fn with_cursor<T>(&mut self, index: usize, f: impl FnOnce(&Variable) -> T) -> T {
        let saved = std::mem::replace(&mut self.cursor, index);
        let result = f(self);
        self.cursor = saved;
        result
    }
}
