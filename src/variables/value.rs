//! Variable payloads: plain text, lists, dictionaries and tabular data

use crate::error::{BotflowError, ErrorCode, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A table with named columns and text cells
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row. Short rows are padded with empty cells; long rows are rejected.
    pub fn add_row(&mut self, mut values: Vec<String>) -> Result<()> {
        if values.len() > self.columns.len() {
            return Err(BotflowError::domain(format!(
                "Row has {} values but the table only has {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        values.resize(self.columns.len(), String::new());
        self.rows.push(values);
        Ok(())
    }

    /// Position of a column selected by zero-based index or by name
    pub fn column_index(&self, selector: &str) -> Result<usize> {
        column_position(&self.columns, selector)
    }

    pub fn row(&self, index: usize) -> Result<DataRow> {
        let values = self.rows.get(index).ok_or_else(|| {
            BotflowError::range(index, self.rows.len(), "Table row index is out of range")
        })?;
        Ok(DataRow {
            columns: self.columns.clone(),
            values: values.clone(),
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = DataRow> + '_ {
        self.rows.iter().map(|values| DataRow {
            columns: self.columns.clone(),
            values: values.clone(),
        })
    }
}

/// A single table row that remembers its column names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRow {
    pub columns: Vec<String>,
    pub values: Vec<String>,
}

impl DataRow {
    /// Cell selected by zero-based column index or column name
    pub fn get(&self, selector: &str) -> Result<String> {
        let index = column_position(&self.columns, selector)?;
        Ok(self.values.get(index).cloned().unwrap_or_default())
    }

    /// Column-name keyed object used when a row is displayed
    pub fn to_display_json(&self) -> Value {
        let mut object = Map::new();
        for (index, column) in self.columns.iter().enumerate() {
            let cell = self.values.get(index).cloned().unwrap_or_default();
            object.insert(column.clone(), Value::String(cell));
        }
        Value::Object(object)
    }
}

fn column_position(columns: &[String], selector: &str) -> Result<usize> {
    if let Ok(index) = selector.trim().parse::<usize>() {
        return if index < columns.len() {
            Ok(index)
        } else {
            Err(BotflowError::range(
                index,
                columns.len(),
                "Column index is out of range",
            ))
        };
    }
    columns
        .iter()
        .position(|column| column == selector)
        .ok_or_else(|| {
            BotflowError::lookup_with_code(
                ErrorCode::LOOKUP_COLUMN,
                selector,
                "Column does not exist",
            )
        })
}

/// The value held by a variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum VariableValue {
    Text(String),
    List(Vec<VariableValue>),
    Dictionary(BTreeMap<String, String>),
    Table(DataTable),
    Row(DataRow),
}

impl Default for VariableValue {
    fn default() -> Self {
        VariableValue::Text(String::new())
    }
}

impl VariableValue {
    pub fn text(value: impl Into<String>) -> Self {
        VariableValue::Text(value.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        VariableValue::List(items.into_iter().map(|s| VariableValue::Text(s.into())).collect())
    }

    /// Build a value from JSON.
    ///
    /// Objects with a `columns` array plus `rows` or `values` become tables
    /// or rows, other objects become dictionaries, arrays become lists and
    /// scalars become their text rendering.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => VariableValue::Text(String::new()),
            Value::String(s) => VariableValue::Text(s),
            Value::Bool(_) | Value::Number(_) => VariableValue::Text(value.to_string()),
            Value::Array(items) => {
                VariableValue::List(items.into_iter().map(VariableValue::from_json).collect())
            }
            Value::Object(map) => {
                if let Some(table) = tabular_from_json(&map) {
                    return table;
                }
                VariableValue::Dictionary(
                    map.into_iter()
                        .map(|(key, value)| (key, json_to_text(&value)))
                        .collect(),
                )
            }
        }
    }

    /// Structural JSON form, inverse of [`VariableValue::from_json`]
    pub fn to_json(&self) -> Value {
        match self {
            VariableValue::Text(s) => Value::String(s.clone()),
            VariableValue::List(items) => {
                Value::Array(items.iter().map(VariableValue::to_json).collect())
            }
            VariableValue::Dictionary(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            VariableValue::Table(table) => serde_json::json!({
                "columns": table.columns,
                "rows": table.rows,
            }),
            VariableValue::Row(row) => serde_json::json!({
                "columns": row.columns,
                "values": row.values,
            }),
        }
    }

    /// JSON used when a composite value is displayed as text
    pub fn to_display_json(&self) -> Value {
        match self {
            VariableValue::Row(row) => row.to_display_json(),
            VariableValue::Table(table) => {
                Value::Array(table.rows().map(|row| row.to_display_json()).collect())
            }
            VariableValue::List(items) => {
                Value::Array(items.iter().map(VariableValue::to_display_json).collect())
            }
            other => other.to_json(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            VariableValue::Text(_) => "Text",
            VariableValue::List(_) => "List",
            VariableValue::Dictionary(_) => "Dictionary",
            VariableValue::Table(_) => "DataTable",
            VariableValue::Row(_) => "DataRow",
        }
    }

    /// Number of items, rows, entries or characters
    pub fn len(&self) -> usize {
        match self {
            VariableValue::Text(s) => s.chars().count(),
            VariableValue::List(items) => items.len(),
            VariableValue::Dictionary(map) => map.len(),
            VariableValue::Table(table) => table.len(),
            VariableValue::Row(row) => row.values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render this value, selecting the item at `cursor` for lists and tables
    pub fn display(&self, cursor: usize) -> Result<String> {
        match self {
            VariableValue::Text(s) => Ok(s.clone()),
            VariableValue::List(items) => items
                .get(cursor)
                .ok_or_else(|| {
                    BotflowError::range(cursor, items.len(), "List cursor is out of range")
                })?
                .display(0),
            VariableValue::Table(table) => Ok(table.row(cursor)?.to_display_json().to_string()),
            VariableValue::Row(row) => Ok(row.to_display_json().to_string()),
            VariableValue::Dictionary(_) => Ok(self.to_json().to_string()),
        }
    }
}

fn tabular_from_json(map: &Map<String, Value>) -> Option<VariableValue> {
    let columns: Vec<String> = map
        .get("columns")?
        .as_array()?
        .iter()
        .map(json_to_text)
        .collect();
    if let Some(values) = map.get("values").and_then(Value::as_array) {
        return Some(VariableValue::Row(DataRow {
            columns,
            values: values.iter().map(json_to_text).collect(),
        }));
    }
    let rows = match map.get("rows") {
        Some(Value::Array(rows)) => rows
            .iter()
            .map(|row| match row {
                Value::Array(cells) => cells.iter().map(json_to_text).collect(),
                Value::Object(cells) => columns
                    .iter()
                    .map(|c| cells.get(c).map(json_to_text).unwrap_or_default())
                    .collect(),
                other => vec![json_to_text(other)],
            })
            .collect(),
        None => Vec::new(),
        Some(_) => return None,
    };
    Some(VariableValue::Table(DataTable { columns, rows }))
}

/// Text rendering of a JSON node: strings unquoted, everything else compact JSON
pub fn json_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl From<Value> for VariableValue {
    fn from(value: Value) -> Self {
        VariableValue::from_json(value)
    }
}

impl From<VariableValue> for Value {
    fn from(value: VariableValue) -> Self {
        value.to_json()
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Text(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> DataTable {
        DataTable {
            columns: vec!["Name".into(), "Age".into()],
            rows: vec![
                vec!["Ada".into(), "36".into()],
                vec!["Alan".into(), "41".into()],
            ],
        }
    }

    #[test]
    fn test_from_json_shapes() {
        assert_eq!(VariableValue::from_json(json!("hi")), VariableValue::text("hi"));
        assert_eq!(VariableValue::from_json(json!(42)), VariableValue::text("42"));
        assert_eq!(
            VariableValue::from_json(json!(["a", "b"])),
            VariableValue::list(["a", "b"])
        );
        assert!(matches!(
            VariableValue::from_json(json!({"k": "v"})),
            VariableValue::Dictionary(_)
        ));
        assert!(matches!(
            VariableValue::from_json(json!({"columns": ["A"], "rows": [["1"]]})),
            VariableValue::Table(_)
        ));
        assert!(matches!(
            VariableValue::from_json(json!({"columns": ["A"], "values": ["1"]})),
            VariableValue::Row(_)
        ));
    }

    #[test]
    fn test_table_rows_from_objects() {
        let value = VariableValue::from_json(json!({
            "columns": ["Name", "Age"],
            "rows": [{"Name": "Ada", "Age": 36}]
        }));
        let VariableValue::Table(table) = value else {
            panic!("expected table");
        };
        assert_eq!(table.rows[0], vec!["Ada".to_string(), "36".to_string()]);
    }

    #[test]
    fn test_display_list_cursor() {
        let list = VariableValue::list(["a", "b", "c"]);
        assert_eq!(list.display(1).unwrap(), "b");
        let err = list.display(3).unwrap_err();
        assert_eq!(err.kind_name(), "RangeError");
    }

    #[test]
    fn test_display_table_renders_cursor_row() {
        let table = VariableValue::Table(people());
        assert_eq!(table.display(1).unwrap(), r#"{"Name":"Alan","Age":"41"}"#);
        assert!(table.display(2).is_err());
    }

    #[test]
    fn test_row_cell_by_index_and_name() {
        let row = people().row(0).unwrap();
        assert_eq!(row.get("Name").unwrap(), "Ada");
        assert_eq!(row.get("1").unwrap(), "36");
        assert_eq!(row.get("Email").unwrap_err().kind_name(), "LookupError");
        assert_eq!(row.get("5").unwrap_err().kind_name(), "RangeError");
    }

    #[test]
    fn test_add_row_pads_and_rejects() {
        let mut table = DataTable::new(vec!["A".into(), "B".into()]);
        table.add_row(vec!["1".into()]).unwrap();
        assert_eq!(table.rows[0], vec!["1".to_string(), String::new()]);
        assert!(table
            .add_row(vec!["1".into(), "2".into(), "3".into()])
            .is_err());
    }

    #[test]
    fn test_serde_uses_json_shape() {
        let value: VariableValue = serde_json::from_str(r#"["x", 1]"#).unwrap();
        assert_eq!(value, VariableValue::list(["x", "1"]));
        let back = serde_json::to_string(&value).unwrap();
        assert_eq!(back, r#"["x","1"]"#);
    }
}
