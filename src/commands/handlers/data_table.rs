//! Table commands

use crate::commands::{resolve_index, Command, TextList};
use crate::engine::Session;
use crate::error::{BotflowError, ErrorCode};
use crate::resolver;
use crate::variables::{DataTable, VariableValue};
use async_trait::async_trait;
use serde::Deserialize;

fn table_of<'a>(session: &'a Session, name: &str, command: &str) -> anyhow::Result<&'a DataTable> {
    let variable = resolver::require(name, session)?;
    match &variable.value {
        VariableValue::Table(table) => Ok(table),
        other => Err(BotflowError::domain_with_code(
            ErrorCode::DOMAIN_UNSUPPORTED_TYPE,
            format!("'{}' holds {} rather than a DataTable", variable.name, other.type_name()),
            Some(command.to_string()),
        )
        .into()),
    }
}

/// Create an empty table
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDataTableCommand {
    pub columns: TextList,
    pub output: String,
}

#[async_trait]
impl Command for CreateDataTableCommand {
    fn name(&self) -> &str {
        "create_data_table"
    }

    fn display_value(&self) -> String {
        format!("Create Table '{}' With Columns [{}]", self.output, self.columns)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let columns = self.columns.resolve(session)?;
        session.store(VariableValue::Table(DataTable::new(columns)), &self.output)?;
        Ok(())
    }
}

/// Append a row to an existing table
#[derive(Debug, Clone, Deserialize)]
pub struct AddDataRowCommand {
    pub table: String,
    pub values: TextList,
}

#[async_trait]
impl Command for AddDataRowCommand {
    fn name(&self) -> &str {
        "add_data_row"
    }

    fn display_value(&self) -> String {
        format!("Add Row [{}] to '{}'", self.values, self.table)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let values = self.values.resolve(session)?;
        table_of(session, &self.table, self.name())?;
        if let Some(VariableValue::Table(table)) =
            resolver::lookup_mut(&self.table, session).map(|v| &mut v.value)
        {
            table.add_row(values)?;
        }
        Ok(())
    }
}

/// Copy one row of a table into a row variable
#[derive(Debug, Clone, Deserialize)]
pub struct GetDataRowCommand {
    pub table: String,
    pub index: String,
    pub output: String,
}

#[async_trait]
impl Command for GetDataRowCommand {
    fn name(&self) -> &str {
        "get_data_row"
    }

    fn display_value(&self) -> String {
        format!("Get Row {} of '{}' into '{}'", self.index, self.table, self.output)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let index = resolve_index(session, &self.index, "Row index")?;
        let row = table_of(session, &self.table, self.name())?.row(index)?;
        session.store(VariableValue::Row(row), &self.output)?;
        Ok(())
    }
}

/// Store the row count of a table
#[derive(Debug, Clone, Deserialize)]
pub struct GetDataRowCountCommand {
    pub table: String,
    pub output: String,
}

#[async_trait]
impl Command for GetDataRowCountCommand {
    fn name(&self) -> &str {
        "get_data_row_count"
    }

    fn display_value(&self) -> String {
        format!("Count Rows of '{}' into '{}'", self.table, self.output)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let count = table_of(session, &self.table, self.name())?.len();
        session.store(VariableValue::Text(count.to_string()), &self.output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::error::kind_of;

    async fn people(session: &mut Session) {
        CreateDataTableCommand {
            columns: TextList::One("Name,City".into()),
            output: "{vPeople}".into(),
        }
        .run(session)
        .await
        .unwrap();
        for values in [["Ada", "London"], ["Grace", "Arlington"]] {
            AddDataRowCommand {
                table: "{vPeople}".into(),
                values: TextList::Many(values.iter().map(|s| s.to_string()).collect()),
            }
            .run(session)
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_build_table_and_count() {
        let mut session = Session::new(EngineSettings::default());
        people(&mut session).await;
        GetDataRowCountCommand {
            table: "vPeople".into(),
            output: "{vCount}".into(),
        }
        .run(&mut session)
        .await
        .unwrap();
        assert_eq!(session.resolve("{vCount}").unwrap(), "2");
    }

    #[tokio::test]
    async fn test_get_data_row() {
        let mut session = Session::new(EngineSettings::default());
        people(&mut session).await;
        GetDataRowCommand {
            table: "{vPeople}".into(),
            index: "1".into(),
            output: "{vRow}".into(),
        }
        .run(&mut session)
        .await
        .unwrap();
        assert_eq!(session.resolve("{vRow.City}").unwrap(), "Arlington");
        assert_eq!(session.resolve("{vRow.0}").unwrap(), "Grace");
    }

    #[tokio::test]
    async fn test_get_data_row_out_of_range() {
        let mut session = Session::new(EngineSettings::default());
        people(&mut session).await;
        let err = GetDataRowCommand {
            table: "{vPeople}".into(),
            index: "7".into(),
            output: "{vRow}".into(),
        }
        .run(&mut session)
        .await
        .unwrap_err();
        assert_eq!(kind_of(&err), "RangeError");
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let mut session = Session::new(EngineSettings::default());
        session.variables.set("vText", "hello".into());
        let err = GetDataRowCountCommand {
            table: "{vText}".into(),
            output: "{vCount}".into(),
        }
        .run(&mut session)
        .await
        .unwrap_err();
        assert_eq!(kind_of(&err), "DomainError");
    }
}
