//! List commands

use crate::commands::{resolve_index, Command};
use crate::engine::Session;
use crate::error::{BotflowError, ErrorCode};
use crate::resolver;
use crate::variables::VariableValue;
use async_trait::async_trait;
use serde::Deserialize;

fn not_a_list(name: &str, value: &VariableValue, command: &str) -> anyhow::Error {
    BotflowError::domain_with_code(
        ErrorCode::DOMAIN_UNSUPPORTED_TYPE,
        format!("'{}' holds {} rather than a List", name, value.type_name()),
        Some(command.to_string()),
    )
    .into()
}

/// Append an item, creating the list when the variable does not exist yet
#[derive(Debug, Clone, Deserialize)]
pub struct AddListItemCommand {
    pub list: String,
    pub item: String,
}

#[async_trait]
impl Command for AddListItemCommand {
    fn name(&self) -> &str {
        "add_list_item"
    }

    fn display_value(&self) -> String {
        format!("Add '{}' to List '{}'", self.item, self.list)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let item = VariableValue::Text(session.resolve(&self.item)?);
        let Some(variable) = resolver::lookup_mut(&self.list, session) else {
            session.store(VariableValue::List(vec![item]), &self.list)?;
            return Ok(());
        };
        if matches!(&variable.value, VariableValue::Text(text) if text.is_empty()) {
            variable.value = VariableValue::List(Vec::new());
        }
        match &mut variable.value {
            VariableValue::List(items) => {
                items.push(item);
                Ok(())
            }
            other => Err(not_a_list(&variable.name, other, self.name())),
        }
    }
}

/// Replace the item at `index`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateListItemCommand {
    pub list: String,
    pub index: String,
    pub item: String,
}

#[async_trait]
impl Command for UpdateListItemCommand {
    fn name(&self) -> &str {
        "update_list_item"
    }

    fn display_value(&self) -> String {
        format!("Set Item {} of '{}' to '{}'", self.index, self.list, self.item)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let index = resolve_index(session, &self.index, "Item index")?;
        let item = VariableValue::Text(session.resolve(&self.item)?);
        resolver::require(&self.list, session)?;
        let Some(variable) = resolver::lookup_mut(&self.list, session) else {
            return Ok(());
        };
        match &mut variable.value {
            VariableValue::List(items) => {
                let len = items.len();
                let slot = items.get_mut(index).ok_or_else(|| {
                    BotflowError::range(index, len, "List index is out of range")
                })?;
                *slot = item;
                Ok(())
            }
            other => Err(not_a_list(&variable.name, other, self.name())),
        }
    }
}

/// Store the number of items in a list
#[derive(Debug, Clone, Deserialize)]
pub struct GetListCountCommand {
    pub list: String,
    pub output: String,
}

#[async_trait]
impl Command for GetListCountCommand {
    fn name(&self) -> &str {
        "get_list_count"
    }

    fn display_value(&self) -> String {
        format!("Count Items of '{}' into '{}'", self.list, self.output)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let variable = resolver::require(&self.list, session)?;
        let count = match &variable.value {
            VariableValue::List(items) => items.len(),
            other => return Err(not_a_list(&variable.name, other, self.name())),
        };
        session.store(VariableValue::Text(count.to_string()), &self.output)?;
        Ok(())
    }
}
