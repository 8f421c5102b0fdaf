//! Dictionary commands

use crate::commands::Command;
use crate::engine::Session;
use crate::error::{BotflowError, ErrorCode};
use crate::resolver;
use crate::variables::VariableValue;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Insert or replace a key, creating the dictionary when needed
#[derive(Debug, Clone, Deserialize)]
pub struct AddDictionaryItemCommand {
    pub dictionary: String,
    pub key: String,
    pub value: String,
}

#[async_trait]
impl Command for AddDictionaryItemCommand {
    fn name(&self) -> &str {
        "add_dictionary_item"
    }

    fn display_value(&self) -> String {
        format!("Add '{}' = '{}' to '{}'", self.key, self.value, self.dictionary)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let key = session.resolve(&self.key)?;
        let value = session.resolve(&self.value)?;
        let Some(variable) = resolver::lookup_mut(&self.dictionary, session) else {
            let map = BTreeMap::from([(key, value)]);
            session.store(VariableValue::Dictionary(map), &self.dictionary)?;
            return Ok(());
        };
        if matches!(&variable.value, VariableValue::Text(text) if text.is_empty()) {
            variable.value = VariableValue::Dictionary(BTreeMap::new());
        }
        match &mut variable.value {
            VariableValue::Dictionary(map) => {
                map.insert(key, value);
                Ok(())
            }
            other => Err(BotflowError::domain_with_code(
                ErrorCode::DOMAIN_UNSUPPORTED_TYPE,
                format!(
                    "'{}' holds {} rather than a Dictionary",
                    variable.name,
                    other.type_name()
                ),
                Some(self.name().to_string()),
            )
            .into()),
        }
    }
}

/// Store the value for `key`
#[derive(Debug, Clone, Deserialize)]
pub struct GetDictionaryValueCommand {
    pub dictionary: String,
    pub key: String,
    pub output: String,
}

#[async_trait]
impl Command for GetDictionaryValueCommand {
    fn name(&self) -> &str {
        "get_dictionary_value"
    }

    fn display_value(&self) -> String {
        format!(
            "Get '{}' from '{}' into '{}'",
            self.key, self.dictionary, self.output
        )
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let key = session.resolve(&self.key)?;
        let variable = resolver::require(&self.dictionary, session)?;
        let value = match &variable.value {
            VariableValue::Dictionary(map) => map.get(&key).cloned().ok_or_else(|| {
                BotflowError::lookup_with_code(
                    ErrorCode::LOOKUP_KEY,
                    key.clone(),
                    format!("Key not found in '{}'", variable.name),
                )
            })?,
            other => {
                return Err(BotflowError::domain_with_code(
                    ErrorCode::DOMAIN_UNSUPPORTED_TYPE,
                    format!(
                        "'{}' holds {} rather than a Dictionary",
                        variable.name,
                        other.type_name()
                    ),
                    Some(self.name().to_string()),
                )
                .into())
            }
        };
        session.store(VariableValue::Text(value), &self.output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::error::kind_of;

    #[tokio::test]
    async fn test_add_then_get() {
        let mut session = Session::new(EngineSettings::default());
        for (key, value) in [("host", "example.org"), ("port", "8080")] {
            AddDictionaryItemCommand {
                dictionary: "{vConfig}".into(),
                key: key.into(),
                value: value.into(),
            }
            .run(&mut session)
            .await
            .unwrap();
        }
        GetDictionaryValueCommand {
            dictionary: "{vConfig}".into(),
            key: "port".into(),
            output: "{vPort}".into(),
        }
        .run(&mut session)
        .await
        .unwrap();
        assert_eq!(session.resolve("{vPort}").unwrap(), "8080");
        assert_eq!(session.resolve("{vConfig.host}").unwrap(), "example.org");
    }

    #[tokio::test]
    async fn test_missing_key() {
        let mut session = Session::new(EngineSettings::default());
        session
            .variables
            .set("vConfig", VariableValue::Dictionary(BTreeMap::new()));
        let err = GetDictionaryValueCommand {
            dictionary: "{vConfig}".into(),
            key: "nope".into(),
            output: "{vOut}".into(),
        }
        .run(&mut session)
        .await
        .unwrap_err();
        assert_eq!(kind_of(&err), "LookupError");
    }
}
