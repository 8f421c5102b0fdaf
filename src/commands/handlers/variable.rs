//! Variable assignment commands

use crate::commands::{resolve_index, Command};
use crate::engine::Session;
use crate::resolver;
use crate::variables::VariableValue;
use async_trait::async_trait;
use serde::Deserialize;

/// Resolve `input` and store the text into the `output` variable
#[derive(Debug, Clone, Deserialize)]
pub struct SetVariableCommand {
    pub input: String,
    pub output: String,
}

#[async_trait]
impl Command for SetVariableCommand {
    fn name(&self) -> &str {
        "set_variable"
    }

    fn display_value(&self) -> String {
        format!("Apply '{}' to Variable '{}'", self.input, self.output)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let value = session.resolve(&self.input)?;
        session.store(VariableValue::Text(value), &self.output)?;
        Ok(())
    }
}

/// Point a list or table variable's cursor at `index`
#[derive(Debug, Clone, Deserialize)]
pub struct SetVariableIndexCommand {
    pub variable: String,
    pub index: String,
}

#[async_trait]
impl Command for SetVariableIndexCommand {
    fn name(&self) -> &str {
        "set_variable_index"
    }

    fn display_value(&self) -> String {
        format!("Set '{}' Index to {}", self.variable, self.index)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let index = resolve_index(session, &self.index, "Index")?;
        let name = resolver::require(&self.variable, session)?.name.clone();
        session.variables.set_cursor(&name, index)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;

    #[tokio::test]
    async fn test_set_variable_resolves_input() {
        let mut session = Session::new(EngineSettings::default());
        session.variables.set("vFirst", "Ada".into());
        let command = SetVariableCommand {
            input: "Hello {vFirst}".into(),
            output: "{vGreeting}".into(),
        };
        command.run(&mut session).await.unwrap();
        assert_eq!(
            session.variables.get("vGreeting").unwrap().display_value().unwrap(),
            "Hello Ada"
        );
    }

    #[tokio::test]
    async fn test_set_variable_requires_braced_output() {
        let mut session = Session::new(EngineSettings::default());
        let command = SetVariableCommand {
            input: "x".into(),
            output: "vOut".into(),
        };
        let err = command.run(&mut session).await.unwrap_err();
        assert_eq!(crate::error::kind_of(&err), "FormatError");
    }

    #[tokio::test]
    async fn test_set_variable_index() {
        let mut session = Session::new(EngineSettings::default());
        session
            .variables
            .set("vList", VariableValue::list(["a", "b", "c"]));
        let command = SetVariableIndexCommand {
            variable: "{vList}".into(),
            index: "2".into(),
        };
        command.run(&mut session).await.unwrap();
        assert_eq!(session.resolve("{vList}").unwrap(), "c");
    }
}
