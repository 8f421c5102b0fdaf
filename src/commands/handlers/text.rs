//! Regular expression commands

use crate::commands::Command;
use crate::engine::Session;
use crate::error::BotflowError;
use crate::variables::VariableValue;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

fn compile(pattern: &str, command: &str) -> Result<Regex, BotflowError> {
    Regex::new(pattern).map_err(|e| {
        BotflowError::domain(format!("Invalid regular expression '{}'", pattern))
            .with_command(command)
            .with_source(e)
    })
}

/// Split text on a pattern into a list variable
#[derive(Debug, Clone, Deserialize)]
pub struct RegexSplitCommand {
    pub input: String,
    pub pattern: String,
    pub output: String,
}

#[async_trait]
impl Command for RegexSplitCommand {
    fn name(&self) -> &str {
        "regex_split"
    }

    fn display_value(&self) -> String {
        format!("Split '{}' by /{}/ into '{}'", self.input, self.pattern, self.output)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let input = session.resolve(&self.input)?;
        let pattern = session.resolve(&self.pattern)?;
        let regex = compile(&pattern, self.name())?;
        let parts = VariableValue::list(regex.split(&input));
        session.store(parts, &self.output)?;
        Ok(())
    }
}

/// Replace every match of a pattern
#[derive(Debug, Clone, Deserialize)]
pub struct RegexReplaceCommand {
    pub input: String,
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    pub output: String,
}

#[async_trait]
impl Command for RegexReplaceCommand {
    fn name(&self) -> &str {
        "regex_replace"
    }

    fn display_value(&self) -> String {
        format!(
            "Replace /{}/ in '{}' with '{}'",
            self.pattern, self.input, self.replacement
        )
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let input = session.resolve(&self.input)?;
        let pattern = session.resolve(&self.pattern)?;
        let replacement = session.resolve(&self.replacement)?;
        let regex = compile(&pattern, self.name())?;
        let replaced = regex.replace_all(&input, replacement.as_str()).into_owned();
        session.store(VariableValue::Text(replaced), &self.output)?;
        Ok(())
    }
}

/// Collect all matches into a list variable
#[derive(Debug, Clone, Deserialize)]
pub struct RegexMatchesCommand {
    pub input: String,
    pub pattern: String,
    pub output: String,
}

#[async_trait]
impl Command for RegexMatchesCommand {
    fn name(&self) -> &str {
        "regex_matches"
    }

    fn display_value(&self) -> String {
        format!("Find /{}/ in '{}'", self.pattern, self.input)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let input = session.resolve(&self.input)?;
        let pattern = session.resolve(&self.pattern)?;
        let regex = compile(&pattern, self.name())?;
        let matches = VariableValue::list(regex.find_iter(&input).map(|m| m.as_str()));
        session.store(matches, &self.output)?;
        Ok(())
    }
}
