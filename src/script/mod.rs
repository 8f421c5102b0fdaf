//! Script documents: declared variables, UI elements and the command tree
//!
//! Scripts are written as JSON or YAML:
//!
//! ```yaml
//! variables:
//!   - name: vItems
//!     value: [a, b, c]
//! commands:
//!   - command: loop_collection
//!     collection: "{vItems}"
//!     output: "{vItem}"
//!     children:
//!       - command: log_data
//!         message: "Item {vItem}"
//! ```

use crate::commands::CommandRegistry;
use crate::error::{BotflowError, Result};
use crate::variables::Variable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod loader;
pub mod node;

pub use loader::{parse_properties, ActionDefinition, ScriptDefinition};
pub use node::{
    ActionNode, BlockCommand, Condition, ErrorPolicy, Instruction, Intrinsic, Marker, MatchMode,
};

/// A named UI element locator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(rename = "type", default)]
    pub element_type: String,
    #[serde(default)]
    pub value: String,
}

/// A compiled, ready-to-run script
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub commands: Vec<ActionNode>,
    pub variables: Vec<Variable>,
    pub elements: Vec<Element>,
}

/// Where the engine gets its script from
#[derive(Debug, Clone)]
pub enum ScriptSource {
    File(PathBuf),
    Json(String),
    Yaml(String),
    Compiled(Script),
}

impl ScriptSource {
    pub fn file_name(&self) -> Option<PathBuf> {
        match self {
            ScriptSource::File(path) => Some(path.clone()),
            _ => None,
        }
    }
}

impl Script {
    pub fn compile(definition: ScriptDefinition, registry: &CommandRegistry) -> Result<Self> {
        Ok(Self {
            commands: loader::compile(definition.commands, registry)?,
            variables: definition.variables,
            elements: definition.elements,
        })
    }

    pub fn from_json_str(text: &str, registry: &CommandRegistry) -> Result<Self> {
        let definition: ScriptDefinition = serde_json::from_str(text)?;
        Self::compile(definition, registry)
    }

    pub fn from_yaml_str(text: &str, registry: &CommandRegistry) -> Result<Self> {
        let definition: ScriptDefinition = serde_yaml::from_str(text)?;
        Self::compile(definition, registry)
    }

    /// Load a script file. `.yaml` and `.yml` files are read as YAML, everything else as JSON.
    pub async fn load(path: &Path, registry: &CommandRegistry) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            BotflowError::io(path, "Cannot read script file").with_source(e)
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        let script = if is_yaml {
            Self::from_yaml_str(&text, registry)
        } else {
            Self::from_json_str(&text, registry)
        };
        script.map_err(|e| e.with_context(path.display()))
    }

    /// Total number of nodes, including nested children
    pub fn node_count(&self) -> usize {
        self.commands.iter().map(ActionNode::node_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableValue;
    use tempfile::TempDir;

    const YAML: &str = r#"
variables:
  - name: vItems
    value: [a, b]
elements:
  - name: btnOk
    type: XPath
    value: "//button"
commands:
  - command: loop_collection
    collection: "{vItems}"
    output: "{vItem}"
    children:
      - command: log_data
        message: "Item {vItem}"
"#;

    #[test]
    fn test_from_yaml() {
        let registry = CommandRegistry::with_defaults();
        let script = Script::from_yaml_str(YAML, &registry).unwrap();
        assert_eq!(script.variables[0].value, VariableValue::list(["a", "b"]));
        assert_eq!(script.elements[0].element_type, "XPath");
        assert_eq!(script.node_count(), 2);
    }

    #[test]
    fn test_invalid_json_is_script_error() {
        let registry = CommandRegistry::with_defaults();
        let err = Script::from_json_str("{ nope", &registry).unwrap_err();
        assert_eq!(err.kind_name(), "ScriptError");
    }

    #[tokio::test]
    async fn test_load_by_extension() {
        let registry = CommandRegistry::with_defaults();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bot.yml");
        tokio::fs::write(&path, YAML).await.unwrap();
        let script = Script::load(&path, &registry).await.unwrap();
        assert_eq!(script.commands.len(), 1);

        let missing = Script::load(&dir.path().join("missing.json"), &registry)
            .await
            .unwrap_err();
        assert_eq!(missing.kind_name(), "IoError");
    }
}
