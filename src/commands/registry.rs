//! Command registry mapping script command names to factories

use super::Command;
use crate::error::{BotflowError, ErrorCode, Result};
use crate::script::parse_properties;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a command from its script properties
pub type CommandFactory =
    Arc<dyn Fn(&Map<String, Value>) -> Result<Arc<dyn Command>> + Send + Sync>;

struct Registration {
    description: String,
    factory: CommandFactory,
}

/// Registry that manages all available commands
#[derive(Default)]
pub struct CommandRegistry {
    entries: HashMap<String, Registration>,
}

impl CommandRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in commands
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        super::handlers::register_defaults(&mut registry);
        registry
    }

    /// Registers a factory under `name`, replacing any previous registration
    pub fn register<F>(&mut self, name: impl Into<String>, description: impl Into<String>, factory: F)
    where
        F: Fn(&Map<String, Value>) -> Result<Arc<dyn Command>> + Send + Sync + 'static,
    {
        self.entries.insert(
            name.into(),
            Registration {
                description: description.into(),
                factory: Arc::new(factory),
            },
        );
    }

    /// Registers a command type that deserializes directly from its properties
    pub fn register_properties<T>(&mut self, name: &'static str, description: impl Into<String>)
    where
        T: Command + DeserializeOwned + 'static,
    {
        self.register(name, description, move |properties| {
            let command: T = parse_properties(name, properties)?;
            Ok(Arc::new(command) as Arc<dyn Command>)
        });
    }

    /// Creates a command instance from script properties
    pub fn create(&self, name: &str, properties: &Map<String, Value>) -> Result<Arc<dyn Command>> {
        let registration = self.entries.get(name).ok_or_else(|| {
            BotflowError::script_with_code(
                ErrorCode::SCRIPT_UNKNOWN_COMMAND,
                format!("Unknown command '{}'", name),
                None,
            )
        })?;
        (registration.factory)(properties)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lists registered commands and their descriptions, sorted by name
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut commands: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(name, reg)| (name.as_str(), reg.description.as_str()))
            .collect();
        commands.sort_by(|a, b| a.0.cmp(b.0));
        commands
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.list().iter().map(|(n, _)| *n).collect::<Vec<_>>())
            .finish()
    }
}
