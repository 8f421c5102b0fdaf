//! Pluggable script commands
//!
//! Ordinary commands implement [`Command`] and are created from their
//! script properties by a [`CommandRegistry`]. Control-flow commands are not
//! registered here; the engine owns them (see [`crate::script::BlockCommand`]).

use crate::engine::Session;
use crate::error::{BotflowError, ErrorCode, Result};
use async_trait::async_trait;
use serde::Deserialize;

pub mod handlers;
pub mod registry;

pub use registry::{CommandFactory, CommandRegistry};

/// Core trait that all ordinary script commands implement
#[async_trait]
pub trait Command: Send + Sync {
    /// The command name used in scripts
    fn name(&self) -> &str;

    /// Human-readable summary shown in progress output
    fn display_value(&self) -> String;

    /// Execute against the session, resolving properties as needed
    async fn run(&self, session: &mut Session) -> anyhow::Result<()>;
}

/// A property that accepts either comma-separated text or a list of texts
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TextList {
    Many(Vec<String>),
    One(String),
}

impl TextList {
    /// Resolve each entry. Single text is resolved first, then split on commas.
    pub fn resolve(&self, session: &mut Session) -> Result<Vec<String>> {
        match self {
            TextList::Many(items) => items.iter().map(|item| session.resolve(item)).collect(),
            TextList::One(text) => {
                let resolved = session.resolve(text)?;
                if resolved.trim().is_empty() {
                    return Ok(Vec::new());
                }
                Ok(resolved.split(',').map(|s| s.trim().to_string()).collect())
            }
        }
    }
}

impl std::fmt::Display for TextList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextList::Many(items) => write!(f, "{}", items.join(", ")),
            TextList::One(text) => write!(f, "{}", text),
        }
    }
}

/// Resolve `text` and parse it as a non-negative integer
pub fn resolve_index(session: &mut Session, text: &str, what: &str) -> Result<usize> {
    let resolved = session.resolve(text)?;
    resolved.trim().parse::<usize>().map_err(|e| {
        BotflowError::format_with_code(
            ErrorCode::FORMAT_INVALID_NUMBER,
            format!("{} '{}' is not a valid number", what, resolved),
        )
        .with_source(e)
    })
}
