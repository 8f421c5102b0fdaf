//! Events the engine publishes while a script runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// How a script run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptResult {
    Successful,
    Cancelled,
    Errored,
}

/// Published once per top-level run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptFinishedEvent {
    pub result: ScriptResult,
    pub error: Option<String>,
    pub summary: String,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub file_name: Option<PathBuf>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A human-readable progress line
    Progress(String),
    /// The engine is about to run this line
    LineNumberChanged(usize),
    ScriptFinished(ScriptFinishedEvent),
}

impl EngineEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            EngineEvent::Progress(message) => message.clone(),
            EngineEvent::LineNumberChanged(line) => format!("Line {line}"),
            EngineEvent::ScriptFinished(finished) => match &finished.error {
                Some(error) => format!("Script {:?}: {}", finished.result, error),
                None => format!("Script {:?}: {}", finished.result, finished.summary),
            },
        }
    }

    /// Check if this event represents a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineEvent::ScriptFinished(_))
    }
}

/// Where events go. A sink without a receiver drops them.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<EngineEvent>>,
}

impl EventSink {
    pub fn new(sender: UnboundedSender<EngineEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: EngineEvent) {
        if let Some(sender) = &self.sender {
            // The host may have stopped listening.
            let _ = sender.send(event);
        }
    }
}

impl From<UnboundedSender<EngineEvent>> for EventSink {
    fn from(sender: UnboundedSender<EngineEvent>) -> Self {
        Self::new(sender)
    }
}
