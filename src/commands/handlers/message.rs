//! Messaging and logging commands

use crate::commands::Command;
use crate::engine::Session;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, trace, warn};

/// Report a message through the engine's progress channel.
///
/// Headless hosts have no dialog to show, so the message becomes a
/// progress line prefixed with the optional title.
#[derive(Debug, Clone, Deserialize)]
pub struct ShowMessageCommand {
    pub message: String,
    #[serde(default)]
    pub title: String,
}

#[async_trait]
impl Command for ShowMessageCommand {
    fn name(&self) -> &str {
        "show_message"
    }

    fn display_value(&self) -> String {
        format!("Show Message '{}'", self.message)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let message = session.resolve(&self.message)?;
        let title = session.resolve(&self.title)?;
        info!(target: "botflow::message", title = %title, "{}", message);
        if title.is_empty() {
            session.report_progress(format!("Message: {}", message));
        } else {
            session.report_progress(format!("Message [{}]: {}", title, message));
        }
        Ok(())
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Write a resolved line to the engine log at the chosen level
#[derive(Debug, Clone, Deserialize)]
pub struct LogDataCommand {
    pub message: String,
    #[serde(default = "default_level")]
    pub level: String,
}

#[async_trait]
impl Command for LogDataCommand {
    fn name(&self) -> &str {
        "log_data"
    }

    fn display_value(&self) -> String {
        format!("Log '{}' at {}", self.message, self.level)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let message = session.resolve(&self.message)?;
        match self.level.to_ascii_lowercase().as_str() {
            "trace" => trace!(target: "botflow::script", "{}", message),
            "debug" => debug!(target: "botflow::script", "{}", message),
            "warn" | "warning" => warn!(target: "botflow::script", "{}", message),
            "error" => error!(target: "botflow::script", "{}", message),
            _ => info!(target: "botflow::script", "{}", message),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::engine::EngineEvent;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_show_message_reports_progress() {
        let (tx, mut rx) = mpsc::unbounded_channel::<EngineEvent>();
        let mut session = Session::new(EngineSettings::default()).with_events(tx);
        session.variables.set("vName", "Ada".into());

        let command = ShowMessageCommand {
            message: "Hi {vName}".into(),
            title: String::new(),
        };
        command.run(&mut session).await.unwrap();

        match rx.recv().await.unwrap() {
            EngineEvent::Progress(text) => assert_eq!(text, "Message: Hi Ada"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_log_data_accepts_any_level() {
        let mut session = Session::new(EngineSettings::default());
        for level in ["trace", "debug", "warning", "error", "other"] {
            let command = LogDataCommand {
                message: "line".into(),
                level: level.into(),
            };
            command.run(&mut session).await.unwrap();
        }
    }
}
