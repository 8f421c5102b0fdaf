//! Waiting and raising errors

use crate::commands::{resolve_index, Command};
use crate::engine::Session;
use crate::error::{BotflowError, ErrorCode};
use crate::variables::VariableValue;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Sleep for `duration_ms` milliseconds
#[derive(Debug, Clone, Deserialize)]
pub struct PauseCommand {
    pub duration_ms: String,
}

#[async_trait]
impl Command for PauseCommand {
    fn name(&self) -> &str {
        "pause"
    }

    fn display_value(&self) -> String {
        format!("Wait for {}ms", self.duration_ms)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let millis = resolve_index(session, &self.duration_ms, "Pause duration")?;
        tokio::time::sleep(Duration::from_millis(millis as u64)).await;
        Ok(())
    }
}

/// Fail with a script-defined message
#[derive(Debug, Clone, Deserialize)]
pub struct ThrowExceptionCommand {
    pub message: String,
}

#[async_trait]
impl Command for ThrowExceptionCommand {
    fn name(&self) -> &str {
        "throw_exception"
    }

    fn display_value(&self) -> String {
        format!("Throw '{}'", self.message)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let message = session.resolve(&self.message)?;
        Err(BotflowError::domain_with_code(
            ErrorCode::DOMAIN_THROWN,
            message,
            Some(self.name().to_string()),
        )
        .into())
    }
}

/// Store the message of the most recent logged error, or empty text
#[derive(Debug, Clone, Deserialize)]
pub struct GetExceptionMessageCommand {
    pub output: String,
}

#[async_trait]
impl Command for GetExceptionMessageCommand {
    fn name(&self) -> &str {
        "get_exception_message"
    }

    fn display_value(&self) -> String {
        format!("Store Exception Message in '{}'", self.output)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let message = session
            .latest_error()
            .map(|e| e.message.clone())
            .unwrap_or_default();
        session.store(VariableValue::Text(message), &self.output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::error::kind_of;

    #[tokio::test]
    async fn test_pause_sleeps() {
        let mut session = Session::new(EngineSettings::default());
        let started = std::time::Instant::now();
        PauseCommand {
            duration_ms: "30".into(),
        }
        .run(&mut session)
        .await
        .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_pause_rejects_bad_duration() {
        let mut session = Session::new(EngineSettings::default());
        let err = PauseCommand {
            duration_ms: "soon".into(),
        }
        .run(&mut session)
        .await
        .unwrap_err();
        assert_eq!(kind_of(&err), "FormatError");
    }

    #[tokio::test]
    async fn test_throw_exception() {
        let mut session = Session::new(EngineSettings::default());
        session.variables.set("vCode", "42".into());
        let err = ThrowExceptionCommand {
            message: "Failed with {vCode}".into(),
        }
        .run(&mut session)
        .await
        .unwrap_err();
        assert_eq!(kind_of(&err), "DomainError");
        assert!(err.to_string().contains("Failed with 42"));
    }

    #[tokio::test]
    async fn test_get_exception_message() {
        let mut session = Session::new(EngineSettings::default());
        let command = GetExceptionMessageCommand {
            output: "{vError}".into(),
        };
        command.run(&mut session).await.unwrap();
        assert_eq!(session.resolve("{vError}").unwrap(), "");

        let error: anyhow::Error = BotflowError::domain("disk full").into();
        session
            .errors
            .push(crate::engine::ScriptError::from_error(&error, 2, None));
        command.run(&mut session).await.unwrap();
        assert!(session.resolve("{vError}").unwrap().contains("disk full"));
    }
}
