//! The host decides what happens to unhandled errors in interactive runs

use anyhow::Result;
use async_trait::async_trait;
use std::io::{self, Write};
use std::path::PathBuf;

/// What the engine tells the host about a failed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub line_number: usize,
    pub command: String,
    pub error_kind: String,
    pub message: String,
    pub file_name: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDecision {
    /// Clear the error log and carry on with the next line
    IgnoreAndResume,
    /// Fail the script
    Abort,
}

#[async_trait]
pub trait EngineHost: Send + Sync {
    /// Called for an unhandled error while running in debug mode
    async fn on_unhandled_error(&self, report: &ErrorReport) -> ErrorDecision;
}

/// Default host: never ignores an error
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnError;

#[async_trait]
impl EngineHost for AbortOnError {
    async fn on_unhandled_error(&self, _report: &ErrorReport) -> ErrorDecision {
        ErrorDecision::Abort
    }
}

/// Asks on the terminal whether to ignore the error
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleHost;

impl ConsoleHost {
    pub fn new() -> Self {
        Self
    }

    pub fn format_prompt(report: &ErrorReport) -> String {
        format!(
            "Error on line {} ({}): {}\nIgnore and continue? [y/N]: ",
            report.line_number, report.command, report.message
        )
    }

    /// Only an explicit yes ignores the error
    pub fn parse_decision(input: &str) -> ErrorDecision {
        match input.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" | "i" | "ignore" => ErrorDecision::IgnoreAndResume,
            _ => ErrorDecision::Abort,
        }
    }

    fn read_line() -> Result<String> {
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input)
    }
}

#[async_trait]
impl EngineHost for ConsoleHost {
    async fn on_unhandled_error(&self, report: &ErrorReport) -> ErrorDecision {
        print!("{}", Self::format_prompt(report));
        let _ = io::stdout().flush();
        match tokio::task::spawn_blocking(Self::read_line).await {
            Ok(Ok(input)) => Self::parse_decision(&input),
            _ => ErrorDecision::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ErrorReport {
        ErrorReport {
            line_number: 4,
            command: "throw_exception".into(),
            error_kind: "DomainError".into(),
            message: "boom".into(),
            file_name: None,
        }
    }

    #[test]
    fn test_parse_decision() {
        assert_eq!(
            ConsoleHost::parse_decision("Y\n"),
            ErrorDecision::IgnoreAndResume
        );
        assert_eq!(
            ConsoleHost::parse_decision("ignore"),
            ErrorDecision::IgnoreAndResume
        );
        assert_eq!(ConsoleHost::parse_decision(""), ErrorDecision::Abort);
        assert_eq!(ConsoleHost::parse_decision("nope"), ErrorDecision::Abort);
    }

    #[test]
    fn test_format_prompt() {
        let prompt = ConsoleHost::format_prompt(&report());
        assert!(prompt.starts_with("Error on line 4 (throw_exception): boom"));
    }

    #[tokio::test]
    async fn test_default_host_aborts() {
        assert_eq!(
            AbortOnError.on_unhandled_error(&report()).await,
            ErrorDecision::Abort
        );
    }
}
