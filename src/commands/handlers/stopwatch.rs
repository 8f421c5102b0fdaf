//! Named stopwatches kept in the session's app instances

use crate::commands::Command;
use crate::engine::Session;
use crate::error::{BotflowError, ErrorCode};
use crate::variables::VariableValue;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct StopwatchState {
    started: Option<Instant>,
    accumulated: Duration,
}

/// A pausable elapsed-time counter shared through app instances
#[derive(Debug, Default)]
pub struct Stopwatch {
    state: Mutex<StopwatchState>,
}

impl Stopwatch {
    fn with_state<T>(&self, f: impl FnOnce(&mut StopwatchState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn start(&self) {
        self.with_state(|s| {
            if s.started.is_none() {
                s.started = Some(Instant::now());
            }
        });
    }

    pub fn stop(&self) {
        self.with_state(|s| {
            if let Some(started) = s.started.take() {
                s.accumulated += started.elapsed();
            }
        });
    }

    pub fn reset(&self) {
        self.with_state(|s| *s = StopwatchState::default());
    }

    pub fn restart(&self) {
        self.with_state(|s| {
            s.accumulated = Duration::ZERO;
            s.started = Some(Instant::now());
        });
    }

    pub fn is_running(&self) -> bool {
        self.with_state(|s| s.started.is_some())
    }

    pub fn elapsed(&self) -> Duration {
        self.with_state(|s| {
            s.accumulated + s.started.map(|t| t.elapsed()).unwrap_or_default()
        })
    }
}

/// Render as `hh:mm:ss.fff`
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        millis / 3_600_000,
        (millis / 60_000) % 60,
        (millis / 1000) % 60,
        millis % 1000
    )
}

fn default_instance() -> String {
    "default_stopwatch".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopwatchCommand {
    #[serde(default = "default_instance")]
    pub instance: String,
    pub action: String,
    #[serde(default)]
    pub output: Option<String>,
}

#[async_trait]
impl Command for StopwatchCommand {
    fn name(&self) -> &str {
        "stopwatch"
    }

    fn display_value(&self) -> String {
        format!("{} Stopwatch '{}'", self.action, self.instance)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let instance = session.resolve(&self.instance)?;
        let action = session.resolve(&self.action)?.to_ascii_lowercase();

        if action == "start" && !session.app_instances.contains(&instance) {
            let stopwatch = Arc::new(Stopwatch::default());
            stopwatch.start();
            session.add_app_instance(&instance, stopwatch)?;
            return Ok(());
        }

        let stopwatch = session.app_instances.get_as::<Stopwatch>(&instance)?;
        match action.as_str() {
            "start" => stopwatch.start(),
            "stop" => stopwatch.stop(),
            "reset" => stopwatch.reset(),
            "restart" => stopwatch.restart(),
            "measure" => {
                let output = self.output.as_deref().ok_or_else(|| {
                    BotflowError::domain("Measuring a stopwatch requires an output variable")
                        .with_command(self.name())
                })?;
                let text = format_elapsed(stopwatch.elapsed());
                session.store(VariableValue::Text(text), output)?;
            }
            other => {
                return Err(BotflowError::domain_with_code(
                    ErrorCode::DOMAIN_GENERIC,
                    format!("Unknown stopwatch action '{}'", other),
                    Some(self.name().to_string()),
                )
                .into())
            }
        }
        Ok(())
    }
}
