//! Common test utilities and helpers
#![allow(dead_code)]

use async_trait::async_trait;
use botflow::commands::{Command, CommandRegistry};
use botflow::config::EngineSettings;
use botflow::engine::{Engine, EngineEvent, ScriptOutcome, Session};
use botflow::script::{parse_properties, ScriptSource};
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Labels recorded by `record` commands, in execution order
#[derive(Clone, Default)]
pub struct Recording(Arc<Mutex<Vec<String>>>);

impl Recording {
    pub fn push(&self, label: String) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(label);
    }

    pub fn labels(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[derive(Deserialize)]
struct RecordProps {
    label: String,
}

/// Test command that appends its resolved label to a [`Recording`]
pub struct RecordCommand {
    label: String,
    log: Recording,
}

#[async_trait]
impl Command for RecordCommand {
    fn name(&self) -> &str {
        "record"
    }

    fn display_value(&self) -> String {
        format!("Record '{}'", self.label)
    }

    async fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        let label = session.resolve(&self.label)?;
        self.log.push(label);
        Ok(())
    }
}

/// Built-in commands plus `record`
pub fn registry_with_recorder() -> (Arc<CommandRegistry>, Recording) {
    let log = Recording::default();
    let mut registry = CommandRegistry::with_defaults();
    let captured = log.clone();
    registry.register("record", "Record a label for tests", move |props| {
        let props: RecordProps = parse_properties("record", props)?;
        Ok(Arc::new(RecordCommand {
            label: props.label,
            log: captured.clone(),
        }) as Arc<dyn Command>)
    });
    (Arc::new(registry), log)
}

pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        delay_between_commands_ms: 0,
        ..EngineSettings::default()
    }
}

/// An engine wired to a recorder and an event channel
pub struct Harness {
    pub engine: Engine,
    pub log: Recording,
    pub events: mpsc::UnboundedReceiver<EngineEvent>,
}

impl Harness {
    pub fn new(settings: EngineSettings) -> Self {
        let (registry, log) = registry_with_recorder();
        let (tx, events) = mpsc::unbounded_channel::<EngineEvent>();
        let engine = Engine::new(settings)
            .with_registry(registry)
            .with_events(tx);
        Self {
            engine,
            log,
            events,
        }
    }

    pub fn fast() -> Self {
        Self::new(fast_settings())
    }

    /// Run a JSON script to completion and collect every event
    pub async fn run_json(self, json: &str) -> Finished {
        let Harness {
            engine,
            log,
            mut events,
        } = self;
        let outcome = engine.run(ScriptSource::Json(json.to_string())).await;
        let events = drain(&mut events);
        Finished {
            outcome,
            labels: log.labels(),
            events,
        }
    }
}

pub struct Finished {
    pub outcome: ScriptOutcome,
    pub labels: Vec<String>,
    pub events: Vec<EngineEvent>,
}

impl Finished {
    pub fn progress(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Progress(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn lines(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|event| match event {
                EngineEvent::LineNumberChanged(line) => Some(*line),
                _ => None,
            })
            .collect()
    }

    pub fn variable(&self, name: &str) -> String {
        self.outcome
            .variables
            .get(name)
            .and_then(|v| v.display_value().ok())
            .unwrap_or_default()
    }
}

pub fn drain(events: &mut mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}
