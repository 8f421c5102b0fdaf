//! Script execution engine
//!
//! An [`Engine`] is configured with a builder and consumed by [`Engine::run`]
//! (or [`Engine::spawn`] to run on its own task). While it runs, the host
//! talks to it through an [`EngineControl`] handle and listens to
//! [`EngineEvent`]s:
//!
//! ```no_run
//! use botflow::config::EngineSettings;
//! use botflow::engine::Engine;
//! use botflow::script::ScriptSource;
//!
//! # async fn demo() {
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let engine = Engine::new(EngineSettings::default()).with_events(tx);
//! let control = engine.control();
//! let handle = engine.spawn(ScriptSource::File("main.json".into()));
//! while let Some(event) = rx.recv().await {
//!     println!("{}", event.description());
//! }
//! control.cancel();
//! let outcome = handle.await;
//! # }
//! ```

mod blocks;
pub mod conditions;
pub mod control;
mod dispatch;
pub mod events;
pub mod host;
pub mod instances;
pub mod metrics;
pub mod script_error;
pub mod session;

pub use crate::script::ErrorPolicy;
pub use control::{EngineControl, StepRequest, WaitOutcome};
pub use events::{EngineEvent, EventSink, ScriptFinishedEvent, ScriptResult};
pub use host::{AbortOnError, ConsoleHost, EngineHost, ErrorDecision, ErrorReport};
pub use instances::{AppInstance, AppInstances, SharedInstances};
pub use script_error::ScriptError;
pub use session::Session;

use crate::commands::CommandRegistry;
use crate::config::EngineSettings;
use crate::script::{ActionNode, Element, Script, ScriptSource};
use crate::variables::{Variable, VariableStore};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Summary text used when a script does not set `{Script.Result}`
pub const DEFAULT_SUMMARY: &str = "Successfully Completed Script";

/// Everything a finished run hands back to its caller
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    pub finished: ScriptFinishedEvent,
    pub variables: VariableStore,
    pub errors: Vec<ScriptError>,
}

pub struct Engine {
    settings: EngineSettings,
    registry: Arc<CommandRegistry>,
    host: Arc<dyn EngineHost>,
    events: EventSink,
    control: EngineControl,
    shared: Option<SharedInstances>,
    app_instances: AppInstances,
    variables: Vec<Variable>,
    elements: Vec<Element>,
    error_policy: ErrorPolicy,
    nested: bool,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            registry: Arc::new(CommandRegistry::with_defaults()),
            host: Arc::new(AbortOnError),
            events: EventSink::disabled(),
            control: EngineControl::new(),
            shared: None,
            app_instances: AppInstances::new(),
            variables: Vec::new(),
            elements: Vec::new(),
            error_policy: ErrorPolicy::default(),
            nested: false,
        }
    }

    /// An engine for a sub-script that shares the parent's control, events and host
    pub(crate) fn child_of(parent: &Session) -> Self {
        Self {
            settings: parent.settings.clone(),
            registry: parent.registry.clone(),
            host: parent.host.clone(),
            events: parent.events.clone(),
            control: parent.control.clone(),
            shared: None,
            app_instances: parent.app_instances.clone(),
            variables: Vec::new(),
            elements: parent.elements.clone(),
            error_policy: ErrorPolicy::default(),
            nested: true,
        }
    }

    pub fn with_registry(mut self, registry: Arc<CommandRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_host(mut self, host: Arc<dyn EngineHost>) -> Self {
        self.host = host;
        self
    }

    pub fn with_events(mut self, sender: UnboundedSender<EngineEvent>) -> Self {
        self.events = EventSink::new(sender);
        self
    }

    /// Opt in to instances shared by the host across runs
    pub fn with_shared_instances(mut self, shared: SharedInstances) -> Self {
        self.shared = Some(shared);
        self
    }

    /// Initial variables, merged by name over the script's declarations
    pub fn with_variables(mut self, variables: Vec<Variable>) -> Self {
        self.variables = variables;
        self
    }

    /// Initial elements, merged by name over the script's declarations
    pub fn with_elements(mut self, elements: Vec<Element>) -> Self {
        self.elements = elements;
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Handle for pausing, stepping and cancelling this engine
    pub fn control(&self) -> EngineControl {
        self.control.clone()
    }

    /// Run the script on a dedicated task
    pub fn spawn(self, source: ScriptSource) -> JoinHandle<ScriptOutcome> {
        tokio::spawn(self.run(source))
    }

    pub async fn run(self, source: ScriptSource) -> ScriptOutcome {
        let started = Instant::now();
        let Engine {
            settings,
            registry,
            host,
            events,
            control,
            shared,
            app_instances,
            variables,
            elements,
            error_policy,
            nested,
        } = self;

        let mut session = Session::new(settings)
            .with_events(events)
            .with_control(control)
            .with_host(host)
            .with_registry(registry);
        session.file_name = source.file_name();
        session.error_policy = error_policy;
        session.report_progress("Bot Engine Started");

        let error = match load(&session, source).await {
            Ok(script) => {
                let Script {
                    commands,
                    variables: declared,
                    elements: declared_elements,
                } = script;
                session.report_progress("Creating Variable List");
                session.variables = merge_variables(declared, variables);
                session.report_progress("Creating Element List");
                session.elements = merge_elements(declared_elements, elements);
                session.report_progress("Creating App Instance Tracking List");
                session.app_instances = app_instances;
                if let Some(shared) = &shared {
                    session.app_instances.seed_from(shared);
                }
                execute(&mut session, &commands).await
            }
            Err(error) => {
                session
                    .errors
                    .push(ScriptError::from_error(&error, 0, session.file_name.clone()));
                Some(error)
            }
        };

        finish(session, error, started, nested).await
    }
}

async fn load(session: &Session, source: ScriptSource) -> anyhow::Result<Script> {
    let script = match source {
        ScriptSource::File(path) => {
            session.report_progress("Deserializing File");
            Script::load(&path, &session.registry).await?
        }
        ScriptSource::Json(text) => {
            session.report_progress("Deserializing JSON");
            Script::from_json_str(&text, &session.registry)?
        }
        ScriptSource::Yaml(text) => {
            session.report_progress("Deserializing YAML");
            Script::from_yaml_str(&text, &session.registry)?
        }
        ScriptSource::Compiled(script) => script,
    };
    Ok(script)
}

fn merge_variables(declared: Vec<Variable>, initial: Vec<Variable>) -> VariableStore {
    let mut store = VariableStore::from(declared);
    for variable in initial {
        if store.get(&variable.name).is_some() {
            store.merge_overrides(std::slice::from_ref(&variable));
        } else {
            store.insert(variable);
        }
    }
    store
}

fn merge_elements(mut declared: Vec<Element>, initial: Vec<Element>) -> Vec<Element> {
    for element in initial {
        match declared.iter_mut().find(|e| e.name == element.name) {
            Some(existing) => *existing = element,
            None => declared.push(element),
        }
    }
    declared
}

/// Run top-level nodes; returns the error that stopped the script, if any
async fn execute(session: &mut Session, commands: &[ActionNode]) -> Option<anyhow::Error> {
    for node in commands {
        if session.control.is_cancelled() {
            break;
        }
        let result = dispatch::execute_node(session, node).await;
        session.loop_exit_requested = false;
        session.loop_next_requested = false;
        if let Err(failure) = result {
            return Some(failure.error);
        }
    }
    None
}

async fn finish(
    session: Session,
    error: Option<anyhow::Error>,
    started: Instant,
    nested: bool,
) -> ScriptOutcome {
    let (result, error) = match error {
        Some(error) => (ScriptResult::Errored, Some(error.to_string())),
        None if session.control.is_cancelled() => {
            session.report_progress("Cancelling Script");
            (ScriptResult::Cancelled, None)
        }
        None if session.child_script_failed && !session.child_script_error_caught => (
            ScriptResult::Errored,
            Some("Terminate with failure".to_string()),
        ),
        None => (ScriptResult::Successful, None),
    };

    let summary = match result {
        ScriptResult::Successful => session
            .variables
            .get("Script.Result")
            .and_then(|v| v.display_value().ok())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        ScriptResult::Cancelled => "Script Cancelled".to_string(),
        ScriptResult::Errored => "Script Failed".to_string(),
    };

    let finished = ScriptFinishedEvent {
        result,
        error,
        summary,
        duration: started.elapsed(),
        file_name: session.file_name.clone(),
        finished_at: Utc::now(),
    };
    info!(
        target: "botflow::engine",
        result = ?finished.result,
        duration_ms = finished.duration.as_millis() as u64,
        "Script finished"
    );

    if !nested {
        session
            .events
            .emit(EngineEvent::ScriptFinished(finished.clone()));
        if let (Some(path), Some(_)) = (session.settings.metrics_path(), &finished.file_name) {
            if let Err(e) = metrics::append_summary(&path, &finished).await {
                warn!("Failed to record execution metrics: {:#}", e);
            }
        }
    }

    ScriptOutcome {
        finished,
        variables: session.variables,
        errors: session.errors,
    }
}
