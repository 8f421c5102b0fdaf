//! Mutable state of one script run

use super::control::EngineControl;
use super::events::{EngineEvent, EventSink};
use super::host::{AbortOnError, EngineHost};
use super::instances::{AppInstance, AppInstances};
use super::script_error::{self, ScriptError};
use crate::commands::CommandRegistry;
use crate::config::EngineSettings;
use crate::error::Result;
use crate::resolver;
use crate::script::{Element, ErrorPolicy};
use crate::variables::{VariableStore, VariableValue, MASKED_VALUE};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Everything a command can see and change while a script runs.
///
/// Owned by a single engine run; commands receive it as `&mut Session`.
pub struct Session {
    pub variables: VariableStore,
    pub elements: Vec<Element>,
    pub app_instances: AppInstances,
    pub errors: Vec<ScriptError>,
    pub error_policy: ErrorPolicy,
    pub settings: EngineSettings,
    pub file_name: Option<PathBuf>,
    /// A sub-script failed and nothing has caught it yet
    pub child_script_failed: bool,
    pub child_script_error_caught: bool,
    pub(crate) loop_exit_requested: bool,
    pub(crate) loop_next_requested: bool,
    pub(crate) last_executed_line: usize,
    /// Enclosing `try`/`retry` blocks; the host is only asked at depth zero
    pub(crate) try_depth: usize,
    pub(crate) control: EngineControl,
    pub(crate) events: EventSink,
    pub(crate) host: Arc<dyn EngineHost>,
    pub(crate) registry: Arc<CommandRegistry>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("variables", &self.variables)
            .field("elements", &self.elements)
            .field("app_instances", &self.app_instances)
            .field("errors", &self.errors)
            .field("error_policy", &self.error_policy)
            .field("file_name", &self.file_name)
            .field("last_executed_line", &self.last_executed_line)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            variables: VariableStore::new(),
            elements: Vec::new(),
            app_instances: AppInstances::new(),
            errors: Vec::new(),
            error_policy: ErrorPolicy::default(),
            settings,
            file_name: None,
            child_script_failed: false,
            child_script_error_caught: false,
            loop_exit_requested: false,
            loop_next_requested: false,
            last_executed_line: 0,
            try_depth: 0,
            control: EngineControl::new(),
            events: EventSink::disabled(),
            host: Arc::new(AbortOnError),
            registry: Arc::new(CommandRegistry::with_defaults()),
        }
    }

    pub fn with_events(mut self, events: impl Into<EventSink>) -> Self {
        self.events = events.into();
        self
    }

    pub fn with_control(mut self, control: EngineControl) -> Self {
        self.control = control;
        self
    }

    pub fn with_host(mut self, host: Arc<dyn EngineHost>) -> Self {
        self.host = host;
        self
    }

    pub fn with_registry(mut self, registry: Arc<CommandRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn control(&self) -> &EngineControl {
        &self.control
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Line number of the node most recently started
    pub fn last_executed_line(&self) -> usize {
        self.last_executed_line
    }

    pub fn is_interactive(&self) -> bool {
        self.settings.debug_mode
    }

    pub fn resolve(&mut self, template: &str) -> Result<String> {
        resolver::resolve(template, self)
    }

    /// Replace the rendered value of every secret variable with the mask
    pub fn mask_secrets(&self, text: &str) -> String {
        self.variables
            .iter()
            .filter(|v| v.is_secret)
            .filter_map(|v| v.display_value().ok())
            .filter(|value| !value.is_empty())
            .fold(text.to_string(), |masked, value| {
                masked.replace(&value, MASKED_VALUE)
            })
    }

    /// Store into a braced target such as `{vName}`
    pub fn store(&mut self, value: VariableValue, target: &str) -> Result<()> {
        resolver::store(value, target, self)
    }

    pub fn report_progress(&self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "botflow::engine", "{}", message);
        self.events.emit(EngineEvent::Progress(message));
    }

    pub fn latest_error(&self) -> Option<&ScriptError> {
        script_error::latest(&self.errors)
    }

    /// Register an app instance, honouring the override setting
    pub fn add_app_instance(&mut self, name: &str, instance: AppInstance) -> Result<()> {
        let replaced = self.app_instances.add(
            name,
            instance,
            self.settings.override_existing_app_instances,
        )?;
        if replaced {
            self.report_progress(format!("Overriding Existing Instance: {}", name));
        }
        Ok(())
    }

    /// Snapshot of the run for `{Engine.Context}`; secrets are masked
    pub fn context_json(&self) -> Value {
        json!({
            "file_name": self.file_name,
            "last_executed_line": self.last_executed_line,
            "error_policy": self.error_policy,
            "variables": self.variables.to_masked_json(),
            "elements": self.elements,
            "app_instances": self.app_instances.names(),
            "errors": self.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::Variable;
    use tokio::sync::mpsc;

    #[test]
    fn test_progress_reaches_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel::<EngineEvent>();
        let session = Session::new(EngineSettings::default()).with_events(tx);
        session.report_progress("Bot Engine Started");
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::Progress("Bot Engine Started".into())
        );
    }

    #[test]
    fn test_mask_secrets() {
        let mut session = Session::new(EngineSettings::default());
        session.variables.insert(Variable::secret("vPassword", "hunter2"));
        session.variables.insert(Variable::new("vUser", "ada"));
        assert_eq!(
            session.mask_secrets("login ada / hunter2"),
            "login ada / ********"
        );
    }

    #[test]
    fn test_add_app_instance_honours_override() {
        let mut session = Session::new(EngineSettings::default());
        session.add_app_instance("db", Arc::new(1u32)).unwrap();
        assert!(session.add_app_instance("db", Arc::new(2u32)).is_err());

        session.settings.override_existing_app_instances = true;
        let (tx, mut rx) = mpsc::unbounded_channel::<EngineEvent>();
        let mut session = Session {
            events: EventSink::from(tx),
            ..session
        };
        session.add_app_instance("db", Arc::new(3u32)).unwrap();
        assert_eq!(*session.app_instances.get_as::<u32>("db").unwrap(), 3);
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::Progress("Overriding Existing Instance: db".into())
        );
    }

    #[test]
    fn test_context_masks_secrets() {
        let mut session = Session::new(EngineSettings::default());
        session.variables.insert(Variable::secret("vPassword", "hunter2"));
        let context = session.context_json();
        assert_eq!(context["variables"]["vPassword"], "********");
        assert_eq!(context["error_policy"], "unset");
    }
}
