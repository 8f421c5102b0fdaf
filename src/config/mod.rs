use crate::error::{BotflowError, ErrorCode, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the settings file inside the configuration directory
pub const SETTINGS_FILE: &str = "settings.toml";

/// Get the global Botflow directory for storing data such as metrics
pub fn get_global_botflow_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "botflow", "botflow")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| BotflowError::config("Could not determine home directory"))
}

/// Default location of `settings.toml`
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "botflow", "botflow")
        .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}

/// Settings that shape how the engine runs a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Sleep before every ordinary command
    pub delay_between_commands_ms: u64,
    /// Evaluate arithmetic in resolved text
    pub auto_calculate_variables: bool,
    /// Replace same-named app instances instead of failing
    pub override_existing_app_instances: bool,
    /// Append a summary line per finished script to the metrics file
    pub track_execution_metrics: bool,
    /// Upper bound on `loop_while` iterations
    pub max_loop_iterations: usize,
    /// Interactive mode: honour pause-before flags and ask the host on errors
    pub debug_mode: bool,
    pub metrics_file: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            delay_between_commands_ms: 250,
            auto_calculate_variables: true,
            override_existing_app_instances: false,
            track_execution_metrics: false,
            max_loop_iterations: 100_000,
            debug_mode: false,
            metrics_file: None,
        }
    }
}

impl EngineSettings {
    /// Where execution metrics are written, if tracking is on
    pub fn metrics_path(&self) -> Option<PathBuf> {
        if !self.track_execution_metrics {
            return None;
        }
        self.metrics_file.clone().or_else(|| {
            get_global_botflow_dir()
                .ok()
                .map(|dir| dir.join("execution-summary.jsonl"))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSettings,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load settings from `path`, or from the default location when `path` is `None`.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match default_config_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            if required {
                return Err(BotflowError::config_with_code(
                    ErrorCode::CONFIG_NOT_FOUND,
                    format!("Configuration file not found: {}", path.display()),
                ));
            }
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| BotflowError::io(&path, "Cannot read settings").with_source(e))?;
        let config = Self::from_toml_str(&text).map_err(|e| e.with_context(path.display()))?;
        debug!("Loaded settings from {}", path.display());
        Ok(config)
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    /// Apply `BOTFLOW_*` overrides read through `lookup`
    pub fn merge_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
            let raw = raw?;
            match raw.trim().parse::<T>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring {}={:?}: not a valid value", key, raw);
                    None
                }
            }
        }

        let engine = &mut self.engine;
        if let Some(delay) = parsed("BOTFLOW_DELAY_MS", lookup("BOTFLOW_DELAY_MS")) {
            engine.delay_between_commands_ms = delay;
        }
        if let Some(auto) = parsed("BOTFLOW_AUTO_CALCULATE", lookup("BOTFLOW_AUTO_CALCULATE")) {
            engine.auto_calculate_variables = auto;
        }
        if let Some(value) = parsed(
            "BOTFLOW_OVERRIDE_INSTANCES",
            lookup("BOTFLOW_OVERRIDE_INSTANCES"),
        ) {
            engine.override_existing_app_instances = value;
        }
        if let Some(debug) = parsed("BOTFLOW_DEBUG", lookup("BOTFLOW_DEBUG")) {
            engine.debug_mode = debug;
        }
        if let Some(limit) = parsed(
            "BOTFLOW_MAX_LOOP_ITERATIONS",
            lookup("BOTFLOW_MAX_LOOP_ITERATIONS"),
        ) {
            engine.max_loop_iterations = limit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.delay_between_commands_ms, 250);
        assert!(settings.auto_calculate_variables);
        assert!(!settings.override_existing_app_instances);
        assert!(settings.metrics_path().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
[engine]
delay_between_commands_ms = 0
debug_mode = true
"#,
        )
        .unwrap();
        assert_eq!(config.engine.delay_between_commands_ms, 0);
        assert!(config.engine.debug_mode);
        assert!(config.engine.auto_calculate_variables);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml_str("engine = [").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_TOML);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BOTFLOW_DELAY_MS", "10"),
            ("BOTFLOW_AUTO_CALCULATE", "false"),
            ("BOTFLOW_DEBUG", "not-a-bool"),
        ]);
        let mut config = Config::new();
        config.merge_env_from(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.engine.delay_between_commands_ms, 10);
        assert!(!config.engine.auto_calculate_variables);
        assert!(!config.engine.debug_mode);
    }

    #[test]
    fn test_metrics_path_prefers_explicit_file() {
        let settings = EngineSettings {
            track_execution_metrics: true,
            metrics_file: Some(PathBuf::from("/tmp/metrics.jsonl")),
            ..EngineSettings::default()
        };
        assert_eq!(
            settings.metrics_path(),
            Some(PathBuf::from("/tmp/metrics.jsonl"))
        );
    }

    #[tokio::test]
    async fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        tokio::fs::write(&path, "[engine]\nmax_loop_iterations = 5\n")
            .await
            .unwrap();
        let config = Config::load(Some(&path)).await.unwrap();
        assert_eq!(config.engine.max_loop_iterations, 5);

        let missing = Config::load(Some(&dir.path().join("nope.toml")))
            .await
            .unwrap_err();
        assert_eq!(missing.code(), ErrorCode::CONFIG_NOT_FOUND);
    }
}
