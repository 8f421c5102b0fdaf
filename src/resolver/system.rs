//! Built-in read-only variables available to every script

use crate::engine::Session;
use chrono::{DateTime, Datelike, Local, Timelike};

/// Names of all system variables, in display order
pub const SYSTEM_VARIABLES: &[&str] = &[
    "DateTime.Now",
    "DateTime.Now.Month",
    "DateTime.Now.Day",
    "DateTime.Now.Year",
    "DateTime.Now.Hour",
    "DateTime.Now.Minute",
    "DateTime.Now.Second",
    "DateTime.Now.FileSafe",
    "Date.Now",
    "Char.NewLine",
    "Char.Tab",
    "Env.MachineName",
    "Env.UserName",
    "Engine.Context",
];

pub fn is_system_variable(name: &str) -> bool {
    SYSTEM_VARIABLES.contains(&name)
}

/// Current value of a system variable, or `None` if `name` is not one
pub fn system_value(name: &str, session: &Session) -> Option<String> {
    let now = Local::now();
    let value = match name {
        "DateTime.Now" => now.format("%Y-%m-%d %H:%M:%S").to_string(),
        "DateTime.Now.Month" => now.month().to_string(),
        "DateTime.Now.Day" => now.day().to_string(),
        "DateTime.Now.Year" => now.year().to_string(),
        "DateTime.Now.Hour" => now.hour().to_string(),
        "DateTime.Now.Minute" => now.minute().to_string(),
        "DateTime.Now.Second" => now.second().to_string(),
        "DateTime.Now.FileSafe" => file_safe(&now),
        "Date.Now" => now.format("%Y-%m-%d").to_string(),
        "Char.NewLine" => "\n".to_string(),
        "Char.Tab" => "\t".to_string(),
        "Env.MachineName" => machine_name(),
        "Env.UserName" => whoami::username(),
        "Engine.Context" => session.context_json().to_string(),
        _ => return None,
    };
    Some(value)
}

fn file_safe(now: &DateTime<Local>) -> String {
    now.format("%m-%d-%Y %H-%M-%S").to_string()
}

fn machine_name() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;

    #[test]
    fn test_known_names() {
        assert!(is_system_variable("DateTime.Now"));
        assert!(is_system_variable("Char.Tab"));
        assert!(!is_system_variable("DateTime"));
    }

    #[test]
    fn test_values() {
        let session = Session::new(EngineSettings::default());
        assert_eq!(system_value("Char.NewLine", &session).unwrap(), "\n");
        assert_eq!(
            system_value("DateTime.Now.Year", &session).unwrap(),
            Local::now().year().to_string()
        );
        let file_safe = system_value("DateTime.Now.FileSafe", &session).unwrap();
        assert!(!file_safe.contains(':'));
        assert!(system_value("Nope", &session).is_none());
    }

    #[test]
    fn test_engine_context_is_json() {
        let session = Session::new(EngineSettings::default());
        let context = system_value("Engine.Context", &session).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&context).unwrap();
        assert!(parsed.get("variables").is_some());
    }
}
