use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// The unified error type for script loading, variable resolution and execution
#[derive(Error, Debug)]
pub enum BotflowError {
    #[error("[E{code:04}] Format error: {message}")]
    Format {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Lookup error: {message}")]
    Lookup {
        code: u16,
        message: String,
        name: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Range error: {message}")]
    Range {
        code: u16,
        message: String,
        index: Option<usize>,
        len: Option<usize>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Command failed: {message}")]
    Domain {
        code: u16,
        message: String,
        command: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Child script failed: {message}")]
    ChildScript {
        code: u16,
        message: String,
        script: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Script error: {message}")]
    Script {
        code: u16,
        message: String,
        line: Option<usize>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] I/O error: {message}")]
    Io {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] {message}")]
    Other {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BotflowError {
    /// Create a format error with default code
    pub fn format(message: impl Into<String>) -> Self {
        Self::format_with_code(ErrorCode::FORMAT_GENERIC, message)
    }

    /// Create a format error with specific code
    pub fn format_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Format {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a lookup error for a missing name
    pub fn lookup(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::lookup_with_code(ErrorCode::LOOKUP_GENERIC, name, message)
    }

    /// Create a lookup error with specific code
    pub fn lookup_with_code(code: u16, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lookup {
            code,
            message: message.into(),
            name: Some(name.into()),
            source: None,
        }
    }

    /// Create a range error for an index outside `0..len`
    pub fn range(index: usize, len: usize, message: impl Into<String>) -> Self {
        Self::Range {
            code: ErrorCode::RANGE_INDEX,
            message: message.into(),
            index: Some(index),
            len: Some(len),
            source: None,
        }
    }

    /// Create a range error without index information
    pub fn range_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Range {
            code,
            message: message.into(),
            index: None,
            len: None,
            source: None,
        }
    }

    /// Create a domain error raised by a command
    pub fn domain(message: impl Into<String>) -> Self {
        Self::domain_with_code(ErrorCode::DOMAIN_GENERIC, message, None)
    }

    /// Create a domain error with specific code and command name
    pub fn domain_with_code(
        code: u16,
        message: impl Into<String>,
        command: Option<String>,
    ) -> Self {
        Self::Domain {
            code,
            message: message.into(),
            command,
            source: None,
        }
    }

    /// Create a child script error
    pub fn child_script(message: impl Into<String>) -> Self {
        Self::ChildScript {
            code: ErrorCode::CHILD_SCRIPT_FAILED,
            message: message.into(),
            script: None,
            source: None,
        }
    }

    /// Create a child script error naming the script that failed
    pub fn child_script_at(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ChildScript {
            code: ErrorCode::CHILD_SCRIPT_FAILED,
            message: message.into(),
            script: Some(path.into()),
            source: None,
        }
    }

    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a script definition error
    pub fn script(message: impl Into<String>) -> Self {
        Self::script_with_code(ErrorCode::SCRIPT_GENERIC, message, None)
    }

    /// Create a script definition error with specific code and line number
    pub fn script_with_code(code: u16, message: impl Into<String>, line: Option<usize>) -> Self {
        Self::Script {
            code,
            message: message.into(),
            line,
            source: None,
        }
    }

    /// Create an I/O error for a path
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Io {
            code: ErrorCode::IO_GENERIC,
            message: message.into(),
            path: Some(path.into()),
            source: None,
        }
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::other_with_code(ErrorCode::OTHER_GENERIC, message)
    }

    /// Create a generic error with specific code
    pub fn other_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Other {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attach an underlying cause
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Format { source: src, .. }
            | Self::Lookup { source: src, .. }
            | Self::Range { source: src, .. }
            | Self::Domain { source: src, .. }
            | Self::ChildScript { source: src, .. }
            | Self::Config { source: src, .. }
            | Self::Script { source: src, .. }
            | Self::Io { source: src, .. }
            | Self::Other { source: src, .. } => {
                *src = Some(source.into());
            }
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Format { message, .. }
            | Self::Lookup { message, .. }
            | Self::Range { message, .. }
            | Self::Domain { message, .. }
            | Self::ChildScript { message, .. }
            | Self::Config { message, .. }
            | Self::Script { message, .. }
            | Self::Io { message, .. }
            | Self::Other { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Set the command name for a domain error
    pub fn with_command(mut self, name: impl Into<String>) -> Self {
        if let Self::Domain {
            command: ref mut c, ..
        } = self
        {
            *c = Some(name.into());
        }
        self
    }

    /// Set the line number for a script error
    pub fn with_line(mut self, line_number: usize) -> Self {
        if let Self::Script { line: ref mut l, .. } = self {
            *l = Some(line_number);
        }
        self
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Script { .. } | Self::Format { .. } => 3,
            Self::Io { .. } => 4,
            _ => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Format { code, .. }
            | Self::Lookup { code, .. }
            | Self::Range { code, .. }
            | Self::Domain { code, .. }
            | Self::ChildScript { code, .. }
            | Self::Config { code, .. }
            | Self::Script { code, .. }
            | Self::Io { code, .. }
            | Self::Other { code, .. } => *code,
        }
    }

    /// The kind name recorded in the script error log
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Format { .. } => "FormatError",
            Self::Lookup { .. } => "LookupError",
            Self::Range { .. } => "RangeError",
            Self::Domain { .. } => "DomainError",
            Self::ChildScript { .. } => "ChildScriptFailure",
            Self::Config { .. } => "ConfigError",
            Self::Script { .. } => "ScriptError",
            Self::Io { .. } => "IoError",
            Self::Other { .. } => "Error",
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Lookup {
                message,
                name: Some(name),
                ..
            } => format!("'{}' could not be found: {}", name, message),
            Self::Range {
                message,
                index: Some(index),
                len: Some(len),
                ..
            } => format!("Index {} is out of range for {} item(s): {}", index, len, message),
            Self::Domain {
                message,
                command: Some(command),
                ..
            } => format!("Command '{}' failed: {}", command, message),
            Self::ChildScript {
                message,
                script: Some(script),
                ..
            } => format!("Script {} failed: {}", script.display(), message),
            Self::Script {
                message,
                line: Some(line),
                ..
            } => format!("Script error at line {}: {}", line, message),
            Self::Io {
                message,
                path: Some(path),
                ..
            } => format!("I/O error at {}: {}", path.display(), message),
            Self::Format { message, .. }
            | Self::Lookup { message, .. }
            | Self::Range { message, .. }
            | Self::Domain { message, .. }
            | Self::ChildScript { message, .. }
            | Self::Config { message, .. }
            | Self::Script { message, .. }
            | Self::Io { message, .. }
            | Self::Other { message, .. } => message.clone(),
        }
    }

    /// Get a detailed developer message including the source chain
    pub fn developer_message(&self) -> String {
        let mut msg = format!("{}", self);
        let mut current: Option<&(dyn std::error::Error + 'static)> =
            std::error::Error::source(self);
        while let Some(err) = current {
            msg.push_str(&format!("\n  Caused by: {}", err));
            current = err.source();
        }
        msg
    }
}

/// Type alias for Results using BotflowError
pub type Result<T> = std::result::Result<T, BotflowError>;

/// Name the kind of an error that surfaced during execution.
///
/// Errors raised as [`BotflowError`] keep their taxonomy; anything else a
/// command returns is reported as a plain `Error`.
pub fn kind_of(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<BotflowError>())
        .map(BotflowError::kind_name)
        .unwrap_or("Error")
}

impl From<std::io::Error> for BotflowError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, message) = match err.kind() {
            ErrorKind::NotFound => (ErrorCode::IO_NOT_FOUND, "File or directory not found"),
            ErrorKind::PermissionDenied => (ErrorCode::IO_PERMISSION_DENIED, "Permission denied"),
            _ => (ErrorCode::IO_GENERIC, "I/O operation failed"),
        };

        BotflowError::Io {
            code,
            message: message.to_string(),
            path: None,
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for BotflowError {
    fn from(err: serde_yaml::Error) -> Self {
        BotflowError::script_with_code(ErrorCode::SCRIPT_INVALID_YAML, "Invalid YAML syntax", None)
            .with_source(err)
    }
}

impl From<serde_json::Error> for BotflowError {
    fn from(err: serde_json::Error) -> Self {
        BotflowError::script_with_code(ErrorCode::SCRIPT_INVALID_JSON, "Invalid JSON syntax", None)
            .with_source(err)
    }
}

impl From<toml::de::Error> for BotflowError {
    fn from(err: toml::de::Error) -> Self {
        BotflowError::config_with_code(ErrorCode::CONFIG_INVALID_TOML, "Invalid TOML syntax")
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_code() {
        let err = BotflowError::format("Variable target must be wrapped in braces");
        assert_eq!(
            err.to_string(),
            "[E1000] Format error: Variable target must be wrapped in braces"
        );
        assert_eq!(err.code(), ErrorCode::FORMAT_GENERIC);
    }

    #[test]
    fn test_error_creation_and_chaining() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err = BotflowError::io("scripts/missing.json", "Cannot read script").with_source(io_err);

        assert_eq!(err.code(), ErrorCode::IO_GENERIC);
        assert!(err.developer_message().contains("Caused by: missing.json"));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_with_context_appends() {
        let err = BotflowError::lookup("vTable", "Variable not found").with_context("line 4");
        assert!(err.to_string().ends_with("Variable not found: line 4"));
        assert_eq!(
            err.user_message(),
            "'vTable' could not be found: Variable not found: line 4"
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(BotflowError::format("x").kind_name(), "FormatError");
        assert_eq!(BotflowError::lookup("a", "x").kind_name(), "LookupError");
        assert_eq!(BotflowError::range(3, 2, "x").kind_name(), "RangeError");
        assert_eq!(BotflowError::domain("x").kind_name(), "DomainError");
        assert_eq!(
            BotflowError::child_script("x").kind_name(),
            "ChildScriptFailure"
        );
    }

    #[test]
    fn test_kind_of_anyhow_chain() {
        let err: anyhow::Error = BotflowError::range(5, 2, "Cursor out of bounds").into();
        let err = err.context("while resolving {vList}");
        assert_eq!(kind_of(&err), "RangeError");

        let plain = anyhow::anyhow!("boom");
        assert_eq!(kind_of(&plain), "Error");
    }

    #[test]
    fn test_domain_with_command() {
        let err = BotflowError::domain("Bad input").with_command("regex_split");
        assert_eq!(err.user_message(), "Command 'regex_split' failed: Bad input");
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let err: BotflowError = json_err.into();
        assert_eq!(err.code(), ErrorCode::SCRIPT_INVALID_JSON);
        assert_eq!(err.kind_name(), "ScriptError");
    }
}
