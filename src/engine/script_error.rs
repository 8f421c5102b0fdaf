use crate::error::kind_of;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One entry in a run's error log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptError {
    pub source_file: Option<PathBuf>,
    pub line_number: usize,
    pub error_kind: String,
    pub message: String,
    pub stack_trace: String,
}

impl ScriptError {
    pub fn from_error(error: &anyhow::Error, line_number: usize, source_file: Option<PathBuf>) -> Self {
        Self {
            source_file,
            line_number,
            error_kind: kind_of(error).to_string(),
            message: error.to_string(),
            stack_trace: format!("{error:?}"),
        }
    }
}

/// The authoritative error: highest line number, latest on ties
pub fn latest(errors: &[ScriptError]) -> Option<&ScriptError> {
    errors.iter().max_by_key(|e| e.line_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotflowError;

    #[test]
    fn test_from_error_records_kind() {
        let error: anyhow::Error = BotflowError::lookup("vMissing", "Variable not found").into();
        let entry = ScriptError::from_error(&error, 3, Some(PathBuf::from("main.json")));
        assert_eq!(entry.error_kind, "LookupError");
        assert_eq!(entry.line_number, 3);
        assert!(entry.message.contains("Variable not found"));

        let plain = ScriptError::from_error(&anyhow::anyhow!("plain"), 1, None);
        assert_eq!(plain.error_kind, "Error");
    }

    #[test]
    fn test_latest_prefers_line_then_order() {
        let make = |line, message: &str| ScriptError {
            source_file: None,
            line_number: line,
            error_kind: "Error".into(),
            message: message.into(),
            stack_trace: String::new(),
        };
        let errors = vec![make(5, "a"), make(2, "b"), make(5, "c")];
        assert_eq!(latest(&errors).unwrap().message, "c");
        assert!(latest(&[]).is_none());
    }
}
