//! Compiled script nodes and the instruction set the engine dispatches on

use crate::commands::Command;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// What to do when a command fails and no enclosing block handles it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Defer to the host in interactive mode, otherwise stop
    #[default]
    Unset,
    /// Log the error and move on to the next node
    ContinueProcessing,
    /// Stop the script immediately
    StopProcessing,
}

impl ErrorPolicy {
    /// Parse `continue processing`, `stop processing` or empty text
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "" | "unset" | "default" => Some(ErrorPolicy::Unset),
            "continue processing" | "continue" => Some(ErrorPolicy::ContinueProcessing),
            "stop processing" | "stop" => Some(ErrorPolicy::StopProcessing),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Unset => write!(f, "Unset"),
            ErrorPolicy::ContinueProcessing => write!(f, "Continue Processing"),
            ErrorPolicy::StopProcessing => write!(f, "Stop Processing"),
        }
    }
}

/// A boolean test used by `if`, `multi_if`, `loop_while` and `retry`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Compare two resolved values with a named operator such as `equal to`
    Value {
        left: String,
        operator: String,
        #[serde(default)]
        right: String,
    },
    /// True when the variable exists and renders non-empty
    HasValue { variable: String },
    /// True when the resolved text parses as a number
    IsNumeric { value: String },
    /// Evaluate resolved text as an expression
    Expression { expression: String },
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Value {
                left,
                operator,
                right,
            } => write!(f, "'{}' {} '{}'", left, operator, right),
            Condition::HasValue { variable } => write!(f, "{} has value", variable),
            Condition::IsNumeric { value } => write!(f, "{} is numeric", value),
            Condition::Expression { expression } => write!(f, "{}", expression),
        }
    }
}

/// How `multi_if` combines its conditions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

/// Commands that own their children and decide how to run them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockCommand {
    LoopTimes {
        times: String,
    },
    LoopWhile {
        condition: Condition,
    },
    LoopCollection {
        collection: String,
        output: String,
    },
    If {
        condition: Condition,
    },
    MultiIf {
        conditions: Vec<Condition>,
        mode: MatchMode,
    },
    Try,
    Retry {
        attempts: String,
        delay_ms: String,
        condition: Option<Condition>,
    },
    Switch {
        value: String,
    },
    Sequence,
    RunScript {
        path: String,
        pass_variables: bool,
        variables: BTreeMap<String, String>,
    },
}

impl BlockCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BlockCommand::LoopTimes { .. } => "loop_times",
            BlockCommand::LoopWhile { .. } => "loop_while",
            BlockCommand::LoopCollection { .. } => "loop_collection",
            BlockCommand::If { .. } => "if",
            BlockCommand::MultiIf { .. } => "multi_if",
            BlockCommand::Try => "try",
            BlockCommand::Retry { .. } => "retry",
            BlockCommand::Switch { .. } => "switch",
            BlockCommand::Sequence => "sequence",
            BlockCommand::RunScript { .. } => "run_script",
        }
    }

    pub fn display_value(&self) -> String {
        match self {
            BlockCommand::LoopTimes { times } => format!("Loop {} Times", times),
            BlockCommand::LoopWhile { condition } => format!("Loop While ({})", condition),
            BlockCommand::LoopCollection { collection, output } => {
                format!("Loop Through '{}' Into '{}'", collection, output)
            }
            BlockCommand::If { condition } => format!("Begin If ({})", condition),
            BlockCommand::MultiIf { conditions, mode } => {
                let joiner = match mode {
                    MatchMode::All => " and ",
                    MatchMode::Any => " or ",
                };
                let parts: Vec<String> = conditions.iter().map(|c| format!("({})", c)).collect();
                format!("Begin Multi If {}", parts.join(joiner))
            }
            BlockCommand::Try => "Begin Try".to_string(),
            BlockCommand::Retry { attempts, .. } => format!("Begin Retry ({} Attempts)", attempts),
            BlockCommand::Switch { value } => format!("Begin Switch '{}'", value),
            BlockCommand::Sequence => "Begin Sequence".to_string(),
            BlockCommand::RunScript { path, .. } => format!("Run Script '{}'", path),
        }
    }

    /// Section markers this block accepts among its direct children
    pub fn accepts(&self, marker: &Marker) -> bool {
        matches!(
            (self, marker),
            (BlockCommand::If { .. } | BlockCommand::MultiIf { .. }, Marker::Else)
                | (BlockCommand::Try, Marker::Catch | Marker::Finally)
                | (
                    BlockCommand::Switch { .. },
                    Marker::Case(_) | Marker::DefaultCase
                )
        )
    }
}

/// Section separators inside a block's children
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Else,
    Catch,
    Finally,
    Case(String),
    DefaultCase,
}

impl Marker {
    pub fn name(&self) -> &'static str {
        match self {
            Marker::Else => "else",
            Marker::Catch => "catch",
            Marker::Finally => "finally",
            Marker::Case(_) => "case",
            Marker::DefaultCase => "default_case",
        }
    }
}

/// Commands the engine handles itself because they change engine state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intrinsic {
    StopTask,
    ExitLoop,
    NextLoop,
    SetEngineDelay(String),
    Rethrow,
    SetErrorHandling(ErrorPolicy),
}

impl Intrinsic {
    pub fn name(&self) -> &'static str {
        match self {
            Intrinsic::StopTask => "stop_task",
            Intrinsic::ExitLoop => "exit_loop",
            Intrinsic::NextLoop => "next_loop",
            Intrinsic::SetEngineDelay(_) => "set_engine_delay",
            Intrinsic::Rethrow => "rethrow",
            Intrinsic::SetErrorHandling(_) => "error_handling",
        }
    }
}

#[derive(Clone)]
pub enum Instruction {
    Comment(String),
    Block(BlockCommand),
    Marker(Marker),
    Intrinsic(Intrinsic),
    Command(Arc<dyn Command>),
}

impl Instruction {
    pub fn name(&self) -> &str {
        match self {
            Instruction::Comment(_) => "comment",
            Instruction::Block(block) => block.name(),
            Instruction::Marker(marker) => marker.name(),
            Instruction::Intrinsic(intrinsic) => intrinsic.name(),
            Instruction::Command(command) => command.name(),
        }
    }

    pub fn display_value(&self) -> String {
        match self {
            Instruction::Comment(text) => format!("// {}", text),
            Instruction::Block(block) => block.display_value(),
            Instruction::Marker(Marker::Case(value)) => format!("Case '{}'", value),
            Instruction::Marker(marker) => match marker {
                Marker::Else => "Else".to_string(),
                Marker::Catch => "Catch".to_string(),
                Marker::Finally => "Finally".to_string(),
                _ => "Default Case".to_string(),
            },
            Instruction::Intrinsic(intrinsic) => match intrinsic {
                Intrinsic::StopTask => "Stop Current Task".to_string(),
                Intrinsic::ExitLoop => "Exit Loop".to_string(),
                Intrinsic::NextLoop => "Next Loop".to_string(),
                Intrinsic::SetEngineDelay(delay) => format!("Set Engine Delay to {}ms", delay),
                Intrinsic::Rethrow => "Rethrow".to_string(),
                Intrinsic::SetErrorHandling(policy) => format!("Error Handling: {}", policy),
            },
            Instruction::Command(command) => command.display_value(),
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Instruction::Block(_))
    }

    pub fn marker(&self) -> Option<&Marker> {
        match self {
            Instruction::Marker(marker) => Some(marker),
            _ => None,
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Comment(text) => f.debug_tuple("Comment").field(text).finish(),
            Instruction::Block(block) => f.debug_tuple("Block").field(block).finish(),
            Instruction::Marker(marker) => f.debug_tuple("Marker").field(marker).finish(),
            Instruction::Intrinsic(i) => f.debug_tuple("Intrinsic").field(i).finish(),
            Instruction::Command(command) => f
                .debug_tuple("Command")
                .field(&command.name())
                .finish(),
        }
    }
}

/// One executable line of a script
#[derive(Debug, Clone)]
pub struct ActionNode {
    pub line_number: usize,
    pub is_commented: bool,
    pub pause_before_execution: bool,
    pub is_private: bool,
    pub is_exception_ignored: bool,
    pub instruction: Instruction,
    pub children: Vec<ActionNode>,
}

impl ActionNode {
    pub fn new(line_number: usize, instruction: Instruction) -> Self {
        Self {
            line_number,
            is_commented: false,
            pause_before_execution: false,
            is_private: false,
            is_exception_ignored: false,
            instruction,
            children: Vec::new(),
        }
    }

    pub fn display_value(&self) -> String {
        self.instruction.display_value()
    }

    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ActionNode::node_count).sum::<usize>()
    }
}
