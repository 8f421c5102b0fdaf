//! Script definitions as written on disk and their compilation into nodes

use super::node::{
    ActionNode, BlockCommand, Condition, ErrorPolicy, Instruction, Intrinsic, Marker, MatchMode,
};
use super::Element;
use crate::commands::CommandRegistry;
use crate::error::{BotflowError, ErrorCode, Result};
use crate::variables::Variable;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Top-level script document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptDefinition {
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub commands: Vec<ActionDefinition>,
}

/// One command as written in a script file.
///
/// Keys other than the structural ones below are the command's properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    #[serde(default)]
    pub commented: bool,
    #[serde(default)]
    pub pause_before_execution: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub exception_ignored: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ActionDefinition>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// Assign line numbers depth-first to nodes that have none.
///
/// Explicit numbers must strictly increase in depth-first order.
pub fn assign_line_numbers(commands: &mut [ActionDefinition]) -> Result<()> {
    fn walk(commands: &mut [ActionDefinition], last: &mut usize) -> Result<()> {
        for command in commands {
            match command.line_number {
                Some(line) if line <= *last => {
                    return Err(BotflowError::script_with_code(
                        ErrorCode::SCRIPT_LINE_ORDER,
                        format!(
                            "Line number {} must be greater than the previous line {}",
                            line, last
                        ),
                        Some(line),
                    ))
                }
                Some(line) => *last = line,
                None => {
                    *last += 1;
                    command.line_number = Some(*last);
                }
            }
            walk(&mut command.children, last)?;
        }
        Ok(())
    }

    let mut last = 0;
    walk(commands, &mut last)
}

/// Numbers are accepted wherever text is expected
fn normalize(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect()),
        other => other,
    }
}

/// Deserialize a command's properties into a typed struct
pub fn parse_properties<T: DeserializeOwned>(
    command: &str,
    properties: &Map<String, Value>,
) -> Result<T> {
    let value = normalize(Value::Object(properties.clone()));
    serde_json::from_value(value).map_err(|e| {
        BotflowError::script_with_code(
            ErrorCode::SCRIPT_INVALID_PROPERTIES,
            format!("Invalid properties for '{}': {}", command, e),
            None,
        )
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConditionDef {
    Expression(String),
    Full(Condition),
}

impl From<ConditionDef> for Condition {
    fn from(def: ConditionDef) -> Self {
        match def {
            ConditionDef::Expression(expression) => Condition::Expression { expression },
            ConditionDef::Full(condition) => condition,
        }
    }
}

#[derive(Deserialize)]
struct LoopTimesProps {
    times: String,
}

#[derive(Deserialize)]
struct ConditionProps {
    condition: ConditionDef,
}

#[derive(Deserialize)]
struct LoopCollectionProps {
    collection: String,
    output: String,
}

#[derive(Deserialize)]
struct MultiIfProps {
    conditions: Vec<ConditionDef>,
    #[serde(default)]
    mode: MatchMode,
}

fn default_attempts() -> String {
    "3".to_string()
}

fn default_retry_delay() -> String {
    "0".to_string()
}

#[derive(Deserialize)]
struct RetryProps {
    #[serde(default = "default_attempts")]
    attempts: String,
    #[serde(default = "default_retry_delay")]
    delay_ms: String,
    #[serde(default)]
    condition: Option<ConditionDef>,
}

#[derive(Deserialize)]
struct SwitchProps {
    value: String,
}

#[derive(Deserialize)]
struct RunScriptProps {
    path: String,
    #[serde(default)]
    pass_variables: bool,
    #[serde(default)]
    variables: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct CaseProps {
    value: String,
}

#[derive(Deserialize)]
struct CommentProps {
    #[serde(default)]
    comment: String,
}

#[derive(Deserialize)]
struct DelayProps {
    delay: String,
}

#[derive(Deserialize)]
struct ErrorHandlingProps {
    #[serde(default)]
    action: String,
}

fn instruction_for(def: &ActionDefinition, registry: &CommandRegistry) -> Result<Instruction> {
    let name = def.command.as_str();
    let props = &def.properties;
    let instruction = match name {
        "comment" => {
            Instruction::Comment(parse_properties::<CommentProps>(name, props)?.comment)
        }
        "loop_times" => Instruction::Block(BlockCommand::LoopTimes {
            times: parse_properties::<LoopTimesProps>(name, props)?.times,
        }),
        "loop_while" => Instruction::Block(BlockCommand::LoopWhile {
            condition: parse_properties::<ConditionProps>(name, props)?
                .condition
                .into(),
        }),
        "loop_collection" => {
            let p: LoopCollectionProps = parse_properties(name, props)?;
            Instruction::Block(BlockCommand::LoopCollection {
                collection: p.collection,
                output: p.output,
            })
        }
        "if" => Instruction::Block(BlockCommand::If {
            condition: parse_properties::<ConditionProps>(name, props)?
                .condition
                .into(),
        }),
        "multi_if" => {
            let p: MultiIfProps = parse_properties(name, props)?;
            Instruction::Block(BlockCommand::MultiIf {
                conditions: p.conditions.into_iter().map(Condition::from).collect(),
                mode: p.mode,
            })
        }
        "try" => Instruction::Block(BlockCommand::Try),
        "retry" => {
            let p: RetryProps = parse_properties(name, props)?;
            Instruction::Block(BlockCommand::Retry {
                attempts: p.attempts,
                delay_ms: p.delay_ms,
                condition: p.condition.map(Condition::from),
            })
        }
        "switch" => Instruction::Block(BlockCommand::Switch {
            value: parse_properties::<SwitchProps>(name, props)?.value,
        }),
        "sequence" => Instruction::Block(BlockCommand::Sequence),
        "run_script" => {
            let p: RunScriptProps = parse_properties(name, props)?;
            Instruction::Block(BlockCommand::RunScript {
                path: p.path,
                pass_variables: p.pass_variables,
                variables: p.variables,
            })
        }
        "else" => Instruction::Marker(Marker::Else),
        "catch" => Instruction::Marker(Marker::Catch),
        "finally" => Instruction::Marker(Marker::Finally),
        "case" => Instruction::Marker(Marker::Case(
            parse_properties::<CaseProps>(name, props)?.value,
        )),
        "default_case" => Instruction::Marker(Marker::DefaultCase),
        "stop_task" => Instruction::Intrinsic(Intrinsic::StopTask),
        "exit_loop" => Instruction::Intrinsic(Intrinsic::ExitLoop),
        "next_loop" => Instruction::Intrinsic(Intrinsic::NextLoop),
        "set_engine_delay" => Instruction::Intrinsic(Intrinsic::SetEngineDelay(
            parse_properties::<DelayProps>(name, props)?.delay,
        )),
        "rethrow" => Instruction::Intrinsic(Intrinsic::Rethrow),
        "error_handling" => {
            let action = parse_properties::<ErrorHandlingProps>(name, props)?.action;
            let policy = ErrorPolicy::parse(&action).ok_or_else(|| {
                BotflowError::script_with_code(
                    ErrorCode::SCRIPT_INVALID_PROPERTIES,
                    format!("Unknown error handling action '{}'", action),
                    None,
                )
            })?;
            Instruction::Intrinsic(Intrinsic::SetErrorHandling(policy))
        }
        _ => Instruction::Command(registry.create(name, props)?),
    };
    Ok(instruction)
}

fn compile_node(
    def: &ActionDefinition,
    parent: Option<&BlockCommand>,
    registry: &CommandRegistry,
) -> Result<ActionNode> {
    let line_number = def.line_number.unwrap_or_default();
    let instruction = instruction_for(def, registry).map_err(|e| e.with_line(line_number))?;

    if let Some(marker) = instruction.marker() {
        if !parent.is_some_and(|block| block.accepts(marker)) {
            return Err(BotflowError::script_with_code(
                ErrorCode::SCRIPT_MISPLACED_MARKER,
                format!(
                    "'{}' is only valid directly inside its owning block",
                    marker.name()
                ),
                Some(line_number),
            ));
        }
    }

    let block = match &instruction {
        Instruction::Block(block) => Some(block),
        _ => None,
    };
    if block.is_none() && !def.children.is_empty() {
        return Err(BotflowError::script_with_code(
            ErrorCode::SCRIPT_INVALID_PROPERTIES,
            format!("'{}' cannot contain child commands", def.command),
            Some(line_number),
        ));
    }

    let children = def
        .children
        .iter()
        .map(|child| compile_node(child, block, registry))
        .collect::<Result<Vec<_>>>()?;

    Ok(ActionNode {
        line_number,
        is_commented: def.commented,
        pause_before_execution: def.pause_before_execution,
        is_private: def.private,
        is_exception_ignored: def.exception_ignored,
        instruction,
        children,
    })
}

/// Number lines, then compile every definition into an [`ActionNode`]
pub fn compile(
    mut commands: Vec<ActionDefinition>,
    registry: &CommandRegistry,
) -> Result<Vec<ActionNode>> {
    assign_line_numbers(&mut commands)?;
    commands
        .iter()
        .map(|def| compile_node(def, None, registry))
        .collect()
}
