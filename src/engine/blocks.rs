//! Loops, branches, try/catch, retry, switch and sub-scripts

use super::conditions;
use super::control::StepRequest;
use super::dispatch::{execute_children, NodeError, NodeResult};
use super::events::ScriptResult;
use super::session::Session;
use super::Engine;
use crate::commands::resolve_index;
use crate::error::{BotflowError, ErrorCode, Result};
use crate::resolver;
use crate::script::{ActionNode, BlockCommand, Condition, Marker, ScriptSource};
use crate::variables::{Variable, VariableValue};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub(crate) async fn run_block(
    session: &mut Session,
    node: &ActionNode,
    block: &BlockCommand,
    step: Option<StepRequest>,
) -> NodeResult {
    let children = node.children.as_slice();
    match block {
        BlockCommand::LoopTimes { times } => {
            let times = resolve_index(session, times, "Loop count")?;
            for _ in 0..times {
                if session.control.is_cancelled() {
                    break;
                }
                execute_children(session, children).await?;
                if take_loop_signal(session) {
                    break;
                }
            }
            Ok(())
        }
        BlockCommand::LoopWhile { condition } => loop_while(session, condition, children).await,
        BlockCommand::LoopCollection { collection, output } => {
            let items = collection_items(session, collection)?;
            for item in items {
                if session.control.is_cancelled() {
                    break;
                }
                session.store(item, output)?;
                execute_children(session, children).await?;
                if take_loop_signal(session) {
                    break;
                }
            }
            Ok(())
        }
        BlockCommand::If { condition } => {
            let holds = conditions::evaluate(condition, session)?;
            run_branch(session, children, holds).await
        }
        BlockCommand::MultiIf { conditions, mode } => {
            let holds = conditions::evaluate_all(conditions, *mode, session)?;
            run_branch(session, children, holds).await
        }
        BlockCommand::Try => run_try(session, children).await,
        BlockCommand::Retry {
            attempts,
            delay_ms,
            condition,
        } => run_retry(session, node, attempts, delay_ms, condition.as_ref()).await,
        BlockCommand::Switch { value } => {
            let value = session.resolve(value)?;
            let mut chosen = None;
            let mut fallback = None;
            for (marker, body) in sections(children) {
                match marker {
                    Some(Marker::Case(case)) if chosen.is_none() => {
                        if session.resolve(case)? == value {
                            chosen = Some(body);
                        }
                    }
                    Some(Marker::DefaultCase) => fallback = Some(body),
                    _ => {}
                }
            }
            match chosen.or(fallback) {
                Some(body) => execute_children(session, body).await,
                None => Ok(()),
            }
        }
        BlockCommand::Sequence => execute_children(session, children).await,
        BlockCommand::RunScript {
            path,
            pass_variables,
            variables,
        } => run_script(session, path, *pass_variables, variables, step).await,
    }
}

/// Consume pending loop signals; `true` means the loop should end
fn take_loop_signal(session: &mut Session) -> bool {
    let exit = session.loop_exit_requested;
    session.loop_exit_requested = false;
    session.loop_next_requested = false;
    exit
}

/// Split children at section markers. The first section has no marker.
fn sections(children: &[ActionNode]) -> Vec<(Option<&Marker>, &[ActionNode])> {
    let mut found = Vec::new();
    let mut marker = None;
    let mut start = 0;
    for (index, child) in children.iter().enumerate() {
        if child.is_commented {
            continue;
        }
        if let Some(next) = child.instruction.marker() {
            found.push((marker, &children[start..index]));
            marker = Some(next);
            start = index + 1;
        }
    }
    found.push((marker, &children[start..]));
    found
}

fn section<'a>(children: &'a [ActionNode], wanted: &Marker) -> Option<&'a [ActionNode]> {
    sections(children)
        .into_iter()
        .find(|(marker, _)| *marker == Some(wanted))
        .map(|(_, body)| body)
}

async fn run_branch(session: &mut Session, children: &[ActionNode], holds: bool) -> NodeResult {
    let (then_part, else_part) = match sections(children).first() {
        Some((None, body)) => (*body, section(children, &Marker::Else)),
        _ => (children, None),
    };
    if holds {
        execute_children(session, then_part).await
    } else if let Some(body) = else_part {
        execute_children(session, body).await
    } else {
        Ok(())
    }
}

async fn loop_while(session: &mut Session, condition: &Condition, children: &[ActionNode]) -> NodeResult {
    let limit = session.settings.max_loop_iterations;
    let mut iterations = 0usize;
    while !session.control.is_cancelled() && conditions::evaluate(condition, session)? {
        if iterations >= limit {
            return Err(BotflowError::range_with_code(
                ErrorCode::RANGE_LOOP_LIMIT,
                format!("Loop exceeded {} iterations", limit),
            )
            .into());
        }
        iterations += 1;
        execute_children(session, children).await?;
        if take_loop_signal(session) {
            break;
        }
    }
    Ok(())
}

/// Items a `loop_collection` walks over
fn collection_items(session: &mut Session, collection: &str) -> Result<Vec<VariableValue>> {
    let variable = resolver::require(collection, session)?;
    let name = variable.name.clone();
    let items = match variable.value.clone() {
        VariableValue::List(items) => items,
        VariableValue::Table(table) => table.rows().map(VariableValue::Row).collect(),
        VariableValue::Dictionary(map) => map.into_values().map(VariableValue::Text).collect(),
        VariableValue::Row(row) => row.values.into_iter().map(VariableValue::Text).collect(),
        VariableValue::Text(text) => match serde_json::from_str::<Value>(&text) {
            Ok(array @ Value::Array(_)) => {
                let converted = VariableValue::from_json(array);
                session.variables.set(&name, converted.clone());
                match converted {
                    VariableValue::List(items) => items,
                    other => vec![other],
                }
            }
            _ => {
                return Err(BotflowError::domain_with_code(
                    ErrorCode::DOMAIN_UNSUPPORTED_TYPE,
                    format!("'{}' is not a collection", name),
                    Some("loop_collection".to_string()),
                ))
            }
        },
    };
    Ok(items)
}

fn take_signals(session: &mut Session) -> (bool, bool) {
    let signals = (session.loop_exit_requested, session.loop_next_requested);
    session.loop_exit_requested = false;
    session.loop_next_requested = false;
    signals
}

async fn run_try(session: &mut Session, children: &[ActionNode]) -> NodeResult {
    let body = match sections(children).first() {
        Some((None, body)) => *body,
        _ => children,
    };
    let catch = section(children, &Marker::Catch);
    let finally = section(children, &Marker::Finally);

    session.try_depth += 1;
    let body_result = execute_children(session, body).await;
    session.try_depth -= 1;

    // Loop signals raised in the body apply after catch and finally have run.
    let (exit, next) = take_signals(session);

    let uncaught_child = session.child_script_failed && !session.child_script_error_caught;
    let mut outcome = Ok(());
    if body_result.is_err() || uncaught_child {
        if session.child_script_failed {
            session.child_script_error_caught = true;
        }
        match (catch, body_result) {
            (Some(catch), Err(failure)) => {
                debug!("Caught error: {}", failure.error);
                outcome = execute_children(session, catch).await;
            }
            (Some(catch), Ok(())) => outcome = execute_children(session, catch).await,
            (None, result) => outcome = result,
        }
    }

    let (catch_exit, catch_next) = take_signals(session);
    let finally_result = match finally {
        Some(finally) => execute_children(session, finally).await,
        None => Ok(()),
    };
    session.loop_exit_requested |= exit || catch_exit;
    session.loop_next_requested |= next || catch_next;

    outcome?;
    finally_result
}

async fn run_retry(
    session: &mut Session,
    node: &ActionNode,
    attempts: &str,
    delay_ms: &str,
    condition: Option<&Condition>,
) -> NodeResult {
    let attempts = resolve_index(session, attempts, "Retry attempts")?.max(1);
    let delay = resolve_index(session, delay_ms, "Retry delay")? as u64;

    let mut attempt = 1;
    loop {
        session.try_depth += 1;
        let result = execute_children(session, &node.children).await;
        session.try_depth -= 1;

        let failure = match result {
            Ok(()) => match condition {
                Some(condition) if !conditions::evaluate(condition, session)? => {
                    NodeError::from(BotflowError::domain(format!(
                        "Retry condition ({}) was not met",
                        condition
                    )))
                }
                _ => return Ok(()),
            },
            Err(failure) => failure,
        };

        if attempt >= attempts || session.control.is_cancelled() {
            return Err(failure);
        }
        session.report_progress(format!(
            "Retrying Line {}: attempt {} of {} failed",
            node.line_number, attempt, attempts
        ));
        session.child_script_failed = false;
        session.child_script_error_caught = false;
        attempt += 1;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

async fn run_script(
    session: &mut Session,
    path: &str,
    pass_variables: bool,
    variables: &BTreeMap<String, String>,
    step: Option<StepRequest>,
) -> NodeResult {
    let resolved = session.resolve(path)?;
    let mut script_path = PathBuf::from(&resolved);
    if script_path.is_relative() {
        if let Some(dir) = session.file_name.as_ref().and_then(|f| f.parent()) {
            script_path = dir.join(script_path);
        }
    }

    let mut inherited: Vec<Variable> = if pass_variables {
        session.variables.iter().cloned().collect()
    } else {
        Vec::new()
    };
    for (name, value) in variables {
        let name = resolver::braced_name(name).unwrap_or(name).to_string();
        let value = session.resolve(value)?;
        inherited.retain(|v| v.name != name);
        inherited.push(Variable::new(name, value));
    }

    // Step-into keeps the engine paused so the sub-script stops on its first line.
    let step_over = step == Some(StepRequest::Over);
    if step_over {
        session.control.resume();
    }

    let outcome = Engine::child_of(session)
        .with_variables(inherited)
        .run(ScriptSource::File(script_path.clone()))
        .await;

    if step_over && !session.control.is_cancelled() {
        session.control.pause();
    }

    if pass_variables {
        let returned: Vec<Variable> = outcome.variables.into_iter().collect();
        session.variables.merge_overrides(&returned);
    }

    if outcome.finished.result != ScriptResult::Errored {
        return Ok(());
    }

    let message = outcome
        .finished
        .error
        .unwrap_or_else(|| "Sub-script failed".to_string());
    session.errors.extend(outcome.errors);
    session.child_script_failed = true;
    session.child_script_error_caught = false;
    Err(NodeError::logged(
        BotflowError::child_script_at(&script_path, message).into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{Instruction, Intrinsic};

    fn node(instruction: Instruction) -> ActionNode {
        ActionNode::new(1, instruction)
    }

    #[test]
    fn test_sections_split_on_markers() {
        let children = vec![
            node(Instruction::Comment("a".into())),
            node(Instruction::Marker(Marker::Catch)),
            node(Instruction::Comment("b".into())),
            node(Instruction::Comment("c".into())),
            node(Instruction::Marker(Marker::Finally)),
        ];
        let split = sections(&children);
        assert_eq!(split.len(), 3);
        assert_eq!(split[0].0, None);
        assert_eq!(split[0].1.len(), 1);
        assert_eq!(split[1].0, Some(&Marker::Catch));
        assert_eq!(split[1].1.len(), 2);
        assert!(split[2].1.is_empty());
        assert_eq!(section(&children, &Marker::Finally).map(|s| s.len()), Some(0));
        assert!(section(&children, &Marker::Else).is_none());
    }

    #[test]
    fn test_commented_marker_does_not_split() {
        let mut else_node = node(Instruction::Marker(Marker::Else));
        else_node.is_commented = true;
        let children = vec![node(Instruction::Intrinsic(Intrinsic::ExitLoop)), else_node];
        assert_eq!(sections(&children).len(), 1);
    }

    #[test]
    fn test_collection_items_from_json_text() {
        let mut session = Session::new(crate::config::EngineSettings::default());
        session.variables.set("vJson", r#"["a","b"]"#.into());
        let items = collection_items(&mut session, "{vJson}").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            session.variables.get("vJson").unwrap().value,
            VariableValue::list(["a", "b"])
        );

        session.variables.set("vPlain", "hello".into());
        let err = collection_items(&mut session, "{vPlain}").unwrap_err();
        assert_eq!(err.code(), ErrorCode::DOMAIN_UNSUPPORTED_TYPE);
    }
}
