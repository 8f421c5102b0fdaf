//! Running a single node: pause and cancel handling, dispatch, failure policy

use super::blocks;
use super::control::{StepRequest, WaitOutcome};
use super::events::EngineEvent;
use super::host::{ErrorDecision, ErrorReport};
use super::script_error::ScriptError;
use super::session::Session;
use crate::commands::resolve_index;
use crate::error::{kind_of, BotflowError, ErrorCode};
use crate::script::{ActionNode, ErrorPolicy, Instruction, Intrinsic};
use futures::future::BoxFuture;
use std::time::Duration;
use tracing::{debug, error, warn};

/// A failure travelling up the node tree.
///
/// A `logged` failure is already in the session's error log. A `handled`
/// failure has also been through the error policy, so enclosing blocks
/// pass it on untouched.
#[derive(Debug)]
pub(crate) struct NodeError {
    pub error: anyhow::Error,
    pub logged: bool,
    pub handled: bool,
}

impl NodeError {
    pub fn logged(error: anyhow::Error) -> Self {
        Self {
            error,
            logged: true,
            handled: false,
        }
    }

    pub fn handled(error: anyhow::Error) -> Self {
        Self {
            error,
            logged: true,
            handled: true,
        }
    }
}

impl From<anyhow::Error> for NodeError {
    fn from(error: anyhow::Error) -> Self {
        Self {
            error,
            logged: false,
            handled: false,
        }
    }
}

impl From<BotflowError> for NodeError {
    fn from(error: BotflowError) -> Self {
        anyhow::Error::from(error).into()
    }
}

pub(crate) type NodeResult = std::result::Result<(), NodeError>;

const PRIVATE_DISPLAY: &str = "Can't log display value as the command contains sensitive data";

/// Run a list of sibling nodes, stopping on cancellation or a loop signal
pub(crate) async fn execute_children(session: &mut Session, nodes: &[ActionNode]) -> NodeResult {
    for node in nodes {
        if session.control.is_cancelled()
            || session.loop_exit_requested
            || session.loop_next_requested
        {
            break;
        }
        execute_node(session, node).await?;
    }
    Ok(())
}

pub(crate) fn execute_node<'a>(
    session: &'a mut Session,
    node: &'a ActionNode,
) -> BoxFuture<'a, NodeResult> {
    Box::pin(async move {
        let line = node.line_number;
        session.last_executed_line = line;
        session.events.emit(EngineEvent::LineNumberChanged(line));

        if node.pause_before_execution && session.is_interactive() && !session.child_script_failed
        {
            session.control.pause();
        }

        let mut step = None;
        if session.control.is_paused() {
            let shown = if node.is_private {
                PRIVATE_DISPLAY.to_string()
            } else {
                node.display_value()
            };
            session.report_progress(format!("Paused on Line {}: {}", line, shown));
            session.report_progress("[Please select 'Resume' when ready]");
            match session.control.wait_while_paused().await {
                WaitOutcome::Cancelled => return Ok(()),
                WaitOutcome::Stepped(request) => step = Some(request),
                WaitOutcome::Resumed => {}
            }
        }

        if session.control.is_cancelled() {
            return Ok(());
        }

        if session.child_script_failed && !session.child_script_error_caught {
            return Err(NodeError::handled(
                BotflowError::child_script("A sub-script failed and the error was not caught")
                    .into(),
            ));
        }

        if node.is_commented || matches!(node.instruction, Instruction::Comment(_)) {
            let shown = if node.is_private {
                PRIVATE_DISPLAY.to_string()
            } else {
                let display = node.display_value();
                let resolved = session.resolve(&display).unwrap_or(display);
                session.mask_secrets(&resolved)
            };
            session.report_progress(format!("Skipping Line {}: {}", line, shown));
            return Ok(());
        }

        if node.is_private {
            session.report_progress(format!("Running Line {}: {}", line, PRIVATE_DISPLAY));
        } else {
            session.report_progress(format!("Running Line {}: {}", line, node.display_value()));
        }

        let outcome = match &node.instruction {
            Instruction::Block(block) => blocks::run_block(session, node, block, step).await,
            Instruction::Intrinsic(intrinsic) => run_intrinsic(session, intrinsic),
            Instruction::Command(command) => {
                throttle(session).await;
                command.run(session).await.map_err(NodeError::from)
            }
            Instruction::Marker(_) | Instruction::Comment(_) => Ok(()),
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(failure) if failure.handled => Err(failure),
            Err(failure) => handle_failure(session, node, failure, step).await,
        }
    })
}

async fn throttle(session: &Session) {
    let delay = session.settings.delay_between_commands_ms;
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

fn run_intrinsic(session: &mut Session, intrinsic: &Intrinsic) -> NodeResult {
    match intrinsic {
        Intrinsic::StopTask => {
            session.report_progress("Stopping Task");
            session.control.cancel();
        }
        Intrinsic::ExitLoop => session.loop_exit_requested = true,
        Intrinsic::NextLoop => session.loop_next_requested = true,
        Intrinsic::SetEngineDelay(delay) => {
            let millis = resolve_index(session, delay, "Engine delay")?;
            session.settings.delay_between_commands_ms = millis as u64;
        }
        Intrinsic::Rethrow => {
            let error = match session.latest_error() {
                Some(latest) => BotflowError::domain_with_code(
                    ErrorCode::DOMAIN_RETHROWN,
                    latest.message.clone(),
                    None,
                ),
                None => BotflowError::domain("No error to rethrow"),
            };
            return Err(error.into());
        }
        Intrinsic::SetErrorHandling(policy) => {
            debug!("Error handling set to {}", policy);
            session.error_policy = *policy;
        }
    }
    Ok(())
}

async fn handle_failure(
    session: &mut Session,
    node: &ActionNode,
    failure: NodeError,
    step: Option<StepRequest>,
) -> NodeResult {
    let line = node.line_number;
    let error = failure.error;
    let is_rethrow = matches!(node.instruction, Instruction::Intrinsic(Intrinsic::Rethrow));
    if !failure.logged && !is_rethrow {
        if session.child_script_failed {
            session.errors.clear();
            session.child_script_failed = false;
            session.child_script_error_caught = false;
        }
        let entry = ScriptError::from_error(&error, line, session.file_name.clone());
        error!(
            target: "botflow::engine",
            line = line,
            kind = %entry.error_kind,
            "{}",
            entry.message
        );
        session.errors.push(entry);
    }

    // Errors inside try/retry belong to the block, not to the policy.
    if session.try_depth > 0 {
        return Err(NodeError::logged(error));
    }

    match session.error_policy {
        ErrorPolicy::ContinueProcessing => {
            warn!(target: "botflow::engine", "Continuing after error on line {}", line);
            session.report_progress(format!(
                "Error Occured at Line {}: {} (Continue Processing)",
                line, error
            ));
            Ok(())
        }
        ErrorPolicy::StopProcessing => Err(NodeError::handled(error)),
        ErrorPolicy::Unset => {
            let ignorable = node.instruction.is_block() || node.is_exception_ignored;
            if !session.is_interactive() || ignorable {
                return Err(NodeError::handled(error));
            }
            let report = ErrorReport {
                line_number: line,
                command: node.instruction.name().to_string(),
                error_kind: kind_of(&error).to_string(),
                message: error.to_string(),
                file_name: session.file_name.clone(),
            };
            let host = session.host.clone();
            match host.on_unhandled_error(&report).await {
                ErrorDecision::IgnoreAndResume => {
                    session.errors.clear();
                    session.report_progress(format!("Ignoring Error at Line {}", line));
                    if step.is_some() {
                        session.control.pause();
                    }
                    Ok(())
                }
                ErrorDecision::Abort => Err(NodeError::handled(error)),
            }
        }
    }
}
