//! Pause, step and cancel signals shared between a running script and its host

use std::sync::Arc;
use tokio::sync::watch;

/// A single-step request made while the engine is paused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRequest {
    /// Run the next line, treating a sub-script as one line
    Over,
    /// Run the next line, pausing at the first line of a sub-script
    Into,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ControlState {
    cancelled: bool,
    paused: bool,
    step: Option<StepRequest>,
}

/// Why [`EngineControl::wait_while_paused`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Resumed,
    Stepped(StepRequest),
    Cancelled,
}

/// Cloneable handle to a running engine.
///
/// The engine checks the handle between lines. A paused engine waits on the
/// underlying watch channel, so it wakes as soon as the host calls
/// [`resume`](Self::resume), a step method or [`cancel`](Self::cancel).
/// Stepping leaves the engine paused, so it stops again on the next line.
#[derive(Debug, Clone)]
pub struct EngineControl {
    state: Arc<watch::Sender<ControlState>>,
}

impl Default for EngineControl {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineControl {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ControlState::default());
        Self {
            state: Arc::new(sender),
        }
    }

    fn snapshot(&self) -> ControlState {
        *self.state.borrow()
    }

    pub fn cancel(&self) {
        self.state.send_modify(|state| state.cancelled = true);
    }

    pub fn pause(&self) {
        self.state.send_modify(|state| state.paused = true);
    }

    pub fn resume(&self) {
        self.state.send_modify(|state| {
            state.paused = false;
            state.step = None;
        });
    }

    pub fn step_over(&self) {
        self.request_step(StepRequest::Over);
    }

    pub fn step_into(&self) {
        self.request_step(StepRequest::Into);
    }

    fn request_step(&self, step: StepRequest) {
        self.state.send_modify(|state| {
            if state.paused {
                state.step = Some(step);
            }
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.snapshot().cancelled
    }

    pub fn is_paused(&self) -> bool {
        self.snapshot().paused
    }

    /// Wait until the engine may run its next line
    pub async fn wait_while_paused(&self) -> WaitOutcome {
        let mut receiver = self.state.subscribe();
        loop {
            let state = *receiver.borrow_and_update();
            if state.cancelled {
                return WaitOutcome::Cancelled;
            }
            if !state.paused {
                return WaitOutcome::Resumed;
            }
            if let Some(step) = state.step {
                self.state.send_modify(|state| state.step = None);
                return WaitOutcome::Stepped(step);
            }
            if receiver.changed().await.is_err() {
                return WaitOutcome::Cancelled;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_not_paused_returns_immediately() {
        let control = EngineControl::new();
        assert_eq!(control.wait_while_paused().await, WaitOutcome::Resumed);
    }

    #[tokio::test]
    async fn test_resume_wakes_waiter() {
        let control = EngineControl::new();
        control.pause();
        let waiter = {
            let control = control.clone();
            tokio::spawn(async move { control.wait_while_paused().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        control.resume();
        assert_eq!(waiter.await.unwrap(), WaitOutcome::Resumed);
        assert!(!control.is_paused());
    }

    #[tokio::test]
    async fn test_step_keeps_engine_paused() {
        let control = EngineControl::new();
        control.pause();
        control.step_into();
        assert_eq!(
            control.wait_while_paused().await,
            WaitOutcome::Stepped(StepRequest::Into)
        );
        assert!(control.is_paused());
    }

    #[test]
    fn test_step_ignored_while_running() {
        let control = EngineControl::new();
        control.step_over();
        assert!(!control.is_paused());
        assert_eq!(control.snapshot().step, None);
    }

    #[tokio::test]
    async fn test_cancel_releases_pause() {
        let control = EngineControl::new();
        control.pause();
        control.cancel();
        assert_eq!(control.wait_while_paused().await, WaitOutcome::Cancelled);
        assert!(control.is_cancelled());
    }
}
