//! Finite State Machine for the workload lifecycle

use serde::{Deserialize, Serialize};

/// Workload state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Nothing of ours is running
    Stopped,

    /// Build and start issued
    Starting,

    /// Status poll saw the workload up
    Running,

    /// Start or status poll failed
    Failed,
}

impl LifecycleState {
    /// Whether the operation is over
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Running | LifecycleState::Failed)
    }
}

/// Lifecycle event
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// Build and start requested
    Start,

    /// Status poll matched the running marker
    Up,

    /// Start failed or the workload did not come up
    Fail(String),
}

/// Lifecycle FSM
#[derive(Debug, Clone)]
pub struct LifecycleFsm {
    state: LifecycleState,
    error: Option<String>,
}

impl LifecycleFsm {
    /// Create a new FSM in stopped state
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Stopped,
            error: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: LifecycleEvent) -> Result<(), String> {
        let new_state = match (self.state, &event) {
            (LifecycleState::Stopped, LifecycleEvent::Start) => LifecycleState::Starting,
            (LifecycleState::Starting, LifecycleEvent::Up) => LifecycleState::Running,
            (LifecycleState::Starting, LifecycleEvent::Fail(err)) => {
                self.error = Some(err.clone());
                LifecycleState::Failed
            }

            // Running and Failed are terminal
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for LifecycleFsm {
    fn default() -> Self {
        Self::new()
    }
}
