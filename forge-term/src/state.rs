//! Run lifecycle types shared by the bridge and the controller

use std::fmt;

use serde::Serialize;

/// Lifecycle of the terminal and its current run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum RunState {
    /// Ready, nothing running
    Idle,
    /// The runtime host is still coming up
    Loading,
    Running,
    /// Suspended at an input call with this prompt
    AwaitingInput(String),
    Finished,
    /// Ended by an error with this message
    Failed(String),
}

impl RunState {
    /// A run is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, RunState::Running | RunState::AwaitingInput(_))
    }

    /// Ready for a new run
    pub fn is_settled(&self) -> bool {
        matches!(self, RunState::Idle | RunState::Finished | RunState::Failed(_))
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Loading => write!(f, "loading"),
            RunState::Running => write!(f, "running"),
            RunState::AwaitingInput(prompt) => write!(f, "awaiting input ({:?})", prompt),
            RunState::Finished => write!(f, "finished"),
            RunState::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

/// What `start` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A run is already in flight; it was left untouched
    Busy,
    /// The runtime host is not loaded
    NotReady,
}

/// Everything a UI needs to render the terminal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalSnapshot {
    pub state: RunState,
    pub prompt: String,
    pub output: Vec<String>,
    pub generation: u64,
}

impl TerminalSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Pushed to subscribers as the terminal changes
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalEvent {
    Output(String),
    AwaitingInput(String),
    StateChanged(RunState),
    Cleared,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_states() {
        assert!(RunState::Running.is_busy());
        assert!(RunState::AwaitingInput(String::new()).is_busy());
        assert!(!RunState::Loading.is_busy());
        assert!(!RunState::Loading.is_settled());
        assert!(RunState::Failed("x".into()).is_settled());
    }

    #[test]
    fn test_snapshot_json() {
        let snapshot = TerminalSnapshot {
            state: RunState::AwaitingInput("P".into()),
            prompt: "P".into(),
            output: vec!["A".into(), "P".into()],
            generation: 1,
        };
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(value["state"]["state"], "awaiting_input");
        assert_eq!(value["state"]["detail"], "P");
        assert_eq!(value["output"][1], "P");

        let idle = serde_json::to_value(RunState::Idle).unwrap();
        assert_eq!(idle["state"], "idle");
    }
}
