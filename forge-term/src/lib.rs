//! # forge-term: interactive execution bridge
//!
//! Connects a Forge script run to a terminal-style UI. The script runs on a
//! tokio task; each input call parks the run until the UI submits a line.
//!
//! ## Protocol
//!
//! ```text
//! start(source)
//!   → Running ── input("P") ──→ AwaitingInput("P")
//!                                  │ submit_line("X")
//!   ← Running ←───────────────────┘
//!   → Finished | Failed(message)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use forge_runtime::ScriptHost;
//! use forge_term::{ControllerConfig, ExecutionController, TerminalBridge};
//!
//! let controller = ExecutionController::new(
//!     Arc::new(ScriptHost::default()),
//!     TerminalBridge::default(),
//!     ControllerConfig::default(),
//! );
//! controller.boot().await;
//! controller.start("print(\"Hi\", input(\"Name? \"));");
//! controller.wait_for(|s| matches!(s, RunState::AwaitingInput(_))).await;
//! controller.submit_line("Ada");
//! controller.wait_idle().await;
//! ```

pub mod bridge;
pub mod controller;
pub mod state;

pub use bridge::{TerminalBridge, DEFAULT_ECHO_PREFIX};
pub use controller::{ControllerConfig, ExecutionController};
pub use state::{RunState, StartOutcome, TerminalEvent, TerminalSnapshot};
