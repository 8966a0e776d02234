//! # forge-runtime: embedded interpreter for Forge script
//!
//! Executes rewritten units on an async tree-walking interpreter. A run
//! parks at every awaited input request and resumes when the line arrives.
//!
//! ## Execution flow
//!
//! ```text
//! Rewritten unit (forge-core)
//!      ↓ parse
//! AST
//!      ↓ ScriptHost::execute
//! Interpreter ──→ OutputSink (one call per chunk)
//!      ↓ await input(..)
//! Pending value ←── oneshot sender held by the terminal
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use forge_runtime::{RuntimeConfig, RuntimeHost, ScriptHost};
//!
//! let host = ScriptHost::new(RuntimeConfig::default());
//! host.load().await?;
//! host.execute("print(\"hello\");").await?;
//! ```

pub mod builtins;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod ops;
pub mod output;
pub mod scope;
pub mod value;

pub use error::{RuntimeError, RuntimeResult};
pub use host::{Execution, RuntimeConfig, RuntimeHost, ScriptHost};
pub use interpreter::Interpreter;
pub use output::{NativeContext, OutputSink, OutputStream};
pub use value::Value;
