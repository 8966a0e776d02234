//! Runtime host boundary

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use forge_core::config::RuntimeSettings;
use futures::future::{BoxFuture, FutureExt};

use crate::builtins::builtins;
use crate::error::{RuntimeError, RuntimeResult};
use crate::interpreter::Interpreter;
use crate::output::{discard, OutputSink};
use crate::scope::Env;
use crate::value::{lock, Value};

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Deepest call nesting before a RecursionError
    pub max_call_depth: usize,

    /// Debug mode
    pub debug: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { max_call_depth: 200, debug: false }
    }
}

impl From<&RuntimeSettings> for RuntimeConfig {
    fn from(settings: &RuntimeSettings) -> Self {
        Self { max_call_depth: settings.max_call_depth, ..Self::default() }
    }
}

/// A prepared unit; runs when polled
pub type Execution = BoxFuture<'static, RuntimeResult<()>>;

/// An embedded runtime that can execute source units
#[async_trait]
pub trait RuntimeHost: Send + Sync {
    /// Bring the runtime up; execution is refused until this succeeds
    async fn load(&self) -> RuntimeResult<()>;

    fn is_loaded(&self) -> bool;

    /// Parse `unit` and bind it to the globals and output sink installed
    /// right now. Later `set_global`/`set_output` calls do not reach it.
    fn prepare(&self, unit: &str) -> RuntimeResult<Execution>;

    /// Execute one unit to completion
    async fn execute(&self, unit: &str) -> RuntimeResult<()> {
        self.prepare(unit)?.await
    }

    /// Install a global visible to every later execution, replacing any
    /// builtin of the same name
    fn set_global(&self, name: &str, value: Value);

    /// Route program output; the sink is called synchronously per chunk
    fn set_output(&self, sink: OutputSink);
}

/// The Forge script interpreter as a [`RuntimeHost`]
pub struct ScriptHost {
    config: RuntimeConfig,
    loaded: AtomicBool,
    builtins: Mutex<HashMap<String, Value>>,
    installed: Mutex<HashMap<String, Value>>,
    output: Mutex<OutputSink>,
}

impl ScriptHost {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            loaded: AtomicBool::new(false),
            builtins: Mutex::new(HashMap::new()),
            installed: Mutex::new(HashMap::new()),
            output: Mutex::new(discard()),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Globals for one execution: builtins, then installed values on top
    fn globals(&self) -> Env {
        let globals = Env::root();
        for (name, value) in lock(&self.builtins).iter() {
            globals.define(name, value.clone());
        }
        for (name, value) in lock(&self.installed).iter() {
            globals.define(name, value.clone());
        }
        globals
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

#[async_trait]
impl RuntimeHost for ScriptHost {
    async fn load(&self) -> RuntimeResult<()> {
        let mut table = lock(&self.builtins);
        table.clear();
        table.extend(builtins().into_iter().map(|(name, value)| (name.to_string(), value)));
        self.loaded.store(true, Ordering::Release);
        tracing::debug!(builtins = table.len(), "runtime loaded");
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    fn prepare(&self, unit: &str) -> RuntimeResult<Execution> {
        if !self.is_loaded() {
            return Err(RuntimeError::NotLoaded);
        }
        if self.config.debug {
            tracing::debug!(unit, "executing unit");
        }

        let program = forge_core::parse(unit)?;
        let globals = self.globals();
        let output = lock(&self.output).clone();
        let interpreter = Interpreter::new(self.config.clone(), output);

        Ok(async move {
            let result = interpreter.run(&program, &globals).await;
            if let Err(e) = &result {
                tracing::debug!(error = %e, "execution failed");
            }
            result
        }
        .boxed())
    }

    fn set_global(&self, name: &str, value: Value) {
        lock(&self.installed).insert(name.to_string(), value);
    }

    fn set_output(&self, sink: OutputSink) {
        *lock(&self.output) = sink;
    }
}
