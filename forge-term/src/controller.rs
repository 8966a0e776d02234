//! Execution controller
//!
//! Owns the runtime host and drives one run at a time through the bridge:
//! install the suspendable input primitive, rewrite, execute, report.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use forge_core::config::ForgeConfig;
use forge_core::rewriter::{rewrite, RewriteConfig, RewriteResult};
use forge_runtime::{OutputStream, RuntimeHost, Value};
use futures::FutureExt;

use crate::bridge::TerminalBridge;
use crate::state::{RunState, StartOutcome};

/// First chunks of the boot sequence
pub const LOADING_MESSAGE: &str = "Loading runtime…";
pub const READY_MESSAGE: &str = "Runtime ready.";

#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    /// Appended as the first chunk of every run
    pub banner: Option<String>,

    pub rewrite: RewriteConfig,
}

impl ControllerConfig {
    /// Settings from forge.toml; `script_name` fills the banner when enabled
    pub fn from_forge(config: &ForgeConfig, script_name: &str) -> Self {
        Self {
            banner: config.terminal.banner.then(|| format!("$ forge run {}", script_name)),
            rewrite: config.rewrite.clone(),
        }
    }
}

pub struct ExecutionController {
    host: Arc<dyn RuntimeHost>,
    bridge: TerminalBridge,
    config: ControllerConfig,
}

impl ExecutionController {
    pub fn new(host: Arc<dyn RuntimeHost>, bridge: TerminalBridge, config: ControllerConfig) -> Self {
        Self { host, bridge, config }
    }

    pub fn bridge(&self) -> &TerminalBridge {
        &self.bridge
    }

    pub fn host(&self) -> &Arc<dyn RuntimeHost> {
        &self.host
    }

    /// Load the runtime host, moving the terminal out of `Loading`
    pub async fn boot(&self) -> bool {
        self.bridge.append_output(LOADING_MESSAGE);
        match self.host.load().await {
            Ok(()) => {
                self.bridge.append_output(READY_MESSAGE);
                self.bridge.finish_loading(Ok(()));
                tracing::info!("runtime ready");
                true
            }
            Err(e) => {
                let message = format!("Failed to load runtime: {}", e);
                self.bridge.append_output(&message);
                self.bridge.finish_loading(Err(message));
                tracing::error!(error = %e, "runtime failed to load");
                false
            }
        }
    }

    /// Start running `source`
    ///
    /// Returns as soon as the run is spawned; must be called from within a
    /// tokio runtime. A run already in flight is left untouched.
    pub fn start(&self, source: &str) -> StartOutcome {
        if !self.host.is_loaded() {
            return StartOutcome::NotReady;
        }
        let generation = match self.bridge.begin_run() {
            Ok(generation) => generation,
            Err(outcome) => {
                tracing::debug!(?outcome, "start rejected");
                return outcome;
            }
        };

        if let Some(banner) = &self.config.banner {
            self.bridge.append_output_for(generation, banner);
        }
        self.install(generation);

        let unit = match rewrite(source, &self.config.rewrite) {
            RewriteResult::Ok(unit) => {
                tracing::debug!(generation, suspension_points = unit.suspension_points, "rewrote script");
                unit.source
            }
            failed @ RewriteResult::Failed(_) => {
                tracing::warn!(generation, "rewrite failed; running fallback unit");
                failed.into_unit()
            }
        };

        // Bind the unit to this run's sink and primitive before anything
        // else can replace them
        let execution = match self.host.prepare(&unit) {
            Ok(execution) => execution,
            Err(e) => {
                finish(&self.bridge, generation, Err(e.to_string()));
                return StartOutcome::Started;
            }
        };

        let bridge = self.bridge.clone();
        tokio::spawn(async move {
            let result = match AssertUnwindSafe(execution).catch_unwind().await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(panic) => {
                    let message = format!("InternalError: {}", panic_message(panic.as_ref()));
                    tracing::error!(generation, %message, "run panicked");
                    Err(message)
                }
            };
            finish(&bridge, generation, result);
        });
        StartOutcome::Started
    }

    /// Route output to the bridge and replace the input primitive, both
    /// bound to run `generation`
    fn install(&self, generation: u64) {
        let bridge = self.bridge.clone();
        self.host.set_output(Arc::new(move |_stream: OutputStream, chunk: &str| {
            bridge.append_output_for(generation, chunk);
        }));

        let bridge = self.bridge.clone();
        let primitive = self.config.rewrite.primitive.clone();
        let name = primitive.clone();
        self.host.set_global(
            &primitive,
            Value::native(&name, move |_, args| {
                let prompt = match args.first() {
                    Some(Value::None) | None => String::new(),
                    Some(value) => value.to_string(),
                };
                Ok(Value::pending(bridge.request_input(generation, &prompt)))
            }),
        );
    }

    /// Resolve the pending input request; see [`TerminalBridge::submit_line`]
    pub fn submit_line(&self, line: &str) -> bool {
        self.bridge.submit_line(line)
    }

    /// See [`TerminalBridge::clear`]
    pub fn clear(&self) {
        self.bridge.clear()
    }

    pub fn state(&self) -> RunState {
        self.bridge.state()
    }

    /// Wait until the state satisfies `predicate`, returning that state
    pub async fn wait_for<F>(&self, mut predicate: F) -> RunState
    where
        F: FnMut(&RunState) -> bool,
    {
        let mut states = self.bridge.watch_state();
        match states.wait_for(|state| predicate(state)).await {
            Ok(state) => state.clone(),
            Err(_) => self.bridge.state(),
        }
    }

    /// Wait until no run is in flight
    pub async fn wait_idle(&self) -> RunState {
        self.wait_for(|state| !state.is_busy() && *state != RunState::Loading).await
    }
}

fn finish(bridge: &TerminalBridge, generation: u64, result: Result<(), String>) {
    if let Err(message) = &result {
        tracing::debug!(generation, %message, "run failed");
    }
    if !bridge.finish_run(generation, result) {
        tracing::debug!(generation, "detached run ended");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    match (payload.downcast_ref::<&str>(), payload.downcast_ref::<String>()) {
        (Some(message), _) => *message,
        (None, Some(message)) => message.as_str(),
        (None, None) => "the runtime panicked",
    }
}
