//! Terminal bridge
//!
//! The UI-facing half of the suspend/resume protocol. It owns the output
//! log and the single pending input slot, and it is the only place the run
//! state changes.
//!
//! Every run gets a generation number. Output, input requests and
//! completions tagged with an older generation belong to a detached run and
//! are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, oneshot, watch};

use crate::state::{RunState, StartOutcome, TerminalEvent, TerminalSnapshot};

/// Default prefix of the echo chunk written after a submitted line
pub const DEFAULT_ECHO_PREFIX: &str = "›";

const EVENT_CAPACITY: usize = 1024;

/// The one outstanding suspension point
struct PendingInput {
    prompt: String,
    responder: oneshot::Sender<String>,
}

struct Session {
    state: RunState,
    output: Vec<String>,
    prompt: String,
    pending: Option<PendingInput>,
    generation: u64,
}

struct Inner {
    session: Mutex<Session>,
    events: broadcast::Sender<TerminalEvent>,
    state: watch::Sender<RunState>,
    echo_prefix: String,
}

/// Cheaply cloneable handle to one terminal
#[derive(Clone)]
pub struct TerminalBridge {
    inner: Arc<Inner>,
}

impl Default for TerminalBridge {
    fn default() -> Self {
        Self::new(DEFAULT_ECHO_PREFIX)
    }
}

impl TerminalBridge {
    /// A terminal waiting for its runtime to load
    pub fn new(echo_prefix: &str) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (state, _) = watch::channel(RunState::Loading);
        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(Session {
                    state: RunState::Loading,
                    output: Vec::new(),
                    prompt: String::new(),
                    pending: None,
                    generation: 0,
                }),
                events,
                state,
                echo_prefix: echo_prefix.to_string(),
            }),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.inner.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: TerminalEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    /// Change state; the caller holds the session lock so events stay ordered
    fn transition(&self, session: &mut Session, state: RunState) {
        if session.state == state {
            return;
        }
        tracing::debug!(from = %session.state, to = %state, "run state");
        session.state = state.clone();
        self.inner.state.send_replace(state.clone());
        self.emit(TerminalEvent::StateChanged(state));
    }

    fn push_chunk(&self, session: &mut Session, chunk: &str) {
        session.output.push(chunk.to_string());
        self.emit(TerminalEvent::Output(chunk.to_string()));
    }

    // ===== Queries =====

    pub fn state(&self) -> RunState {
        self.session().state.clone()
    }

    pub fn prompt(&self) -> String {
        self.session().prompt.clone()
    }

    pub fn output(&self) -> Vec<String> {
        self.session().output.clone()
    }

    pub fn generation(&self) -> u64 {
        self.session().generation
    }

    pub fn is_awaiting_input(&self) -> bool {
        self.session().pending.is_some()
    }

    pub fn echo_prefix(&self) -> &str {
        &self.inner.echo_prefix
    }

    pub fn snapshot(&self) -> TerminalSnapshot {
        let session = self.session();
        TerminalSnapshot {
            state: session.state.clone(),
            prompt: session.prompt.clone(),
            output: session.output.clone(),
            generation: session.generation,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TerminalEvent> {
        self.inner.events.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<RunState> {
        self.inner.state.subscribe()
    }

    // ===== Protocol =====

    /// Append a chunk to the log of whatever run is attached
    pub fn append_output(&self, chunk: &str) {
        let mut session = self.session();
        self.push_chunk(&mut session, chunk);
    }

    /// Append a chunk produced by run `generation`; stale chunks are dropped
    pub fn append_output_for(&self, generation: u64, chunk: &str) -> bool {
        let mut session = self.session();
        if session.generation != generation {
            return false;
        }
        self.push_chunk(&mut session, chunk);
        true
    }

    /// Record the prompt and arm the terminal to accept one line
    ///
    /// A request that is somehow still pending is dropped, which cancels it.
    pub fn notify_awaiting_input(&self, prompt: &str, responder: oneshot::Sender<String>) {
        let mut session = self.session();
        self.arm(&mut session, prompt, responder);
    }

    fn arm(&self, session: &mut Session, prompt: &str, responder: oneshot::Sender<String>) {
        if session.pending.is_some() {
            tracing::warn!("replacing an unanswered input request");
        }
        session.pending = Some(PendingInput { prompt: prompt.to_string(), responder });
        session.prompt = prompt.to_string();
        self.transition(session, RunState::AwaitingInput(prompt.to_string()));
        self.emit(TerminalEvent::AwaitingInput(prompt.to_string()));
    }

    /// The body of the installed input primitive for run `generation`
    ///
    /// Renders a non-empty prompt as a chunk, moves to `AwaitingInput`, and
    /// returns the receiving end of the resumption handle. For a detached
    /// run the handle is dropped at once, so awaiting it raises
    /// `InputCancelled`.
    pub fn request_input(&self, generation: u64, prompt: &str) -> oneshot::Receiver<String> {
        let (responder, receiver) = oneshot::channel();
        let mut session = self.session();
        if session.generation != generation {
            return receiver;
        }
        if !prompt.is_empty() {
            self.push_chunk(&mut session, prompt);
        }
        self.arm(&mut session, prompt, responder);
        receiver
    }

    /// Resolve the pending request with `line` exactly as given
    ///
    /// Returns `false`, changing nothing, when no request is pending.
    pub fn submit_line(&self, line: &str) -> bool {
        let mut session = self.session();
        let Some(pending) = session.pending.take() else {
            return false;
        };
        if pending.responder.send(line.to_string()).is_err() {
            tracing::debug!(prompt = %pending.prompt, "input request was abandoned by its run");
        }

        let echo = if line.is_empty() {
            self.inner.echo_prefix.clone()
        } else {
            format!("{} {}", self.inner.echo_prefix, line)
        };
        self.push_chunk(&mut session, &echo);
        session.prompt.clear();
        self.transition(&mut session, RunState::Running);
        true
    }

    /// Empty the log and discard any pending request
    ///
    /// An in-flight run is detached: its pending request is cancelled and
    /// whatever it does afterwards is ignored. Clearing twice is the same as
    /// clearing once.
    pub fn clear(&self) {
        let mut session = self.session();
        if session.state.is_busy() || session.pending.is_some() {
            session.pending = None;
            session.generation += 1;
            tracing::debug!(generation = session.generation, "detached in-flight run");
        }
        let had_output = !session.output.is_empty() || !session.prompt.is_empty();
        session.output.clear();
        session.prompt.clear();
        if session.state != RunState::Loading {
            self.transition(&mut session, RunState::Idle);
        }
        if had_output {
            self.emit(TerminalEvent::Cleared);
        }
    }

    // ===== Run lifecycle =====

    /// Attach a new run, resetting the log
    ///
    /// Checked and applied under one lock, so two racing starts cannot both
    /// succeed.
    pub(crate) fn begin_run(&self) -> Result<u64, StartOutcome> {
        let mut session = self.session();
        match session.state {
            RunState::Loading => return Err(StartOutcome::NotReady),
            RunState::Running | RunState::AwaitingInput(_) => return Err(StartOutcome::Busy),
            _ => {}
        }
        session.generation += 1;
        session.output.clear();
        session.prompt.clear();
        session.pending = None;
        self.emit(TerminalEvent::Cleared);
        self.transition(&mut session, RunState::Running);
        Ok(session.generation)
    }

    /// Record how run `generation` ended; ignored if it was detached
    pub(crate) fn finish_run(&self, generation: u64, result: Result<(), String>) -> bool {
        let mut session = self.session();
        if session.generation != generation {
            return false;
        }
        session.pending = None;
        session.prompt.clear();
        match result {
            Ok(()) => self.transition(&mut session, RunState::Finished),
            Err(message) => {
                self.push_chunk(&mut session, &message);
                self.transition(&mut session, RunState::Failed(message));
            }
        }
        true
    }

    /// The runtime host came up (or failed to)
    pub(crate) fn finish_loading(&self, result: Result<(), String>) {
        let mut session = self.session();
        match result {
            Ok(()) => self.transition(&mut session, RunState::Idle),
            Err(message) => self.transition(&mut session, RunState::Failed(message)),
        }
    }
}
