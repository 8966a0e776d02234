//! Output hooks
//!
//! The host calls its sink synchronously, once per chunk, in emission order.

use std::sync::Arc;

/// Stream a chunk was written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Receiver of every chunk a program writes
pub type OutputSink = Arc<dyn Fn(OutputStream, &str) + Send + Sync>;

/// A sink that drops everything
pub fn discard() -> OutputSink {
    Arc::new(|_, _| {})
}

/// What a native function may touch while it runs
#[derive(Clone)]
pub struct NativeContext {
    output: OutputSink,
}

impl NativeContext {
    pub fn new(output: OutputSink) -> Self {
        Self { output }
    }

    pub fn write(&self, stream: OutputStream, chunk: &str) {
        (self.output)(stream, chunk);
    }
}
