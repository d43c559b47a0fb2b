use std::fmt;

/// A runtime-fatal failure: every opcode failure halts the run with an
/// error status, and the VM never recovers. Kept to a single message
/// since the VM has no call stack to unwind and annotate — every
/// failure is raised from the single dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> RuntimeError {
        RuntimeError { message: message.into() }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {}", self.message)
    }
}

impl std::error::Error for RuntimeError {}
