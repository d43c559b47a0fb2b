use std::fmt;

use crate::common::span::Span;

/// A scan-, parse-, or compile-time error: a reason plus the source
/// location it occurred at. One span per diagnostic rather than a note
/// list, since each stage's errors are terminal single events rather
/// than accumulating annotations on one error.
#[derive(Debug)]
pub struct Diagnostic {
    pub reason: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(reason: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic { reason: reason.into(), span }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} ({})", self.reason, self.span)
    }
}

impl std::error::Error for Diagnostic {}
