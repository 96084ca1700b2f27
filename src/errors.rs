//! Harness error handling.
//!
//! Assertion failures live in [`crate::assert::AssertionError`]; this module
//! holds the errors raised by the harness machinery itself.

use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// Which global hook was running when a fatal error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    BeforeAll,
    AfterAll,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::BeforeAll => write!(f, "before-all"),
            HookPhase::AfterAll => write!(f, "after-all"),
        }
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum HarnessError {
    /// A global hook failed. Hook failures abort the run.
    #[error("Global {phase} hook failed: {report}")]
    #[diagnostic(
        code(sequitur::hook_failed),
        help("global hooks are not isolated like test cases; fix the hook to continue")
    )]
    Hook {
        phase: HookPhase,
        report: miette::Report,
    },

    /// A handler panicked instead of returning an error.
    #[error("{message}")]
    #[diagnostic(code(sequitur::panicked))]
    Panicked { message: String },

    /// The text differ received something other than a string.
    #[error("string required, got {actual}")]
    #[diagnostic(
        code(sequitur::type_mismatch),
        help("this points at a bug in the assertion layer, not at the test")
    )]
    TypeMismatch { actual: String },
}

impl HarnessError {
    /// Builds a `Panicked` error from a `catch_unwind` payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        HarnessError::Panicked {
            message: format!("panicked: {message}"),
        }
    }
}
