//! Shared helpers for the integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use sequitur::RunContext;

/// One ordered log that both the reporter and the handlers write to, so
/// tests can check how output and handler effects interleave.
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    pub fn note(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.0.borrow().iter().position(|e| e == event)
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == event).count()
    }
}

/// A run context whose reporter writes into the returned log.
pub fn logged_context() -> (RunContext, EventLog) {
    let log = EventLog::default();
    let sink = log.clone();
    let mut ctx = RunContext::new();
    ctx.set_reporter(move |line: &str| sink.note(line));
    (ctx, log)
}
