//! The sequential runner.
//!
//! A run has two phases. The declaration phase calls every suite handler once
//! so that the tree is complete and static. The execution phase then walks
//! the tree depth-first and awaits each test before starting the next one;
//! nothing ever runs concurrently.
//!
//! ```rust
//! use sequitur::{assert, Register, RunContext, SharedBuffer};
//!
//! let output = SharedBuffer::new();
//! let mut ctx = RunContext::new();
//! ctx.set_reporter(output.clone());
//! ctx.describe("simple test-suite", |s| {
//!     s.test("passes", || Ok(assert::equal(1, 1, "it should work")?));
//!     s.it("fails", || Ok(assert::fail("complete error")?));
//!     Ok(())
//! });
//!
//! let report = ctx.run_blocking().unwrap();
//! assert_eq!(report.failures.len(), 1);
//! assert!(output.text().ends_with("Tests run completed with 1 FAILURES!"));
//! ```

use std::fmt;
use std::future::Future;

use futures::FutureExt;
use serde::Serialize;
use tracing::debug;

use crate::errors::{HarnessError, HookPhase};
use crate::output::{LineKind, Reporter, StdoutReporter};
use crate::registry::{Body, HandlerResult, LocalHandlerFuture, Node, Register, Scope};

type Hook = Box<dyn FnOnce() -> LocalHandlerFuture>;

pub const NO_TESTS_FOUND: &str = "NO TESTS FOUND!";
pub const RUN_SUCCEEDED: &str = "Tests run completed successfully.";

// ============================================================================
// RESULTS
// ============================================================================

/// Where a failure was caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureContext {
    /// A suite handler failed while registering its children.
    SuiteInit,
    /// A test body failed.
    TestCase,
}

impl fmt::Display for FailureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureContext::SuiteInit => write!(f, "Describe init failed!"),
            FailureContext::TestCase => write!(f, "Test-case failed!"),
        }
    }
}

/// A failure captured during the run, with the names leading to it.
#[derive(Debug)]
pub struct Failure {
    pub path: Vec<String>,
    pub context: FailureContext,
    pub error: miette::Report,
}

impl Failure {
    /// The downcast assertion error, when the failure came from one.
    pub fn assertion(&self) -> Option<&crate::assert::AssertionError> {
        self.error.downcast_ref()
    }
}

/// Outcome of a completed run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub failures: Vec<Failure>,
    pub test_count: usize,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// A serializable digest of the run.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            test_count: self.test_count,
            failure_count: self.failures.len(),
            failures: self
                .failures
                .iter()
                .map(|f| FailureSummary {
                    path: f.path.clone(),
                    context: f.context,
                    message: f.error.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub test_count: usize,
    pub failure_count: usize,
    pub failures: Vec<FailureSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub path: Vec<String>,
    pub context: FailureContext,
    pub message: String,
}

// ============================================================================
// RUN CONTEXT
// ============================================================================

/// Owns everything one run needs: the registered tree, the reporter, the
/// global hooks and the completion callback.
///
/// Running consumes the context, so a tree can only ever be run once.
pub struct RunContext {
    root: Scope,
    reporter: Box<dyn Reporter>,
    before_all: Option<Hook>,
    after_all: Option<Hook>,
    on_complete: Option<Box<dyn FnOnce(&RunReport)>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Register for RunContext {
    fn scope_mut(&mut self) -> &mut Scope {
        &mut self.root
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            root: Scope::default(),
            reporter: Box::new(StdoutReporter::default()),
            before_all: None,
            after_all: None,
            on_complete: None,
        }
    }

    /// Top-level nodes in registration order.
    pub fn roots(&self) -> &[Node] {
        self.root.nodes()
    }

    /// Tests registered at the top level so far. Tests inside suites are
    /// only known once the run declares them; see [`RunReport::test_count`].
    pub fn test_count(&self) -> usize {
        self.root.test_count()
    }

    /// Replaces the progress sink.
    pub fn set_reporter(&mut self, reporter: impl Reporter + 'static) {
        self.reporter = Box::new(reporter);
    }

    /// Sets the hook awaited before anything else runs. Last call wins.
    pub fn global_before<F, Fut>(&mut self, hook: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = HandlerResult> + 'static,
    {
        self.before_all = Some(Box::new(move || hook().boxed_local()));
    }

    /// Sets the hook awaited after the last test. Last call wins.
    pub fn global_after<F, Fut>(&mut self, hook: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = HandlerResult> + 'static,
    {
        self.after_all = Some(Box::new(move || hook().boxed_local()));
    }

    /// Called with the report once the run, summary included, is over.
    pub fn on_complete(&mut self, callback: impl FnOnce(&RunReport) + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Runs every registered suite and test.
    ///
    /// Test and suite failures are collected in the report. A failing global
    /// hook aborts the run and is returned as [`HarnessError::Hook`].
    pub async fn run_all(self) -> Result<RunReport, HarnessError> {
        let RunContext {
            root,
            reporter,
            before_all,
            after_all,
            on_complete,
        } = self;
        let mut run = Run {
            reporter,
            path: Vec::new(),
            failures: Vec::new(),
        };

        if root.nodes.is_empty() {
            run.reporter.report_line(LineKind::Notice, NO_TESTS_FOUND);
            let report = RunReport::default();
            if let Some(callback) = on_complete {
                callback(&report);
            }
            return Ok(report);
        }

        run_hook(before_all, HookPhase::BeforeAll).await?;

        let mut test_count = root.test_count;
        let mut roots = root.nodes;
        for node in roots.iter_mut() {
            test_count += node.declare();
        }
        debug!(test_count, "tree declared");

        run.execute(roots).await;

        run_hook(after_all, HookPhase::AfterAll).await?;

        let report = run.finish(test_count);
        if let Some(callback) = on_complete {
            callback(&report);
        }
        Ok(report)
    }

    /// Drives [`RunContext::run_all`] on the current thread.
    ///
    /// Handlers must not depend on a specific async runtime here; use
    /// `run_all` from inside that runtime instead.
    pub fn run_blocking(self) -> Result<RunReport, HarnessError> {
        futures::executor::block_on(self.run_all())
    }
}

async fn run_hook(hook: Option<Hook>, phase: HookPhase) -> Result<(), HarnessError> {
    let Some(hook) = hook else {
        return Ok(());
    };
    debug!(%phase, "running global hook");
    hook()
        .await
        .map_err(|report| HarnessError::Hook { phase, report })
}

// ============================================================================
// EXECUTION
// ============================================================================

enum Step {
    Enter(Node),
    Leave(String),
}

/// Mutable state of the execution phase.
struct Run {
    reporter: Box<dyn Reporter>,
    path: Vec<String>,
    failures: Vec<Failure>,
}

impl Run {
    /// Depth-first over `roots`, one node at a time. Every name pushed on
    /// the path is popped exactly once.
    async fn execute(&mut self, roots: Vec<Node>) {
        let mut pending: Vec<Step> = roots.into_iter().rev().map(Step::Enter).collect();

        while let Some(step) = pending.pop() {
            let node = match step {
                Step::Enter(node) => node,
                Step::Leave(name) => {
                    self.path.pop();
                    debug!(node = %name, "[done]");
                    continue;
                }
            };

            debug!(node = %node.name, "[start]");
            self.path.push(node.name.clone());
            let indent = "  ".repeat(self.path.len() - 1);

            match node.body {
                Body::Suite {
                    init_error: Some(error),
                    ..
                } => {
                    self.reporter
                        .report_line(LineKind::Suite, &format!("{indent}* {}", node.name));
                    self.record(FailureContext::SuiteInit, error);
                    self.path.pop();
                }
                Body::Suite { children, .. } => {
                    self.reporter
                        .report_line(LineKind::Suite, &format!("{indent}* {}", node.name));
                    pending.push(Step::Leave(node.name));
                    pending.extend(children.into_iter().rev().map(Step::Enter));
                }
                Body::Test(handler) => {
                    self.reporter
                        .report_line(LineKind::Test, &format!("{indent}- {}", node.name));
                    match handler.invoke().await {
                        Ok(()) => debug!(node = %node.name, "[done]"),
                        Err(error) => self.record(FailureContext::TestCase, error),
                    }
                    self.path.pop();
                }
            }
        }
    }

    fn record(&mut self, context: FailureContext, error: miette::Report) {
        debug!(path = %self.path.join(" -> "), "[error]");
        let text = format!(
            "{context} {}\n{}\n\n",
            self.path.join(" -> "),
            failure_text(&error)
        );
        self.reporter.report_line(LineKind::Failure, &text);
        self.failures.push(Failure {
            path: self.path.clone(),
            context,
            error,
        });
    }

    fn finish(mut self, test_count: usize) -> RunReport {
        let (success, line) = if self.failures.is_empty() {
            (true, RUN_SUCCEEDED.to_string())
        } else {
            (
                false,
                format!("Tests run completed with {} FAILURES!", self.failures.len()),
            )
        };
        self.reporter
            .report_line(LineKind::Summary { success }, &line);
        RunReport {
            failures: self.failures,
            test_count,
        }
    }
}

/// The error's message followed by its causes, one per line. Errors carry no
/// frames, so there is nothing from the assertion layer to strip.
fn failure_text(error: &miette::Report) -> String {
    let mut text = error.to_string();
    for cause in error.chain().skip(1) {
        text.push_str("\ncaused by: ");
        text.push_str(&cause.to_string());
    }
    text
}
