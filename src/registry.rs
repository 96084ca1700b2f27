//! The registration tree.
//!
//! Suites and tests are registered through the [`Register`] trait, which both
//! the top-level [`RunContext`](crate::RunContext) and the per-suite [`Scope`]
//! implement. A suite's handler is stored at registration and invoked once,
//! with a fresh `Scope`, when the runner declares the tree.
//!
//! ```rust
//! use sequitur::{assert, Register, RunContext};
//!
//! let mut ctx = RunContext::new();
//! ctx.describe("math", |s| {
//!     s.test("adds", || Ok(assert::equal(1 + 1, 2, None)?));
//!     s.describe("nested", |s| {
//!         s.it("runs too", || Ok(()));
//!         Ok(())
//!     });
//!     Ok(())
//! });
//! assert_eq!(ctx.roots().len(), 1);
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::errors::HarnessError;

/// What every handler returns. Assertion errors convert with `?`.
pub type HandlerResult = miette::Result<()>;

pub(crate) type LocalHandlerFuture = LocalBoxFuture<'static, HandlerResult>;

type SuiteHandler = Box<dyn FnOnce(&mut Scope) -> HandlerResult>;

pub(crate) enum TestHandler {
    Sync(Box<dyn FnOnce() -> HandlerResult>),
    Async(Box<dyn FnOnce() -> LocalHandlerFuture>),
}

impl TestHandler {
    /// Runs the handler to completion. Panics become failures.
    pub(crate) async fn invoke(self) -> HandlerResult {
        match self {
            TestHandler::Sync(handler) => {
                panic::catch_unwind(AssertUnwindSafe(handler)).unwrap_or_else(panic_failure)
            }
            TestHandler::Async(handler) => {
                let future = match panic::catch_unwind(AssertUnwindSafe(handler)) {
                    Ok(future) => future,
                    Err(payload) => return panic_failure(payload),
                };
                AssertUnwindSafe(future)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(panic_failure)
            }
        }
    }
}

fn panic_failure(payload: Box<dyn Any + Send>) -> HandlerResult {
    Err(HarnessError::from_panic(payload).into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Suite,
    Test,
}

/// A suite or a test in the registration tree.
pub struct Node {
    pub(crate) name: String,
    pub(crate) body: Body,
}

pub(crate) enum Body {
    Suite {
        handler: Option<SuiteHandler>,
        children: Vec<Node>,
        init_error: Option<miette::Report>,
    },
    Test(TestHandler),
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            Body::Suite { .. } => NodeKind::Suite,
            Body::Test(_) => NodeKind::Test,
        }
    }

    /// Children in execution order. Empty for tests and for suites that have
    /// not been declared yet.
    pub fn children(&self) -> &[Node] {
        match &self.body {
            Body::Suite { children, .. } => children,
            Body::Test(_) => &[],
        }
    }

    /// Invokes this suite's handler, then those of every nested suite, so
    /// that the subtree becomes static. Returns the number of tests added.
    ///
    /// A suite whose handler fails keeps the error and loses the children it
    /// registered before failing. Declaring twice is a no-op.
    pub(crate) fn declare(&mut self) -> usize {
        let Body::Suite {
            handler,
            children,
            init_error,
        } = &mut self.body
        else {
            return 0;
        };
        let Some(handler) = handler.take() else {
            return 0;
        };

        let mut scope = Scope::default();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&mut scope)))
            .unwrap_or_else(panic_failure);
        if let Err(report) = outcome {
            tracing::debug!(suite = %self.name, "suite declaration failed");
            *init_error = Some(report);
            return 0;
        }

        let mut added = scope.test_count;
        *children = scope.nodes;
        for child in children.iter_mut() {
            added += child.declare();
        }
        added
    }
}

/// Registration surface handed to a suite handler.
#[derive(Default)]
pub struct Scope {
    pub(crate) nodes: Vec<Node>,
    pub(crate) test_count: usize,
}

impl Scope {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Tests registered directly in this scope.
    pub fn test_count(&self) -> usize {
        self.test_count
    }

    fn push_suite(&mut self, name: String, handler: SuiteHandler) {
        self.nodes.push(Node {
            name,
            body: Body::Suite {
                handler: Some(handler),
                children: Vec::new(),
                init_error: None,
            },
        });
    }

    fn push_test(&mut self, name: String, handler: TestHandler) {
        self.test_count += 1;
        self.nodes.push(Node {
            name,
            body: Body::Test(handler),
        });
    }
}

/// Suite and test registration, shared by the run context and suite scopes.
pub trait Register {
    fn scope_mut(&mut self) -> &mut Scope;

    /// Registers a suite. `handler` registers the suite's children when the
    /// runner declares the tree; it is not called here.
    fn describe<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnOnce(&mut Scope) -> HandlerResult + 'static,
    {
        self.scope_mut().push_suite(name.into(), Box::new(handler));
    }

    fn suite<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnOnce(&mut Scope) -> HandlerResult + 'static,
    {
        self.describe(name, handler);
    }

    /// Registers a synchronous test.
    fn test<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnOnce() -> HandlerResult + 'static,
    {
        self.scope_mut()
            .push_test(name.into(), TestHandler::Sync(Box::new(handler)));
    }

    fn it<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnOnce() -> HandlerResult + 'static,
    {
        self.test(name, handler);
    }

    /// Registers a test whose body is a future. The runner awaits it before
    /// moving on.
    fn test_async<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = HandlerResult> + 'static,
    {
        let handler = move || -> LocalHandlerFuture { handler().boxed_local() };
        self.scope_mut()
            .push_test(name.into(), TestHandler::Async(Box::new(handler)));
    }

    fn it_async<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = HandlerResult> + 'static,
    {
        self.test_async(name, handler);
    }
}

impl Register for Scope {
    fn scope_mut(&mut self) -> &mut Scope {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn names(nodes: &[Node]) -> Vec<(&str, NodeKind)> {
        nodes.iter().map(|n| (n.name(), n.kind())).collect()
    }

    #[test]
    fn registration_keeps_order_and_counts_tests() {
        let mut scope = Scope::default();
        scope.test("first", || Ok(()));
        scope.describe("group", |_| Ok(()));
        scope.it("second", || Ok(()));
        scope.it_async("third", || async { Ok(()) });
        assert_eq!(
            names(scope.nodes()),
            vec![
                ("first", NodeKind::Test),
                ("group", NodeKind::Suite),
                ("second", NodeKind::Test),
                ("third", NodeKind::Test),
            ]
        );
        assert_eq!(scope.test_count(), 3);
    }

    #[test]
    fn suite_handler_waits_for_declaration() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let mut scope = Scope::default();
        scope.suite("outer", move |s| {
            seen.set(seen.get() + 1);
            s.test("inner", || Ok(()));
            s.describe("deeper", |s| {
                s.test("leaf", || Ok(()));
                Ok(())
            });
            Ok(())
        });
        assert_eq!(calls.get(), 0);
        assert!(scope.nodes()[0].children().is_empty());

        let mut outer = scope.nodes.remove(0);
        assert_eq!(outer.declare(), 2);
        assert_eq!(calls.get(), 1);
        assert_eq!(
            names(outer.children()),
            vec![("inner", NodeKind::Test), ("deeper", NodeKind::Suite)]
        );
        assert_eq!(names(outer.children()[1].children()), vec![("leaf", NodeKind::Test)]);

        assert_eq!(outer.declare(), 0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failing_declaration_drops_children() {
        let mut scope = Scope::default();
        scope.describe("broken", |s| {
            s.test("registered before failure", || Ok(()));
            Err(miette::miette!("cannot build fixtures"))
        });
        let mut broken = scope.nodes.remove(0);
        assert_eq!(broken.declare(), 0);
        assert!(broken.children().is_empty());
        assert!(matches!(broken.body, Body::Suite { init_error: Some(_), .. }));
    }

    #[test]
    fn panicking_declaration_is_recorded() {
        let mut scope = Scope::default();
        scope.describe("panics", |_| panic!("declaration exploded"));
        let mut node = scope.nodes.remove(0);
        node.declare();
        let Body::Suite { init_error: Some(report), .. } = &node.body else {
            panic!("expected a recorded init error");
        };
        assert_eq!(report.to_string(), "panicked: declaration exploded");
    }

    #[test]
    fn panicking_tests_become_failures() {
        let sync = TestHandler::Sync(Box::new(|| -> HandlerResult { panic!("sync boom") }));
        let err = futures::executor::block_on(sync.invoke()).unwrap_err();
        assert_eq!(err.to_string(), "panicked: sync boom");

        let handler = || -> LocalHandlerFuture {
            async {
                if true {
                    panic!("async boom");
                }
                Ok::<(), miette::Report>(())
            }
            .boxed_local()
        };
        let err = futures::executor::block_on(TestHandler::Async(Box::new(handler)).invoke())
            .unwrap_err();
        assert_eq!(err.to_string(), "panicked: async boom");
    }
}
