pub use crate::assert::AssertionError;
pub use crate::equality::is_deep_equal;
pub use crate::errors::{HarnessError, HookPhase};
pub use crate::format::{first_divergent_line, first_divergent_line_of, format_value, LineDivergence};
pub use crate::output::{LineKind, Reporter, ReporterConfig, SharedBuffer, StdoutReporter};
pub use crate::registry::{HandlerResult, Node, NodeKind, Register, Scope};
pub use crate::runner::{Failure, FailureContext, FailureSummary, RunContext, RunReport, RunSummary};
pub use crate::value::{Array, Object, Value};

pub mod assert;
pub mod equality;
pub mod errors;
pub mod format;
pub mod output;
pub mod registry;
pub mod runner;
pub mod value;
