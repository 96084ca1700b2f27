//! Progress output for test runs.
//!
//! The runner hands every progress line, failure block and summary to a
//! [`Reporter`]. Plain closures work as reporters; [`StdoutReporter`] is the
//! default and [`SharedBuffer`] captures output for inspection.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// What a reported line describes. Reporters that only care about text can
/// ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Suite,
    Test,
    Failure,
    Summary { success: bool },
    Notice,
}

/// Sink for human-readable run output.
pub trait Reporter {
    fn report(&mut self, text: &str);

    /// Receives a line together with its kind. Defaults to [`Reporter::report`].
    fn report_line(&mut self, _kind: LineKind, text: &str) {
        self.report(text);
    }
}

impl<F: FnMut(&str)> Reporter for F {
    fn report(&mut self, text: &str) {
        self(text)
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub use_colors: bool,
}

impl ReporterConfig {
    fn color_choice(&self) -> ColorChoice {
        if self.use_colors {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        }
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

// ============================================================================
// SINKS
// ============================================================================

/// Writes to stdout, coloring suites, failures and the summary.
pub struct StdoutReporter {
    stdout: StandardStream,
}

impl StdoutReporter {
    pub fn new(config: ReporterConfig) -> Self {
        Self {
            stdout: StandardStream::stdout(config.color_choice()),
        }
    }

    fn spec_for(kind: LineKind) -> Option<ColorSpec> {
        let mut spec = ColorSpec::new();
        match kind {
            LineKind::Suite => spec.set_bold(true),
            LineKind::Failure => spec.set_fg(Some(Color::Red)),
            LineKind::Summary { success: true } => spec.set_fg(Some(Color::Green)).set_bold(true),
            LineKind::Summary { success: false } => spec.set_fg(Some(Color::Red)).set_bold(true),
            LineKind::Notice => spec.set_fg(Some(Color::Yellow)),
            LineKind::Test => return None,
        };
        Some(spec)
    }
}

impl Default for StdoutReporter {
    fn default() -> Self {
        Self::new(ReporterConfig::default())
    }
}

impl Reporter for StdoutReporter {
    fn report(&mut self, text: &str) {
        let _ = writeln!(self.stdout, "{text}");
    }

    fn report_line(&mut self, kind: LineKind, text: &str) {
        let Some(spec) = Self::spec_for(kind) else {
            self.report(text);
            return;
        };
        let _ = self.stdout.set_color(&spec);
        let _ = write!(self.stdout, "{text}");
        let _ = self.stdout.reset();
        let _ = writeln!(self.stdout);
    }
}

/// Collects reported text. Clones share the same buffer, so one handle can
/// be given to the runner and another kept for assertions.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<String>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Everything reported so far, one entry per line.
    pub fn text(&self) -> String {
        self.0.borrow().join("\n")
    }

    pub fn push(&self, text: &str) {
        self.0.borrow_mut().push(text.to_string());
    }
}

impl Reporter for SharedBuffer {
    fn report(&mut self, text: &str) {
        self.push(text);
    }
}
