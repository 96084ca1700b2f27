//! The assertion library.
//!
//! Every primitive returns `Result<(), AssertionError>`, so handlers use `?`
//! to bail out of a test on the first violated expectation:
//!
//! ```rust
//! use sequitur::{assert, Value};
//!
//! fn check() -> miette::Result<()> {
//!     assert::equal(1, 1, "numbers match")?;
//!     assert::deep_equal(
//!         Value::object([("a", 1.into()), ("b", 2.into())]),
//!         Value::object([("b", 2.into()), ("a", 1.into())]),
//!         None,
//!     )?;
//!     assert::is_true(true, None)?;
//!     Ok(())
//! }
//! assert!(check().is_ok());
//! ```

use miette::Diagnostic;
use thiserror::Error;

use crate::equality::is_deep_equal;
use crate::format::{first_divergent_line, format_value, LineDivergence};
use crate::value::Value;

pub const DEFAULT_MESSAGE: &str = "Assertion failed.";

const EXPECTED_PREFIX: &str = "\n\n>>> expected: ";
const GIVEN_PREFIX: &str = "\n\n>>> given: ";

/// A violated expectation.
///
/// Carries the message, the rendered expected and given values, and the
/// first line at which the two renderings diverge. Built once, never
/// mutated.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
#[error("{}", render(.message, .comparison))]
#[diagnostic(code(sequitur::assertion))]
pub struct AssertionError {
    message: String,
    comparison: Option<Comparison>,
}

#[derive(Debug, Clone, PartialEq)]
struct Comparison {
    expected: String,
    given: String,
    divergence: Option<LineDivergence>,
}

impl AssertionError {
    /// An error that carries only a message.
    pub fn new(message: Option<&str>) -> Self {
        Self {
            message: resolve_message(message),
            comparison: None,
        }
    }

    /// An error comparing an expected and a given value.
    pub fn with_values(message: Option<&str>, expected: &Value, given: &Value) -> Self {
        let expected = format_value(expected, "");
        let given = format_value(given, "");
        let divergence = first_divergent_line(&given, &expected);
        Self {
            message: resolve_message(message),
            comparison: Some(Comparison {
                expected,
                given,
                divergence,
            }),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The rendered expected value, if the assertion compared values.
    pub fn expected(&self) -> Option<&str> {
        self.comparison.as_ref().map(|c| c.expected.as_str())
    }

    /// The rendered given value, if the assertion compared values.
    pub fn given(&self) -> Option<&str> {
        self.comparison.as_ref().map(|c| c.given.as_str())
    }

    pub fn divergence(&self) -> Option<&LineDivergence> {
        self.comparison.as_ref().and_then(|c| c.divergence.as_ref())
    }
}

fn resolve_message(message: Option<&str>) -> String {
    match message {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => DEFAULT_MESSAGE.to_string(),
    }
}

fn render(message: &str, comparison: &Option<Comparison>) -> String {
    let Some(c) = comparison else {
        return message.to_string();
    };
    let (expected_line, given_line) = match &c.divergence {
        Some(d) => (
            d.expected_line.as_deref().unwrap_or("undefined"),
            d.given_line.as_deref().unwrap_or("undefined"),
        ),
        None => ("undefined", "undefined"),
    };
    format!(
        "{message}\n\n>>>diff:\n  expected: {expected_line}\n  given:    {given_line}\n{}{}",
        block(EXPECTED_PREFIX, &c.expected),
        block(GIVEN_PREFIX, &c.given),
    )
}

/// A rendering already carries its own line break when it is multi-line, so
/// the prefix goes in front as is. Empty renderings drop the block.
fn block(prefix: &str, rendering: &str) -> String {
    if rendering.is_empty() {
        String::new()
    } else {
        format!("{prefix}{rendering}")
    }
}

// ============================================================================
// PRIMITIVES
// ============================================================================

/// Fails unless `given` and `expected` are strictly equal.
pub fn equal<'m>(
    given: impl Into<Value>,
    expected: impl Into<Value>,
    message: impl Into<Option<&'m str>>,
) -> Result<(), AssertionError> {
    let (given, expected) = (given.into(), expected.into());
    if given.strict_eq(&expected) {
        return Ok(());
    }
    Err(AssertionError::with_values(message.into(), &expected, &given))
}

/// Fails unless `given` and `expected` are structurally equal.
pub fn deep_equal<'m>(
    given: impl Into<Value>,
    expected: impl Into<Value>,
    message: impl Into<Option<&'m str>>,
) -> Result<(), AssertionError> {
    let (given, expected) = (given.into(), expected.into());
    if is_deep_equal(&given, &expected) {
        return Ok(());
    }
    Err(AssertionError::with_values(message.into(), &expected, &given))
}

/// Fails when `expression` is falsy.
pub fn is_true<'m>(
    expression: impl Into<Value>,
    message: impl Into<Option<&'m str>>,
) -> Result<(), AssertionError> {
    let truthy = expression.into().is_truthy();
    if truthy {
        return Ok(());
    }
    Err(AssertionError::with_values(
        message.into(),
        &Value::from("true"),
        &Value::from(truthy),
    ))
}

/// Fails when `expression` is truthy.
pub fn is_false<'m>(
    expression: impl Into<Value>,
    message: impl Into<Option<&'m str>>,
) -> Result<(), AssertionError> {
    let truthy = expression.into().is_truthy();
    if !truthy {
        return Ok(());
    }
    Err(AssertionError::with_values(
        message.into(),
        &Value::from("false"),
        &Value::from(truthy),
    ))
}

/// Always fails.
pub fn fail<'m>(message: impl Into<Option<&'m str>>) -> Result<(), AssertionError> {
    Err(AssertionError::new(message.into()))
}
