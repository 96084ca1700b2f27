//! Structural equality over [`Value`].

use crate::value::Value;

/// Compares two values structurally.
///
/// Primitives compare strictly. Containers must have the same number of own
/// keys, and every key of `a` must exist in `b` with a deep-equal value.
/// Key order never matters, and an array equals an object carrying the same
/// index keys.
///
/// ```rust
/// use sequitur::{is_deep_equal, Value};
/// let a = Value::object([("a", 1.into()), ("b", 2.into())]);
/// let b = Value::object([("b", 2.into()), ("a", 1.into())]);
/// assert!(is_deep_equal(&a, &b));
/// assert!(!is_deep_equal(&Value::from(1), &Value::from("1")));
/// ```
pub fn is_deep_equal(a: &Value, b: &Value) -> bool {
    let mut in_progress = Vec::new();
    compare(a, b, &mut in_progress)
}

/// `in_progress` holds the container pairs currently being compared further
/// up the recursion. Meeting one of them again means both sides loop back
/// at the same point, so the pair is assumed equal.
fn compare(a: &Value, b: &Value, in_progress: &mut Vec<(usize, usize)>) -> bool {
    if a.strict_eq(b) {
        return true;
    }
    if a.is_primitive() || b.is_primitive() {
        return false;
    }

    let (Some(a_addr), Some(b_addr)) = (a.container_addr(), b.container_addr()) else {
        return false;
    };
    if in_progress.contains(&(a_addr, b_addr)) {
        return true;
    }

    let keys = a.keys();
    if keys.len() != b.keys().len() {
        return false;
    }

    in_progress.push((a_addr, b_addr));
    let equal = keys.iter().all(|key| match (a.get(key), b.get(key)) {
        (Some(left), Some(right)) => compare(&left, &right, in_progress),
        _ => false,
    });
    in_progress.pop();
    equal
}
