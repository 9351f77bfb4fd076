//! Evaluation of predicate trees against instances.

use super::ast::{CompareOp, Predicate, TextOp};
use crate::graph::Instance;
use crate::value::Value;
use std::cmp::Ordering;

const NULL: &Value = &Value::Null;

impl Predicate {
    /// Returns true if `instance` satisfies the predicate.
    ///
    /// Keys the instance lacks read as `Null`. Ordering comparisons against
    /// `Null` or values of another type are false; `!=` is their negation
    /// of equality and so is true.
    #[must_use]
    pub fn evaluate(&self, instance: &Instance) -> bool {
        self.evaluate_with(&|key| instance.get(key))
    }

    pub(crate) fn evaluate_with<'v>(&self, lookup: &dyn Fn(&str) -> Option<&'v Value>) -> bool {
        match self {
            Self::Constant(result) => *result,
            Self::Compare {
                key,
                op,
                value,
                case_insensitive,
            } => {
                let actual = lookup(key).unwrap_or(NULL);
                compare(actual, *op, value, *case_insensitive)
            }
            Self::Text {
                key,
                op,
                pattern,
                case_insensitive,
            } => match lookup(key).and_then(Value::as_text) {
                Some(text) => match_text(text, *op, pattern, *case_insensitive),
                None => false,
            },
            Self::In {
                key,
                values,
                case_insensitive,
            } => {
                let actual = lookup(key).unwrap_or(NULL);
                values
                    .iter()
                    .any(|v| equals(actual, v, *case_insensitive))
            }
            Self::And(terms) => terms.iter().all(|t| t.evaluate_with(lookup)),
            Self::Or(terms) => terms.iter().any(|t| t.evaluate_with(lookup)),
            Self::Not(inner) => !inner.evaluate_with(lookup),
        }
    }
}

fn equals(actual: &Value, expected: &Value, case_insensitive: bool) -> bool {
    match (actual, expected) {
        (Value::Text(a), Value::Text(b)) if case_insensitive => a.to_lowercase() == b.to_lowercase(),
        _ => actual.matches(expected),
    }
}

fn compare(actual: &Value, op: CompareOp, expected: &Value, case_insensitive: bool) -> bool {
    match op {
        CompareOp::Eq => equals(actual, expected, case_insensitive),
        CompareOp::Ne => !equals(actual, expected, case_insensitive),
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            if actual.is_null() || expected.is_null() {
                return false;
            }
            match actual.compare(expected) {
                Some(Ordering::Less) => matches!(op, CompareOp::Lt | CompareOp::Le),
                Some(Ordering::Equal) => matches!(op, CompareOp::Le | CompareOp::Ge),
                Some(Ordering::Greater) => matches!(op, CompareOp::Gt | CompareOp::Ge),
                None => false,
            }
        }
    }
}

fn match_text(text: &str, op: TextOp, pattern: &str, case_insensitive: bool) -> bool {
    let (text, pattern) = if case_insensitive {
        (text.to_lowercase(), pattern.to_lowercase())
    } else {
        (text.to_string(), pattern.to_string())
    };
    match op {
        TextOp::BeginsWith => text.starts_with(&pattern),
        TextOp::EndsWith => text.ends_with(&pattern),
        TextOp::Contains => text.contains(&pattern),
        TextOp::Like => wildcard_match(&text, &pattern),
    }
}

/// Glob match where `*` spans any run of characters and `?` exactly one.
///
/// Iterative with single-star backtracking, so it runs in linear space.
fn wildcard_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}
